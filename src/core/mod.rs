pub mod shield_core;

pub use shield_core::ShieldCore;
