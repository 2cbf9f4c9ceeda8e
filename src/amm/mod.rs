pub mod math;

pub use math::{amount_out, apply_swap, isqrt, optimal_frontrun_amount, price_impact_pct};
