// MEVShield Sandwich-Risk Engine Library

#![allow(dead_code)]

pub mod config;
pub mod common;
pub mod core;
pub mod amm;
pub mod simulator;
pub mod profiler;
pub mod optimizer;
pub mod decision;
pub mod providers;
pub mod mocks;

// Core types
pub mod types;
pub mod constants;

// Re-exports for convenience
pub use config::ShieldConfig;
pub use core::ShieldCore;
pub use decision::DecisionEngine;
pub use optimizer::{ExecutionOptimizer, OptimizerConfig};
pub use profiler::{MevProfiler, ProfilerConfig};
pub use simulator::{SandwichSimulator, SimulatorConfig};

// Re-export common types
pub use types::{
    Chain, ChunkSpec, ExecutionPlan, ExecutionPolicy, OptimizerOutcome, PoolMevProfile,
    ReservePair, SandwichSimulationResult, Strategy, TradeAssessment, TradeIntent,
};
