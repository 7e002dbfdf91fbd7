mod compare;
mod engine;
mod error;
mod policy;
mod types;

pub use compare::compare_strategies;
pub use engine::{check_amortization, monthly_interest, simulate, simulate_minimum_only};
pub use error::{EngineError, FailureKind, Result};
pub use policy::{ActiveDebt, AllocationPolicy};
pub use types::{
    ComparisonReport, CustomWeights, DEFAULT_MAX_MONTHS, DEFAULT_RATE_WEIGHT, DebtPayoff,
    DebtRecord, EngineConfig, PaymentScheduleEntry, PlanKind, Portfolio, RunOutcome,
    SimulateRequest, SimulationResult, Strategy, StrategyFailure,
};
