pub mod runner;

pub use runner::{CaseFailure, CaseOutcome, FailedStage, RunPolicy, Runner, ERROR_PREFIX};
