pub mod codec;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod providers;
pub mod report;
pub mod service;
pub mod storage;

pub use errors::{Result, ScorecardError};
pub use service::TestsService;
