pub mod cache_store;
pub mod error;
pub mod executor;
pub mod fire_table;
pub mod orchestrator;
pub mod planner;
pub mod rate_limiter;
pub mod transport;
