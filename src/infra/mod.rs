//! Infrastructure adapters and runtime bootstrap.

pub mod assistant;
pub mod db;
pub mod error;
pub mod http;
pub mod telemetry;
