//! Application services layer.

pub mod assistant;
pub mod auth;
pub mod content;
pub mod error;
pub mod pagination;
pub mod repos;
