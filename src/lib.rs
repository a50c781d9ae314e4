//! Plume: blog content backend.
//!
//! Reads go through an in-process TTL cache in front of Postgres; every
//! mutation invalidates the affected cache entries before returning, and
//! mutating routes are gated by an ordered authorization pipeline.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
