//! Monthly NaN-rate datasets: discovery, resolution, caching and aggregation

pub mod config;
pub mod services;
pub mod sources;
pub mod types;
