//! Shared query, filtering and anomaly logic for the Hydralytica dashboard
//! and inventory services.

pub mod anomaly;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod rest;
pub mod search;
pub mod serialize;
pub mod window;
