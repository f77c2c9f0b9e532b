//! Data layer for the HSE dashboard.
//!
//! Parses observation CSV exports, computes the dashboard aggregations and
//! weekly forecasts, runs structured queries and assembles the full
//! dashboard snapshot.

pub mod aggregator;
pub mod analysis;
pub mod forecast;
pub mod query;
pub mod reader;
pub mod schema;

pub use hse_core as core;
