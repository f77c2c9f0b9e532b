//! Runtime layer for the HSE dashboard.
//!
//! Holds the active dataset, answers free-text questions against it and
//! produces per-incident predictions from a remote model or local history.

pub mod assistant;
pub mod predictor;
pub mod session;

pub use hse_core as core;
pub use hse_data as data;
