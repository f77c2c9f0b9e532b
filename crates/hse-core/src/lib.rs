//! Core domain types for the HSE dashboard.
//!
//! Holds the observation model, categorical enums, date and window helpers,
//! category normalization, least-squares regression, formatting helpers,
//! the shared error type and CLI settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod normalize;
pub mod regression;
pub mod settings;
pub mod time_utils;

pub use error::{HseError, Result};
