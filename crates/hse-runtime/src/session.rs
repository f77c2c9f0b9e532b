//! The active observation dataset.
//!
//! A [`DatasetSession`] owns one immutable `Arc<[Observation]>`. Loading a
//! new file replaces the handle wholesale; readers that took a
//! [`DatasetSession::snapshot`] keep working on the dataset they started
//! with.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hse_core::error::Result;
use hse_core::models::{FilterState, Observation};
use hse_data::analysis::{build_snapshot, DashboardSnapshot, SnapshotOptions};
use hse_data::reader::{load_observations, parse_observations};

// ── DatasetSession ────────────────────────────────────────────────────────────

/// Holder for the dataset the dashboard is currently showing.
///
/// # Example
/// ```no_run
/// use hse_runtime::session::DatasetSession;
///
/// let mut session = DatasetSession::new();
/// let count = session.load_file("observations.csv".as_ref()).unwrap();
/// println!("loaded {count} observations from {:?}", session.source());
/// ```
#[derive(Debug, Clone)]
pub struct DatasetSession {
    data: Arc<[Observation]>,
    /// Where the current data came from (file path or caller label).
    source: Option<String>,
    /// When the current data was loaded.
    loaded_at: Option<Instant>,
}

impl Default for DatasetSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetSession {
    /// An empty session.
    pub fn new() -> Self {
        Self {
            data: Arc::from(Vec::new()),
            source: None,
            loaded_at: None,
        }
    }

    /// A session over already-parsed observations.
    pub fn from_observations(observations: Vec<Observation>, source: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.replace(observations, source.into());
        session
    }

    // ── Loading ───────────────────────────────────────────────────────────

    /// Replace the dataset with the contents of a CSV file.
    ///
    /// On error the previous dataset is kept.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let observations = load_observations(path)?;
        Ok(self.replace(observations, path.display().to_string()))
    }

    /// Replace the dataset with parsed CSV text.
    pub fn load_text(&mut self, text: &str, source: impl Into<String>) -> usize {
        self.replace(parse_observations(text), source.into())
    }

    /// Drop the current dataset.
    pub fn clear(&mut self) {
        *self = Self::new();
        tracing::debug!("dataset cleared");
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// Cheap clone of the current dataset handle.
    pub fn snapshot(&self) -> Arc<[Observation]> {
        Arc::clone(&self.data)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Time since the current dataset was loaded.
    pub fn age(&self) -> Option<Duration> {
        self.loaded_at.map(|ts| ts.elapsed())
    }

    /// Dashboard snapshot of the current dataset.
    pub fn dashboard(&self, filters: &FilterState, options: &SnapshotOptions) -> DashboardSnapshot {
        build_snapshot(&self.data, filters, options)
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn replace(&mut self, observations: Vec<Observation>, source: String) -> usize {
        let count = observations.len();
        tracing::debug!(records = count, source = %source, "dataset loaded");
        self.data = Arc::from(observations);
        self.source = Some(source);
        self.loaded_at = Some(Instant::now());
        count
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
