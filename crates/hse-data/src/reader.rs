//! CSV loading for HSE observation exports.
//!
//! Reads header-addressed CSV text and converts every data row into an
//! [`Observation`]. Malformed rows never fail the load; they are either
//! defaulted field by field or skipped with a warning.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use hse_core::error::{HseError, Result};
use hse_core::models::{
    Observation, ObservationField, ObservationType, Outcome, RiskLevel, NOT_SPECIFIED,
    UNSPECIFIED,
};
use tracing::{debug, warn};

use crate::schema::HeaderIndex;

/// Substring of the intervention cell that marks an intervention.
const INTERVENED_MARKER: &str = "intervened";

// ── Public API ────────────────────────────────────────────────────────────────

/// Load observations from a CSV file on disk.
///
/// Only I/O failures are errors; invalid UTF-8 is replaced and bad rows are
/// handled as in [`parse_observations`].
pub fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    let bytes = std::fs::read(path).map_err(|source| HseError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let observations = parse_observations(&text);

    debug!(
        "Loaded {} observations from {}",
        observations.len(),
        path.display()
    );
    Ok(observations)
}

/// Parse CSV text into observations, in file order.
///
/// The first non-blank row is the header. Returns an empty vector when
/// there is no data row.
pub fn parse_observations(text: &str) -> Vec<Observation> {
    let rows = read_rows(text);
    let Some((header, data_rows)) = rows.split_first() else {
        return Vec::new();
    };
    if data_rows.is_empty() {
        debug!("CSV has a header but no data rows");
        return Vec::new();
    }

    let index = HeaderIndex::from_headers(header.iter());
    let unresolved = index.unresolved();
    if !unresolved.is_empty() {
        debug!(
            "No matching column for fields: {}",
            unresolved
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let mut observations = Vec::with_capacity(data_rows.len());
    let mut skipped = 0usize;
    for (row_number, row) in data_rows.iter().enumerate() {
        if row.len() < 2 {
            skipped += 1;
            continue;
        }
        observations.push(build_observation(&index, row, row_number));
    }

    debug!(
        "Parsed {} observations ({} short rows skipped)",
        observations.len(),
        skipped
    );
    observations
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Split `text` into trimmed records, dropping blank lines and rows that
/// cannot be decoded.
fn read_rows(text: &str) -> Vec<StringRecord> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                if !is_blank(&record) {
                    rows.push(record);
                }
            }
            Err(e) => {
                warn!("Skipping unreadable CSV row: {}", e);
            }
        }
    }
    rows
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty) && record.len() <= 1
}

/// Build one observation; `row_number` is the 0-based data row position
/// used for synthesized ids.
fn build_observation(index: &HeaderIndex, row: &StringRecord, row_number: usize) -> Observation {
    let get = |field: ObservationField| index.value(field, row).unwrap_or("");

    Observation {
        id: or_default(get(ObservationField::Id), || format!("ROW-{row_number}")),
        date_reported: get(ObservationField::DateReported).to_string(),
        time_reported: get(ObservationField::TimeReported).to_string(),
        vessel: get(ObservationField::Vessel).to_string(),
        observer_name: get(ObservationField::ObserverName).to_string(),
        observer_rank: get(ObservationField::ObserverRank).to_string(),
        observation_type: ObservationType::parse(get(ObservationField::Type)),
        description: get(ObservationField::Description).to_string(),
        outcome: Outcome::parse(get(ObservationField::Outcome)),
        category: RiskLevel::parse(get(ObservationField::Category)),
        area_of_work: get(ObservationField::AreaOfWork).to_string(),
        intervention: get(ObservationField::Intervention)
            .to_lowercase()
            .contains(INTERVENED_MARKER),
        mapped_issue: or_default(get(ObservationField::MappedIssue), || {
            UNSPECIFIED.to_string()
        }),
        consequences: or_default(get(ObservationField::Consequences), || {
            NOT_SPECIFIED.to_string()
        }),
        observation_related_to1: or_default(get(ObservationField::ObservationRelatedTo1), || {
            UNSPECIFIED.to_string()
        }),
    }
}

fn or_default(value: &str, default: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        default()
    } else {
        value.to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
