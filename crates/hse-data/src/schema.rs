//! Header alias table for observation CSV files.
//!
//! Exports rarely agree on column names, so every logical field accepts a
//! list of header spellings. Headers are compared after
//! [`normalize_header`], which makes `"Mapped Issue"`, `"MappedIssue"` and
//! `"Mapped_Issue"` the same column.

use std::collections::HashMap;

use csv::StringRecord;
use hse_core::models::ObservationField;
use hse_core::normalize::normalize_header;

/// Accepted header spellings per field, in priority order.
pub const FIELD_ALIASES: [(ObservationField, &[&str]); 15] = [
    (ObservationField::Id, &["Report ID", "ReportID", "SI #", "SI"]),
    (ObservationField::DateReported, &["Date Reported", "Date"]),
    (ObservationField::TimeReported, &["Time Reported", "Time"]),
    (ObservationField::Vessel, &["Vessel", "Vessel Name"]),
    (ObservationField::ObserverName, &["Observer Name", "Observer"]),
    (ObservationField::ObserverRank, &["Observer Rank", "Rank"]),
    (ObservationField::Type, &["Type", "Observation Type"]),
    (
        ObservationField::Description,
        &["Description of Observation", "Description"],
    ),
    (ObservationField::Outcome, &["Outcome", "Action Taken"]),
    (
        ObservationField::Category,
        &["Category Of Observation", "Category"],
    ),
    (ObservationField::AreaOfWork, &["Area of Work", "Area"]),
    (ObservationField::Intervention, &["Intervention"]),
    (
        ObservationField::MappedIssue,
        &[
            "Mapped Issue",
            "MappedIssue",
            "Mapped_Issue",
            "Issue",
            "Mapped Issues",
        ],
    ),
    (
        ObservationField::ObservationRelatedTo1,
        &[
            "Observation Related to (Max. 2 selections) - 1",
            "ObservationRelatedTo1",
            "Related Observation 1",
            "Observation Related to",
        ],
    ),
    (
        ObservationField::Consequences,
        &["Potential Consequences", "Consequences"],
    ),
];

/// Header spellings accepted for `field`.
pub fn aliases(field: ObservationField) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, a)| *a)
        .unwrap_or(&[])
}

// ── HeaderIndex ───────────────────────────────────────────────────────────────

/// Candidate column positions per field, resolved once from a header row.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    candidates: HashMap<ObservationField, Vec<usize>>,
}

impl HeaderIndex {
    /// Resolve every field's aliases against `headers`.
    ///
    /// When two headers normalize to the same key the later column wins.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut columns: HashMap<String, usize> = HashMap::new();
        for (idx, header) in headers.into_iter().enumerate() {
            columns.insert(normalize_header(header), idx);
        }

        let candidates = FIELD_ALIASES
            .iter()
            .map(|(field, aliases)| {
                let mut cols: Vec<usize> = Vec::new();
                for alias in aliases.iter() {
                    if let Some(&idx) = columns.get(&normalize_header(alias)) {
                        if !cols.contains(&idx) {
                            cols.push(idx);
                        }
                    }
                }
                (*field, cols)
            })
            .collect();

        Self { candidates }
    }

    /// Whether any alias of `field` matched a header.
    pub fn is_resolved(&self, field: ObservationField) -> bool {
        self.candidates.get(&field).is_some_and(|c| !c.is_empty())
    }

    /// Fields with no matching header, in declaration order.
    pub fn unresolved(&self) -> Vec<ObservationField> {
        ObservationField::ALL
            .into_iter()
            .filter(|f| !self.is_resolved(*f))
            .collect()
    }

    /// Value of `field` in `row`: the first candidate column the row actually
    /// has, even when that cell is empty.
    pub fn value<'r>(&self, field: ObservationField, row: &'r StringRecord) -> Option<&'r str> {
        self.candidates
            .get(&field)?
            .iter()
            .find_map(|&idx| row.get(idx))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
