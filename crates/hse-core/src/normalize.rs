//! Grouping-key normalization for free-text category fields and CSV headers.

use std::collections::HashMap;

use crate::models::ChartDataPoint;

/// Normalized keys that mean "no value" and are dropped from grouped counts.
pub const STOPLIST: [&str; 5] = ["", "not specified", "unspecified", "null", "n/a"];

/// Normalize a CSV header name: lowercase, keep only ASCII alphanumerics.
///
/// `"Observation Related to (Max. 2 selections) - 1"` becomes
/// `"observationrelatedtomax2selections1"`.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Normalize a free-text category value into its grouping key.
///
/// Trims, lowercases and collapses internal whitespace runs to one space.
/// Returns `None` when the key is on the [`STOPLIST`].
pub fn normalize_category(raw: &str) -> Option<String> {
    let key = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if STOPLIST.contains(&key.as_str()) {
        None
    } else {
        Some(key)
    }
}

// ── OrderedCounts ─────────────────────────────────────────────────────────────

/// Exact-key counter that remembers first-appearance order.
///
/// Sorting is stable, so keys with equal counts keep the order in which they
/// were first seen.
#[derive(Debug, Clone, Default)]
pub struct OrderedCounts {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl OrderedCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.index.get(key).map_or(0, |&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in first-appearance order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, count)` pairs sorted by descending count.
    pub fn into_sorted_desc(self) -> Vec<(String, u64)> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// Chart points sorted by descending count, optionally truncated.
    pub fn into_chart_points(self, limit: Option<usize>) -> Vec<ChartDataPoint> {
        let sorted = self.into_sorted_desc();
        let take = limit.unwrap_or(sorted.len());
        sorted
            .into_iter()
            .take(take)
            .map(|(name, value)| ChartDataPoint::new(name, value))
            .collect()
    }
}

impl<'a> FromIterator<&'a str> for OrderedCounts {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut counts = Self::new();
        for key in iter {
            counts.add(key);
        }
        counts
    }
}

// ── CategoryCounter ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CategoryGroup {
    label: String,
    count: u64,
}

/// Counter over normalized category keys.
///
/// The first raw value (trimmed) seen for a key becomes that group's display
/// label; later values only add to the count. Stoplisted values are ignored.
#[derive(Debug, Clone, Default)]
pub struct CategoryCounter {
    index: HashMap<String, usize>,
    groups: Vec<CategoryGroup>,
}

impl CategoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `raw`. Returns `false` when the value was stoplisted.
    pub fn add(&mut self, raw: &str) -> bool {
        let Some(key) = normalize_category(raw) else {
            return false;
        };
        match self.index.get(&key) {
            Some(&i) => self.groups[i].count += 1,
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push(CategoryGroup {
                    label: raw.trim().to_string(),
                    count: 1,
                });
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The `limit` largest groups, descending by count.
    pub fn top(self, limit: usize) -> Vec<ChartDataPoint> {
        let mut groups = self.groups;
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups
            .into_iter()
            .take(limit)
            .map(|g| ChartDataPoint::new(g.label, g.count))
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── normalize_header ──────────────────────────────────────────────────────

    #[test]
    fn test_normalize_header_strips_punctuation() {
        assert_eq!(normalize_header("Report ID"), "reportid");
        assert_eq!(normalize_header("SI #"), "si");
        assert_eq!(normalize_header("Mapped_Issue"), "mappedissue");
        assert_eq!(
            normalize_header("Observation Related to (Max. 2 selections) - 1"),
            "observationrelatedtomax2selections1"
        );
    }

    // ── normalize_category ────────────────────────────────────────────────────

    #[test]
    fn test_normalize_category_collapses_whitespace() {
        assert_eq!(
            normalize_category("  Slip   Hazard "),
            Some("slip hazard".to_string())
        );
        assert_eq!(
            normalize_category("Slip\tHazard"),
            Some("slip hazard".to_string())
        );
    }

    #[test]
    fn test_normalize_category_stoplist() {
        for raw in ["", "   ", "Not Specified", "UNSPECIFIED", "null", "N/A"] {
            assert_eq!(normalize_category(raw), None, "{raw:?} should be dropped");
        }
    }

    // ── OrderedCounts ─────────────────────────────────────────────────────────

    #[test]
    fn test_ordered_counts_ties_keep_first_appearance() {
        let counts: OrderedCounts = ["b", "a", "c", "a", "b"].into_iter().collect();
        let sorted = counts.into_sorted_desc();
        let keys: Vec<&str> = sorted.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_ordered_counts_chart_points_limit() {
        let counts: OrderedCounts = ["x", "y", "y", "z", "z", "z"].into_iter().collect();
        assert_eq!(counts.get("z"), 3);
        let points = counts.into_chart_points(Some(2));
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], ChartDataPoint::new("z", 3));
        assert_eq!(points[1], ChartDataPoint::new("y", 2));
    }

    // ── CategoryCounter ───────────────────────────────────────────────────────

    #[test]
    fn test_category_counter_merges_variants_first_label_wins() {
        let mut counter = CategoryCounter::new();
        for raw in ["Slip  Hazard", "slip hazard", " Slip Hazard "] {
            assert!(counter.add(raw));
        }
        let top = counter.top(10);
        assert_eq!(top, vec![ChartDataPoint::new("Slip  Hazard", 3)]);
    }

    #[test]
    fn test_category_counter_skips_stoplisted() {
        let mut counter = CategoryCounter::new();
        assert!(!counter.add("Unspecified"));
        assert!(!counter.add("n/a"));
        assert!(counter.add("PPE"));
        assert_eq!(counter.len(), 1);
    }

    #[test]
    fn test_category_counter_top_truncates_descending() {
        let mut counter = CategoryCounter::new();
        for raw in ["A", "B", "B", "C", "C", "C", "D"] {
            counter.add(raw);
        }
        let top = counter.top(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "C");
        assert_eq!(top[1].name, "B");
    }
}
