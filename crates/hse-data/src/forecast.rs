//! Weekly incident forecasting.
//!
//! Observations are bucketed into seven-day windows counted from the
//! earliest valid report date, gaps are filled with zero counts so the
//! window index is evenly spaced, and a least-squares line over
//! `(window index, count)` is projected forward.

use chrono::NaiveDate;
use serde::Serialize;

use hse_core::models::{ChartDataPoint, Observation};
use hse_core::regression::{fit_counts, RegressionResult};
use hse_core::time_utils::{window_index, window_label, window_start};

pub use hse_core::settings::DEFAULT_WEEKS_TO_PREDICT;

/// Multiplier applied to a vessel's next-week projection when its trend is
/// rising.
///
/// This is a policy bias toward escalating risk, not a fitted quantity. It
/// changes which vessels rank highest in [`vessel_forecast`].
pub const UPWARD_TREND_ADJUSTMENT: f64 = 1.2;

/// Number of vessels returned by [`vessel_forecast`].
pub const VESSEL_FORECAST_TOP: usize = 5;

/// Suffix marking projected window labels.
pub const ESTIMATE_SUFFIX: &str = " (Est)";

// ── WeeklySeries ──────────────────────────────────────────────────────────────

/// Gap-filled weekly counts starting at the earliest valid report date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySeries {
    /// First day of window 0.
    pub start: NaiveDate,
    /// Observation count per window; never empty.
    pub counts: Vec<u64>,
}

impl WeeklySeries {
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total observations across all windows.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `"d/m-d/m"` label of window `index` (which may lie in the future).
    pub fn label(&self, index: usize) -> String {
        window_label(window_start(self.start, index))
    }

    /// Least-squares fit over `(index, count)`.
    pub fn regression(&self) -> RegressionResult {
        fit_counts(&self.counts)
    }

    /// Projected count `weeks_ahead` windows past the last one.
    pub fn project(&self, weeks_ahead: usize) -> u64 {
        let next = (self.len() - 1 + weeks_ahead) as f64;
        self.regression().project_count(next)
    }
}

/// Bucket `data` into weekly windows.
///
/// Observations with unparseable dates are ignored. Returns `None` when no
/// observation has a valid date.
pub fn weekly_series<'a, I>(data: I) -> Option<WeeklySeries>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let dates: Vec<NaiveDate> = data.into_iter().filter_map(Observation::report_date).collect();
    let start = *dates.iter().min()?;
    let end = *dates.iter().max()?;

    let mut counts = vec![0u64; window_index(start, end) + 1];
    for date in dates {
        counts[window_index(start, date)] += 1;
    }

    Some(WeeklySeries { start, counts })
}

// ── Forecasts ─────────────────────────────────────────────────────────────────

/// Historical weekly counts followed by `weeks` projected windows.
///
/// Historical points carry the actual count in `value`; projected points
/// have `value = 0` and the estimate in `secondary_value`. Empty when no
/// observation has a valid date.
pub fn weekly_forecast(data: &[Observation], weeks: usize) -> Vec<ChartDataPoint> {
    let Some(series) = weekly_series(data) else {
        return Vec::new();
    };
    let regression = series.regression();
    let last = series.len() - 1;

    let mut points: Vec<ChartDataPoint> = series
        .counts
        .iter()
        .enumerate()
        .map(|(i, &count)| ChartDataPoint::historical(series.label(i), count))
        .collect();

    points.extend((1..=weeks).map(|ahead| {
        let index = last + ahead;
        ChartDataPoint::prediction(
            format!("{}{ESTIMATE_SUFFIX}", series.label(index)),
            regression.project_count(index as f64),
        )
    }));

    points
}

/// Next-week projection per vessel, the [`VESSEL_FORECAST_TOP`] highest
/// first.
///
/// Each vessel is bucketed from its own earliest date. Vessels with fewer
/// than two windows use their average per window; rising trends are scaled
/// by [`UPWARD_TREND_ADJUSTMENT`]. Empty when the dataset has no valid date.
pub fn vessel_forecast(data: &[Observation]) -> Vec<ChartDataPoint> {
    if weekly_series(data).is_none() {
        return Vec::new();
    }

    let mut vessels: Vec<&str> = Vec::new();
    for obs in data {
        if !obs.vessel.is_empty() && !vessels.contains(&obs.vessel.as_str()) {
            vessels.push(&obs.vessel);
        }
    }

    let mut points: Vec<ChartDataPoint> = vessels
        .into_iter()
        .map(|vessel| {
            let subset: Vec<&Observation> = data.iter().filter(|o| o.vessel == vessel).collect();
            ChartDataPoint::new(vessel, next_week_for_vessel(&subset))
        })
        .collect();

    points.sort_by(|a, b| b.value.cmp(&a.value));
    points.truncate(VESSEL_FORECAST_TOP);
    points
}

fn next_week_for_vessel(subset: &[&Observation]) -> u64 {
    let series = weekly_series(subset.iter().copied());
    let windows = series.as_ref().map_or(0, WeeklySeries::len);

    let Some(series) = series.filter(|s| s.len() >= 2) else {
        let average = subset.len() as f64 / windows.max(1) as f64;
        return average.round() as u64;
    };

    let regression = series.regression();
    let mut predicted = regression.predict(series.len() as f64);
    if regression.is_upward() {
        predicted *= UPWARD_TREND_ADJUSTMENT;
    }
    predicted.max(0.0).round() as u64
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(vessel: &str, date: &str) -> Observation {
        Observation {
            id: format!("{vessel}@{date}"),
            vessel: vessel.to_string(),
            date_reported: date.to_string(),
            ..Observation::default()
        }
    }

    fn repeat(vessel: &str, date: &str, n: usize) -> Vec<Observation> {
        (0..n).map(|_| at(vessel, date)).collect()
    }

    // ── weekly_series ────────────────────────────────────────────────────────

    #[test]
    fn test_weekly_series_fills_gaps() {
        let mut data = repeat("A", "01-01-2024", 2);
        data.push(at("A", "15-01-2024"));
        data.push(at("A", "not a date"));

        let series = weekly_series(&data).unwrap();
        assert_eq!(series.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(series.counts, vec![2, 0, 1]);
        assert_eq!(series.total(), 3);
    }

    #[test]
    fn test_weekly_series_none_without_valid_dates() {
        let data = vec![at("A", ""), at("B", "31-02-2024")];
        assert!(weekly_series(&data).is_none());
    }

    #[test]
    fn test_weekly_series_projection_perfect_line() {
        let mut data = Vec::new();
        for (date, n) in [
            ("01-01-2024", 2),
            ("08-01-2024", 4),
            ("15-01-2024", 6),
            ("22-01-2024", 8),
        ] {
            data.extend(repeat("A", date, n));
        }
        let series = weekly_series(&data).unwrap();
        let r = series.regression();
        assert!((r.slope - 2.0).abs() < 1e-9);
        assert!((r.intercept - 2.0).abs() < 1e-9);
        assert_eq!(series.project(1), 10);
        assert_eq!(series.project(2), 12);
    }

    // ── weekly_forecast ──────────────────────────────────────────────────────

    #[test]
    fn test_weekly_forecast_single_date() {
        let data = repeat("A", "05-03-2025", 3);
        let points = weekly_forecast(&data, DEFAULT_WEEKS_TO_PREDICT);

        assert_eq!(points.len(), 1 + DEFAULT_WEEKS_TO_PREDICT);
        assert_eq!(points[0], ChartDataPoint::historical("5/3-11/3", 3));
        for p in &points[1..] {
            assert_eq!(p.is_prediction, Some(true));
            assert_eq!(p.value, 0);
            assert_eq!(p.secondary_value, Some(3));
        }
        assert_eq!(points[1].name, "12/3-18/3 (Est)");
    }

    #[test]
    fn test_weekly_forecast_labels_and_values() {
        let mut data = repeat("A", "01-01-2024", 2);
        data.push(at("A", "15-01-2024"));

        let points = weekly_forecast(&data, 2);
        let names: Vec<&str> = points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "1/1-7/1",
                "8/1-14/1",
                "15/1-21/1",
                "22/1-28/1 (Est)",
                "29/1-4/2 (Est)"
            ]
        );
        assert_eq!(points[1].value, 0);
        assert_eq!(points[1].is_prediction, Some(false));
        assert_eq!(points[1].secondary_value, None);
    }

    #[test]
    fn test_weekly_forecast_clamps_negative_projection() {
        let mut data = repeat("A", "01-01-2024", 10);
        data.extend(repeat("A", "08-01-2024", 5));
        data.push(at("A", "15-01-2024"));

        let points = weekly_forecast(&data, 4);
        for p in points.iter().filter(|p| p.is_prediction == Some(true)) {
            assert_eq!(p.secondary_value, Some(0));
        }
    }

    #[test]
    fn test_weekly_forecast_empty_without_dates() {
        let data = vec![at("A", ""), at("B", "garbage")];
        assert!(weekly_forecast(&data, 4).is_empty());
        assert!(weekly_forecast(&[], 4).is_empty());
    }

    #[test]
    fn test_weekly_forecast_zero_weeks_is_history_only() {
        let data = repeat("A", "01-01-2024", 1);
        let points = weekly_forecast(&data, 0);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].is_prediction, Some(false));
    }

    // ── vessel_forecast ──────────────────────────────────────────────────────

    #[test]
    fn test_vessel_forecast_ranking_and_adjustment() {
        let mut data = Vec::new();
        // A: counts [1, 2, 3] → slope 1, next = 4 × 1.2 = 4.8.
        data.extend(repeat("A", "01-01-2024", 1));
        data.extend(repeat("A", "08-01-2024", 2));
        data.extend(repeat("A", "15-01-2024", 3));
        // B: a single window of 3 → flat average.
        data.extend(repeat("B", "10-01-2024", 3));
        // C: counts [3, 1] → falling, clamps to 0.
        data.extend(repeat("C", "01-01-2024", 3));
        data.extend(repeat("C", "08-01-2024", 1));

        let points = vessel_forecast(&data);
        assert_eq!(
            points,
            vec![
                ChartDataPoint::new("A", 5),
                ChartDataPoint::new("B", 3),
                ChartDataPoint::new("C", 0),
            ]
        );
    }

    #[test]
    fn test_vessel_forecast_undated_vessel_uses_record_count() {
        let mut data = repeat("Dated", "01-01-2024", 1);
        data.extend(repeat("Undated", "", 2));

        let points = vessel_forecast(&data);
        assert_eq!(points[0], ChartDataPoint::new("Undated", 2));
        assert_eq!(points[1], ChartDataPoint::new("Dated", 1));
    }

    #[test]
    fn test_vessel_forecast_top_five() {
        let data: Vec<Observation> = (0..8)
            .map(|i| at(&format!("V{i}"), "01-01-2024"))
            .collect();
        assert_eq!(vessel_forecast(&data).len(), VESSEL_FORECAST_TOP);
    }

    #[test]
    fn test_vessel_forecast_empty_without_dates() {
        let data = vec![at("A", ""), at("B", "")];
        assert!(vessel_forecast(&data).is_empty());
    }
}
