//! Dashboard snapshot pipeline.
//!
//! Applies the active filters, runs every aggregation over the filtered
//! view and both forecasts over the full dataset, and returns a
//! [`DashboardSnapshot`] ready to serialize.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hse_core::models::{
    ChartDataPoint, FilterState, HeatmapRow, Kpi, Observation, RiskByVesselRow, TypeByVesselRow,
};
use hse_core::settings::DEFAULT_TOP_N;

use crate::aggregator::{
    area_of_work_stats, date_list, filter_observations, heatmap, kpis, observations_by_type,
    risk_by_vessel, risk_distribution, top_mapped_issues, top_related_observations, trend_data,
    types_by_vessel, vessel_data, vessel_list,
};
use crate::forecast::{vessel_forecast, weekly_forecast, DEFAULT_WEEKS_TO_PREDICT};

// ── Public types ──────────────────────────────────────────────────────────────

/// Tunables for [`build_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Future windows appended to the weekly forecast.
    pub weeks_to_predict: usize,
    /// Limit for the mapped-issue and related-observation rankings.
    pub top_n: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            weeks_to_predict: DEFAULT_WEEKS_TO_PREDICT,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Metadata produced alongside the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// RFC 3339 timestamp when this snapshot was generated.
    pub generated_at: String,
    /// Observations in the loaded dataset.
    pub records_total: usize,
    /// Observations left after filtering.
    pub records_in_view: usize,
    /// Observations whose report date could not be parsed.
    pub undated_records: usize,
    pub filters: FilterState,
}

/// Everything the dashboard renders, for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub metadata: SnapshotMetadata,
    pub kpis: Kpi,
    pub vessel_data: Vec<ChartDataPoint>,
    pub risk_distribution: Vec<ChartDataPoint>,
    pub observations_by_type: Vec<ChartDataPoint>,
    pub area_of_work: Vec<ChartDataPoint>,
    pub top_mapped_issues: Vec<ChartDataPoint>,
    pub top_related_observations: Vec<ChartDataPoint>,
    pub risk_by_vessel: Vec<RiskByVesselRow>,
    pub types_by_vessel: Vec<TypeByVesselRow>,
    pub heatmap: Vec<HeatmapRow>,
    pub trend: Vec<ChartDataPoint>,
    pub weekly_forecast: Vec<ChartDataPoint>,
    pub vessel_forecast: Vec<ChartDataPoint>,
    /// Values available to the vessel filter.
    pub vessels: Vec<String>,
    /// Values available to the date filter.
    pub dates: Vec<String>,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Build the dashboard snapshot for `filters`.
pub fn build_snapshot(
    data: &[Observation],
    filters: &FilterState,
    options: &SnapshotOptions,
) -> DashboardSnapshot {
    let started = std::time::Instant::now();
    let view = filter_observations(data, filters);

    let snapshot = DashboardSnapshot {
        metadata: SnapshotMetadata {
            generated_at: Utc::now().to_rfc3339(),
            records_total: data.len(),
            records_in_view: view.len(),
            undated_records: data.iter().filter(|o| o.report_date().is_none()).count(),
            filters: filters.clone(),
        },
        kpis: kpis(&view),
        vessel_data: vessel_data(&view),
        risk_distribution: risk_distribution(&view),
        observations_by_type: observations_by_type(&view),
        area_of_work: area_of_work_stats(&view),
        top_mapped_issues: top_mapped_issues(&view, options.top_n),
        top_related_observations: top_related_observations(&view, options.top_n),
        risk_by_vessel: risk_by_vessel(&view),
        types_by_vessel: types_by_vessel(&view),
        heatmap: heatmap(&view),
        trend: trend_data(&view),
        weekly_forecast: weekly_forecast(data, options.weeks_to_predict),
        vessel_forecast: vessel_forecast(data),
        vessels: vessel_list(data),
        dates: date_list(data),
    };

    debug!(
        "Built snapshot over {}/{} observations in {:.3}s",
        snapshot.metadata.records_in_view,
        snapshot.metadata.records_total,
        started.elapsed().as_secs_f64()
    );
    snapshot
}

// ── Tests ──────────────────────────────────────────────────────────────────────
