//! Dashboard aggregations over an observation slice.
//!
//! Every function here is pure: it reads a slice and returns freshly built
//! chart points or rows. "Top N" results are sorted by descending count with
//! a stable sort, so ties keep the order in which keys first appeared.

use std::collections::{BTreeSet, HashMap};

use hse_core::formatting::percentage;
use hse_core::models::{
    ChartDataPoint, FilterState, HeatmapRow, Kpi, Observation, ObservationType, RiskByVesselRow,
    RiskLevel, TypeByVesselRow, UNSPECIFIED,
};
use hse_core::normalize::{CategoryCounter, OrderedCounts};
use hse_core::time_utils::compare_report_dates;

/// Number of areas kept by [`area_of_work_stats`].
pub const AREA_OF_WORK_TOP: usize = 7;
/// Number of vessel rows kept by [`types_by_vessel`].
pub const TYPES_BY_VESSEL_TOP: usize = 7;
/// Number of consequence rows kept by [`heatmap`].
pub const HEATMAP_TOP: usize = 10;
/// Default limit for the normalized top-N groupings.
pub const DEFAULT_TOP_LIMIT: usize = 10;

// ── Filtering ─────────────────────────────────────────────────────────────────

/// Observations matching every active predicate in `filters`.
pub fn filter_observations(data: &[Observation], filters: &FilterState) -> Vec<Observation> {
    if filters.is_empty() {
        return data.to_vec();
    }
    data.iter().filter(|o| filters.matches(o)).cloned().collect()
}

// ── Headline numbers ──────────────────────────────────────────────────────────

pub fn kpis(data: &[Observation]) -> Kpi {
    let mut kpi = Kpi {
        total_observations: data.len() as u64,
        ..Kpi::default()
    };
    for obs in data {
        if obs.is_corrected() {
            kpi.corrected_count += 1;
        }
        if obs.intervention {
            kpi.intervention_count += 1;
        }
        match obs.category {
            Some(RiskLevel::High) => kpi.high_risk_count += 1,
            Some(RiskLevel::Medium) => kpi.medium_risk_count += 1,
            Some(RiskLevel::Low) => kpi.low_risk_count += 1,
            Some(RiskLevel::Other(_)) | None => {}
        }
    }
    kpi.percent_corrected = percentage(kpi.corrected_count, kpi.total_observations);
    kpi
}

/// One point per recognised risk tier, coloured, omitting empty tiers.
pub fn risk_distribution(data: &[Observation]) -> Vec<ChartDataPoint> {
    RiskLevel::TIERS
        .iter()
        .filter_map(|tier| {
            let count = data.iter().filter(|o| o.has_risk(tier)).count() as u64;
            if count == 0 {
                return None;
            }
            let point = ChartDataPoint::new(tier.as_str(), count);
            Some(match tier.color() {
                Some(color) => point.with_color(color),
                None => point,
            })
        })
        .collect()
}

// ── Grouped counts ────────────────────────────────────────────────────────────

/// Observation count per non-empty vessel, descending.
pub fn vessel_data(data: &[Observation]) -> Vec<ChartDataPoint> {
    non_empty_counts(data.iter().map(|o| o.vessel.as_str())).into_chart_points(None)
}

/// Observation count per recorded type, descending.
pub fn observations_by_type(data: &[Observation]) -> Vec<ChartDataPoint> {
    non_empty_counts(
        data.iter()
            .filter_map(|o| o.observation_type.as_ref().map(ObservationType::as_str)),
    )
    .into_chart_points(None)
}

/// The [`AREA_OF_WORK_TOP`] busiest areas of work.
pub fn area_of_work_stats(data: &[Observation]) -> Vec<ChartDataPoint> {
    non_empty_counts(data.iter().map(|o| o.area_of_work.as_str()))
        .into_chart_points(Some(AREA_OF_WORK_TOP))
}

/// Most frequent mapped issues after category normalization.
pub fn top_mapped_issues(data: &[Observation], limit: usize) -> Vec<ChartDataPoint> {
    let mut counter = CategoryCounter::new();
    for obs in data {
        counter.add(&obs.mapped_issue);
    }
    counter.top(limit)
}

/// Most frequent "observation related to" values after normalization.
pub fn top_related_observations(data: &[Observation], limit: usize) -> Vec<ChartDataPoint> {
    let mut counter = CategoryCounter::new();
    for obs in data {
        counter.add(&obs.observation_related_to1);
    }
    counter.top(limit)
}

// ── Cross-tabs ────────────────────────────────────────────────────────────────

/// Risk-tier breakdown per vessel, sorted by vessel total descending.
pub fn risk_by_vessel(data: &[Observation]) -> Vec<RiskByVesselRow> {
    let mut rows: Vec<RiskByVesselRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for obs in data.iter().filter(|o| !o.vessel.is_empty()) {
        let i = *index.entry(obs.vessel.as_str()).or_insert_with(|| {
            rows.push(RiskByVesselRow {
                name: obs.vessel.clone(),
                ..RiskByVesselRow::default()
            });
            rows.len() - 1
        });
        let row = &mut rows[i];
        row.total += 1;
        match obs.category {
            Some(RiskLevel::High) => row.high_risk += 1,
            Some(RiskLevel::Medium) => row.medium_risk += 1,
            Some(RiskLevel::Low) => row.low_risk += 1,
            Some(RiskLevel::Other(_)) | None => {}
        }
    }

    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

/// Unsafe act / unsafe condition split for the [`TYPES_BY_VESSEL_TOP`]
/// vessels with the most observations.
pub fn types_by_vessel(data: &[Observation]) -> Vec<TypeByVesselRow> {
    let mut rows: Vec<TypeByVesselRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for obs in data.iter().filter(|o| !o.vessel.is_empty()) {
        let i = *index.entry(obs.vessel.as_str()).or_insert_with(|| {
            rows.push(TypeByVesselRow {
                name: obs.vessel.clone(),
                ..TypeByVesselRow::default()
            });
            rows.len() - 1
        });
        let row = &mut rows[i];
        row.total += 1;
        match obs.observation_type {
            Some(ObservationType::UnsafeAct) => row.unsafe_act += 1,
            Some(ObservationType::UnsafeCondition) => row.unsafe_condition += 1,
            Some(ObservationType::Other(_)) | None => {}
        }
    }

    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows.truncate(TYPES_BY_VESSEL_TOP);
    rows
}

/// Consequence × risk-tier counts, the [`HEATMAP_TOP`] heaviest rows first.
///
/// An empty consequence is reported as `Unspecified`.
pub fn heatmap(data: &[Observation]) -> Vec<HeatmapRow> {
    let mut rows: Vec<HeatmapRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for obs in data {
        let key = if obs.consequences.is_empty() {
            UNSPECIFIED
        } else {
            obs.consequences.as_str()
        };
        let i = *index.entry(key).or_insert_with(|| {
            rows.push(HeatmapRow {
                consequence: key.to_string(),
                ..HeatmapRow::default()
            });
            rows.len() - 1
        });
        let row = &mut rows[i];
        match obs.category {
            Some(RiskLevel::High) => row.high_risk += 1,
            Some(RiskLevel::Medium) => row.medium_risk += 1,
            Some(RiskLevel::Low) => row.low_risk += 1,
            Some(RiskLevel::Other(_)) | None => {}
        }
    }

    rows.sort_by(|a, b| b.total().cmp(&a.total()));
    rows.truncate(HEATMAP_TOP);
    rows
}

// ── Dates and filter values ───────────────────────────────────────────────────

/// Daily observation counts keyed by `dateReported`, in calendar order.
///
/// Unparseable dates are kept as their own points after all valid dates, in
/// first-appearance order.
pub fn trend_data(data: &[Observation]) -> Vec<ChartDataPoint> {
    let counts = non_empty_counts(data.iter().map(|o| o.date_reported.as_str()));
    let mut entries: Vec<ChartDataPoint> = counts
        .keys()
        .map(|date| ChartDataPoint::new(date, counts.get(date)))
        .collect();
    entries.sort_by(|a, b| compare_report_dates(&a.name, &b.name));
    entries
}

/// Distinct non-empty report dates, in calendar order.
pub fn date_list(data: &[Observation]) -> Vec<String> {
    let counts = non_empty_counts(data.iter().map(|o| o.date_reported.as_str()));
    let mut dates: Vec<String> = counts.keys().map(str::to_string).collect();
    dates.sort_by(|a, b| compare_report_dates(a, b));
    dates
}

/// Distinct non-empty vessel names, alphabetically.
pub fn vessel_list(data: &[Observation]) -> Vec<String> {
    data.iter()
        .filter(|o| !o.vessel.is_empty())
        .map(|o| o.vessel.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn non_empty_counts<'a>(keys: impl Iterator<Item = &'a str>) -> OrderedCounts {
    keys.filter(|k| !k.is_empty()).collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hse_core::models::Outcome;

    fn obs(vessel: &str, risk: Option<RiskLevel>) -> Observation {
        Observation {
            id: format!("{vessel}-x"),
            vessel: vessel.to_string(),
            category: risk,
            ..Observation::default()
        }
    }

    fn dated(vessel: &str, date: &str) -> Observation {
        Observation {
            date_reported: date.to_string(),
            ..obs(vessel, None)
        }
    }

    // ── filter_observations ──────────────────────────────────────────────────

    #[test]
    fn test_filter_observations_by_vessel_and_risk() {
        let data = vec![
            obs("A", Some(RiskLevel::High)),
            obs("A", Some(RiskLevel::Low)),
            obs("B", Some(RiskLevel::High)),
        ];
        let filters = FilterState {
            vessel: Some("A".to_string()),
            risk_level: Some(RiskLevel::High),
            date_reported: None,
        };
        let view = filter_observations(&data, &filters);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].vessel, "A");
        assert_eq!(filter_observations(&data, &FilterState::default()).len(), 3);
    }

    // ── kpis ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_kpis_counts() {
        let mut data = vec![
            obs("A", Some(RiskLevel::High)),
            obs("A", Some(RiskLevel::Medium)),
            obs("B", Some(RiskLevel::Other("Critical".to_string()))),
        ];
        data[0].outcome = Some(Outcome::Corrected);
        data[1].outcome = Some(Outcome::PartlyCorrected);
        data[2].intervention = true;

        let k = kpis(&data);
        assert_eq!(k.total_observations, 3);
        assert_eq!(k.corrected_count, 1);
        assert_eq!(k.percent_corrected, 33);
        assert_eq!(k.intervention_count, 1);
        assert_eq!(k.high_risk_count, 1);
        assert_eq!(k.medium_risk_count, 1);
        assert_eq!(k.low_risk_count, 0);
        assert!(k.high_risk_count + k.medium_risk_count + k.low_risk_count <= k.total_observations);
    }

    #[test]
    fn test_kpis_empty() {
        let k = kpis(&[]);
        assert_eq!(k, Kpi::default());
        assert_eq!(k.percent_corrected, 0);
    }

    // ── risk_distribution ────────────────────────────────────────────────────

    #[test]
    fn test_risk_distribution_omits_zero_tiers() {
        let data = vec![
            obs("A", Some(RiskLevel::Low)),
            obs("A", Some(RiskLevel::High)),
            obs("A", None),
        ];
        let dist = risk_distribution(&data);
        assert_eq!(
            dist,
            vec![
                ChartDataPoint::new("High Risk", 1).with_color("#E74C3C"),
                ChartDataPoint::new("Low Risk", 1).with_color("#2ECC71"),
            ]
        );
    }

    // ── grouped counts ───────────────────────────────────────────────────────

    #[test]
    fn test_vessel_data_descending_skips_empty() {
        let data = vec![obs("B", None), obs("A", None), obs("A", None), obs("", None)];
        assert_eq!(
            vessel_data(&data),
            vec![ChartDataPoint::new("A", 2), ChartDataPoint::new("B", 1)]
        );
    }

    #[test]
    fn test_vessel_data_ties_keep_first_appearance() {
        let data = vec![obs("Zeta", None), obs("Alpha", None)];
        let names: Vec<String> = vessel_data(&data).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_observations_by_type() {
        let mut data = vec![obs("A", None), obs("A", None), obs("A", None)];
        data[0].observation_type = Some(ObservationType::UnsafeCondition);
        data[1].observation_type = Some(ObservationType::UnsafeAct);
        data[2].observation_type = Some(ObservationType::UnsafeAct);
        assert_eq!(
            observations_by_type(&data),
            vec![
                ChartDataPoint::new("UNSAFE_ACT", 2),
                ChartDataPoint::new("UNSAFE_CONDITION", 1)
            ]
        );
    }

    #[test]
    fn test_area_of_work_stats_top_seven() {
        let mut data = Vec::new();
        for (i, area) in ["a", "b", "c", "d", "e", "f", "g", "h", "i"].iter().enumerate() {
            for _ in 0..=i {
                data.push(Observation {
                    area_of_work: area.to_string(),
                    ..Observation::default()
                });
            }
        }
        let stats = area_of_work_stats(&data);
        assert_eq!(stats.len(), AREA_OF_WORK_TOP);
        assert_eq!(stats[0], ChartDataPoint::new("i", 9));
        assert!(stats.windows(2).all(|w| w[0].value >= w[1].value));
    }

    #[test]
    fn test_top_mapped_issues_normalizes_and_limits() {
        let issues = ["Slip  Hazard", "slip hazard", " Slip Hazard ", "PPE", "Unspecified", "n/a"];
        let data: Vec<Observation> = issues
            .iter()
            .map(|i| Observation {
                mapped_issue: i.to_string(),
                ..Observation::default()
            })
            .collect();
        assert_eq!(
            top_mapped_issues(&data, DEFAULT_TOP_LIMIT),
            vec![
                ChartDataPoint::new("Slip  Hazard", 3),
                ChartDataPoint::new("PPE", 1)
            ]
        );
        assert_eq!(top_mapped_issues(&data, 1).len(), 1);
    }

    #[test]
    fn test_top_related_observations() {
        let data: Vec<Observation> = ["Housekeeping", "housekeeping", "Unspecified"]
            .iter()
            .map(|r| Observation {
                observation_related_to1: r.to_string(),
                ..Observation::default()
            })
            .collect();
        assert_eq!(
            top_related_observations(&data, 10),
            vec![ChartDataPoint::new("Housekeeping", 2)]
        );
    }

    // ── cross-tabs ───────────────────────────────────────────────────────────

    #[test]
    fn test_risk_by_vessel_rows() {
        let data = vec![
            obs("A", Some(RiskLevel::Low)),
            obs("B", Some(RiskLevel::High)),
            obs("B", Some(RiskLevel::Medium)),
            obs("B", Some(RiskLevel::Other("Critical".to_string()))),
        ];
        let rows = risk_by_vessel(&data);
        assert_eq!(
            rows[0],
            RiskByVesselRow {
                name: "B".to_string(),
                high_risk: 1,
                medium_risk: 1,
                low_risk: 0,
                total: 3,
            }
        );
        assert_eq!(rows[1].name, "A");
        assert_eq!(rows[1].low_risk, 1);
    }

    #[test]
    fn test_risk_by_vessel_serializes_camel_case() {
        let rows = risk_by_vessel(&[obs("A", Some(RiskLevel::High))]);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["highRisk"], 1);
        assert_eq!(json["total"], 1);
    }

    #[test]
    fn test_types_by_vessel_truncates() {
        let mut data = Vec::new();
        for v in 0..9 {
            let mut o = obs(&format!("V{v}"), None);
            o.observation_type = Some(ObservationType::UnsafeAct);
            data.push(o);
        }
        let mut extra = obs("V8", None);
        extra.observation_type = Some(ObservationType::UnsafeCondition);
        data.push(extra);

        let rows = types_by_vessel(&data);
        assert_eq!(rows.len(), TYPES_BY_VESSEL_TOP);
        assert_eq!(rows[0].name, "V8");
        assert_eq!(rows[0].unsafe_act, 1);
        assert_eq!(rows[0].unsafe_condition, 1);
        assert_eq!(rows[0].total, 2);
        assert_eq!(rows[1].name, "V0");
    }

    #[test]
    fn test_heatmap_groups_and_sorts() {
        let mut data = vec![
            obs("A", Some(RiskLevel::High)),
            obs("A", Some(RiskLevel::Low)),
            obs("A", Some(RiskLevel::High)),
            obs("A", None),
        ];
        data[0].consequences = "Injury".to_string();
        data[1].consequences = String::new();
        data[2].consequences = "Injury".to_string();
        data[3].consequences = "Fire".to_string();

        let rows = heatmap(&data);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].consequence, "Injury");
        assert_eq!(rows[0].high_risk, 2);
        assert_eq!(rows[1].consequence, UNSPECIFIED);
        assert_eq!(rows[1].low_risk, 1);
        assert_eq!(rows[2].consequence, "Fire");
        assert_eq!(rows[2].total(), 0);
    }

    #[test]
    fn test_heatmap_top_ten() {
        let data: Vec<Observation> = (0..12)
            .map(|i| Observation {
                consequences: format!("C{i}"),
                category: Some(RiskLevel::Medium),
                ..Observation::default()
            })
            .collect();
        assert_eq!(heatmap(&data).len(), HEATMAP_TOP);
    }

    // ── dates ────────────────────────────────────────────────────────────────

    #[test]
    fn test_trend_data_calendar_order_invalid_last() {
        let data = vec![
            dated("A", "02-01-2025"),
            dated("A", "garbage"),
            dated("A", "30-12-2024"),
            dated("A", "02-01-2025"),
            dated("A", ""),
        ];
        let trend = trend_data(&data);
        assert_eq!(
            trend,
            vec![
                ChartDataPoint::new("30-12-2024", 1),
                ChartDataPoint::new("02-01-2025", 2),
                ChartDataPoint::new("garbage", 1),
            ]
        );
    }

    #[test]
    fn test_trend_data_invalid_dates_keep_first_appearance() {
        let data = vec![
            dated("A", "unknown"),
            dated("A", "n/a"),
            dated("A", "n/a"),
            dated("A", "n/a"),
            dated("A", "01-01-2025"),
        ];
        let trend = trend_data(&data);
        assert_eq!(
            trend,
            vec![
                ChartDataPoint::new("01-01-2025", 1),
                ChartDataPoint::new("unknown", 1),
                ChartDataPoint::new("n/a", 3),
            ]
        );
    }

    #[test]
    fn test_date_list_distinct_sorted() {
        let data = vec![
            dated("A", "15-03-2025"),
            dated("B", "01-03-2025"),
            dated("C", "15-03-2025"),
            dated("D", ""),
        ];
        assert_eq!(date_list(&data), vec!["01-03-2025", "15-03-2025"]);
    }

    #[test]
    fn test_vessel_list_sorted_and_deduplicated() {
        let data = vec![obs("Charlie", None), obs("Alpha", None), obs("Charlie", None), obs("", None)];
        assert_eq!(vessel_list(&data), vec!["Alpha", "Charlie"]);
    }
}
