//! Rule-based question answering over the loaded observations.
//!
//! A question is turned into [`QueryArgs`] by a handful of regex rules
//! (vessel names, risk tiers, types, outcomes, dates, time ranges and
//! grouping cues), run through [`execute_query`], and rendered as text.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use hse_core::formatting::format_count;
use hse_core::models::{Observation, ObservationField, ObservationType, Outcome, RiskLevel};
use hse_data::aggregator::{kpis, vessel_list};
use hse_data::query::{execute_query, FilterOperator, QueryArgs, QueryFilter, QueryResult, GROUP_LIMIT};

/// Sample records listed under an answer.
pub const ANSWER_SAMPLE_LIMIT: usize = 3;

/// Phrases that map to a `contains` filter on a free-text field.
const TOPICS: [(&str, ObservationField, &str); 3] = [
    ("mental health", ObservationField::ObservationRelatedTo1, "mental"),
    ("procedure", ObservationField::ObservationRelatedTo1, "procedure"),
    ("ppe", ObservationField::MappedIssue, "ppe"),
];

// ── Rules ─────────────────────────────────────────────────────────────────────

fn risk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(high|medium|low)[\s-]+risk\b").expect("regex is valid"))
}

fn type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bunsafe[\s_-]+(act|condition)s?\b").expect("regex is valid")
    })
}

fn outcome_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:(not|partly|partially)\s+)?corrected\b").expect("regex is valid")
    })
}

fn intervention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\binterven(?:tions?|ed)\b").expect("regex is valid"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})-(\d{1,2})-(\d{4})\b").expect("regex is valid"))
}

fn time_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{1,2}):(\d{2})(?::(\d{2}))?\s*(?:to|until|and|-)\s*(\d{1,2}):(\d{2})(?::(\d{2}))?\b",
        )
        .expect("regex is valid")
    })
}

fn top_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\btop\s+(\d{1,3})\b").expect("regex is valid"))
}

fn group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:by|per|which|what|each|most|top(?:\s+\d{1,3})?)\s+(?:(?:common|frequent|reported)\s+)?(?:(?:high|medium|low)[\s-]+risk\s+)?(vessels?|ships?|areas?|locations?|issues?|types?|risks?|categor(?:y|ies)|outcomes?|observers?|ranks?|consequences?|dates?|days?)\b",
        )
        .expect("regex is valid")
    })
}

/// Alternation of the escaped names between non-word boundaries.
///
/// Names shorter than three characters must match case-sensitively, so a
/// vessel called "A" is not found in every sentence containing the article.
fn vessel_matcher(vessels: &[String]) -> Option<Regex> {
    if vessels.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = vessels
        .iter()
        .map(|name| {
            let escaped = regex::escape(name);
            if name.chars().count() < 3 {
                format!("(?-i:{escaped})")
            } else {
                escaped
            }
        })
        .collect();
    let pattern = format!(r"(?i)(?:^|\W)({})(?:\W|$)", alternatives.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, "vessel names could not be compiled into a matcher");
            None
        }
    }
}

fn group_field(noun: &str) -> Option<ObservationField> {
    let noun = noun.to_lowercase();
    let field = match noun.trim_end_matches('s') {
        "vessel" | "ship" => ObservationField::Vessel,
        "area" | "location" => ObservationField::AreaOfWork,
        "issue" => ObservationField::MappedIssue,
        "type" => ObservationField::Type,
        "risk" | "category" | "categorie" => ObservationField::Category,
        "outcome" => ObservationField::Outcome,
        "observer" => ObservationField::ObserverName,
        "rank" => ObservationField::ObserverRank,
        "consequence" => ObservationField::Consequences,
        "date" | "day" => ObservationField::DateReported,
        _ => return None,
    };
    Some(field)
}

// ── Interpretation ────────────────────────────────────────────────────────────

/// Query extracted from a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub args: QueryArgs,
    /// Groups to list, from a "top N" phrase.
    pub top: Option<usize>,
}

impl Interpretation {
    /// No filter and no grouping were recognised.
    pub fn is_overview(&self) -> bool {
        self.args.filters.is_empty() && self.args.group_by.is_none()
    }
}

// ── QueryAssistant ────────────────────────────────────────────────────────────

pub struct QueryAssistant {
    data: Arc<[Observation]>,
    /// Known vessel names, longest first so "MAG Capella" wins over "Capella".
    vessels: Vec<String>,
    /// Whole-word matcher over `vessels`; `None` when there are none.
    vessel_re: Option<Regex>,
}

impl QueryAssistant {
    pub fn new(data: Arc<[Observation]>) -> Self {
        let mut vessels = vessel_list(&data);
        vessels.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let vessel_re = vessel_matcher(&vessels);
        Self {
            data,
            vessels,
            vessel_re,
        }
    }

    /// Known vessel mentioned in `question` as a whole word.
    fn find_vessel(&self, question: &str) -> Option<&str> {
        let caps = self.vessel_re.as_ref()?.captures(question)?;
        let mentioned = caps.get(1)?.as_str().to_lowercase();
        self.vessels
            .iter()
            .find(|v| v.to_lowercase() == mentioned)
            .map(String::as_str)
    }

    /// Translate `question` into a query.
    pub fn interpret(&self, question: &str) -> Interpretation {
        let lower = question.to_lowercase();
        let mut filters = Vec::new();

        if let Some(vessel) = self.find_vessel(question) {
            filters.push(QueryFilter::new(
                ObservationField::Vessel,
                FilterOperator::Equals,
                vessel,
            ));
        }

        if let Some(caps) = risk_re().captures(question) {
            let tier = match caps[1].to_lowercase().as_str() {
                "high" => RiskLevel::High,
                "medium" => RiskLevel::Medium,
                _ => RiskLevel::Low,
            };
            filters.push(QueryFilter::new(
                ObservationField::Category,
                FilterOperator::Equals,
                tier.as_str(),
            ));
        }

        if let Some(caps) = type_re().captures(question) {
            let kind = if caps[1].eq_ignore_ascii_case("act") {
                ObservationType::UnsafeAct
            } else {
                ObservationType::UnsafeCondition
            };
            filters.push(QueryFilter::new(
                ObservationField::Type,
                FilterOperator::Equals,
                kind.as_str(),
            ));
        }

        if let Some(caps) = outcome_re().captures(question) {
            let outcome = match caps.get(1).map(|m| m.as_str().to_lowercase()) {
                Some(q) if q == "not" => Outcome::NotCorrected,
                Some(_) => Outcome::PartlyCorrected,
                None => Outcome::Corrected,
            };
            filters.push(QueryFilter::new(
                ObservationField::Outcome,
                FilterOperator::Equals,
                outcome.as_str(),
            ));
        }

        if intervention_re().is_match(question) {
            filters.push(QueryFilter::new(
                ObservationField::Intervention,
                FilterOperator::Equals,
                "true",
            ));
        }

        if let Some(caps) = date_re().captures(question) {
            let date = format!("{:0>2}-{:0>2}-{}", &caps[1], &caps[2], &caps[3]);
            filters.push(QueryFilter::new(
                ObservationField::DateReported,
                FilterOperator::Equals,
                date,
            ));
        }

        if let Some(caps) = time_range_re().captures(question) {
            // Without seconds the lower bound stays `HH:MM`, which sorts before
            // both `HH:MM` and `HH:MM:SS` values of that minute.
            let start_seconds = caps.get(3).map_or(String::new(), |m| format!(":{}", m.as_str()));
            let end_seconds = caps.get(6).map_or("59", |m| m.as_str());
            filters.push(QueryFilter::new(
                ObservationField::TimeReported,
                FilterOperator::Gte,
                format!("{:0>2}:{}{start_seconds}", &caps[1], &caps[2]),
            ));
            filters.push(QueryFilter::new(
                ObservationField::TimeReported,
                FilterOperator::Lte,
                format!("{:0>2}:{}:{end_seconds}", &caps[4], &caps[5]),
            ));
        }

        for (phrase, field, needle) in TOPICS {
            if lower.contains(phrase) {
                filters.push(QueryFilter::new(field, FilterOperator::Contains, needle));
            }
        }

        let group_by = group_re()
            .captures(question)
            .and_then(|caps| group_field(&caps[1]));
        let top = top_re()
            .captures(question)
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .filter(|&n| n > 0);

        Interpretation {
            args: QueryArgs {
                filters,
                group_by,
                limit: Some(ANSWER_SAMPLE_LIMIT),
            },
            top,
        }
    }

    /// Answer `question` in plain text.
    pub fn answer(&self, question: &str) -> String {
        let interpretation = self.interpret(question);
        if interpretation.is_overview() {
            return self.overview();
        }

        let result = execute_query(&self.data, &interpretation.args);
        tracing::debug!(
            filters = result.filters_applied.len(),
            matches = result.total_count,
            "question answered"
        );
        render(&interpretation, &result)
    }

    /// KPI summary of the whole dataset.
    pub fn overview(&self) -> String {
        if self.data.is_empty() {
            return "No observations are loaded.".to_string();
        }
        let k = kpis(&self.data);
        let vessels = self.vessels.len();
        format!(
            "{} {} loaded across {vessels} {}. Risk: {} high, {} medium, {} low. \
             {} corrected ({}%), {} with intervention.",
            format_count(k.total_observations),
            plural(k.total_observations, "observation"),
            plural(vessels as u64, "vessel"),
            format_count(k.high_risk_count),
            format_count(k.medium_risk_count),
            format_count(k.low_risk_count),
            format_count(k.corrected_count),
            k.percent_corrected,
            format_count(k.intervention_count),
        )
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn render(interpretation: &Interpretation, result: &QueryResult) -> String {
    let mut lines = Vec::new();

    let count = format!(
        "{} {}",
        format_count(result.total_count),
        plural(result.total_count, "observation")
    );
    if result.filters_applied.is_empty() {
        lines.push(format!("{count} in total."));
    } else {
        let conditions: Vec<String> = result
            .filters_applied
            .iter()
            .map(ToString::to_string)
            .collect();
        lines.push(format!("{count} matching {}.", conditions.join(" and ")));
    }

    if let (Some(field), Some(groups)) = (interpretation.args.group_by, &result.aggregation_result) {
        if !groups.is_empty() {
            lines.push(format!("By {field}:"));
            let shown = interpretation.top.unwrap_or(GROUP_LIMIT);
            for (rank, group) in groups.iter().take(shown).enumerate() {
                lines.push(format!(
                    "  {}. {}: {}",
                    rank + 1,
                    group.name,
                    format_count(group.value)
                ));
            }
        }
    }

    if !result.sample_records.is_empty() {
        lines.push("Examples:".to_string());
        for r in &result.sample_records {
            lines.push(format!(
                "  - {} | {} {} | {} | {} | {}",
                r.id, r.date, r.time, r.vessel, r.risk, r.desc
            ));
        }
    }

    lines.join("\n")
}

fn plural(count: u64, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
