//! Structured filter / group-by queries over observations.
//!
//! Shared by the rule-based question assistant and by any function-calling
//! integration that hands over [`QueryArgs`] as JSON.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use hse_core::error::HseError;
use hse_core::formatting::truncate_with_ellipsis;
use hse_core::models::{ChartDataPoint, Observation, ObservationField, UNSPECIFIED};
use hse_core::normalize::OrderedCounts;

/// Groups kept in [`QueryResult::aggregation_result`].
pub const GROUP_LIMIT: usize = 10;
/// Sample records returned when [`QueryArgs::limit`] is unset.
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;
/// Characters of description kept per sample record.
pub const SAMPLE_DESCRIPTION_CHARS: usize = 80;
/// Name of the function tool described by [`query_tool_schema`].
pub const QUERY_TOOL_NAME: &str = "query_safety_data";

// ── FilterOperator ────────────────────────────────────────────────────────────

/// Comparison applied by a [`QueryFilter`].
///
/// `equals` and `contains` ignore case. The ordering operators compare the
/// raw strings lexicographically, which orders `HH:MM:SS` times correctly.
///
/// Parsing accepts the symbolic aliases (`=`, `>=`, `eq`, ...) in JSON as
/// well as through [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilterOperator {
    Equals,
    Contains,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::Contains => "contains",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
        }
    }

    /// Whether `actual` satisfies this operator against `expected`.
    pub fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            FilterOperator::Equals => actual.to_lowercase() == expected.trim().to_lowercase(),
            FilterOperator::Contains => actual
                .to_lowercase()
                .contains(&expected.trim().to_lowercase()),
            FilterOperator::Gt => actual > expected,
            FilterOperator::Lt => actual < expected,
            FilterOperator::Gte => actual >= expected,
            FilterOperator::Lte => actual <= expected,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = HseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equals" | "eq" | "=" | "==" => Ok(FilterOperator::Equals),
            "contains" => Ok(FilterOperator::Contains),
            "gt" | ">" => Ok(FilterOperator::Gt),
            "lt" | "<" => Ok(FilterOperator::Lt),
            "gte" | ">=" => Ok(FilterOperator::Gte),
            "lte" | "<=" => Ok(FilterOperator::Lte),
            _ => Err(HseError::UnknownOperator(s.to_string())),
        }
    }
}

impl TryFrom<String> for FilterOperator {
    type Error = HseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_string()
    }
}

// ── QueryArgs ─────────────────────────────────────────────────────────────────

/// A single `field operator value` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub field: ObservationField,
    pub operator: FilterOperator,
    /// Numbers and booleans in JSON input are accepted as their text form.
    #[serde(deserialize_with = "scalar_as_string")]
    pub value: String,
}

impl QueryFilter {
    pub fn new(field: ObservationField, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.operator
            .matches(&obs.field_value(self.field), &self.value)
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.field, self.operator, self.value)
    }
}

/// Query input: AND-combined filters, an optional grouping field and an
/// optional sample size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<ObservationField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryArgs {
    /// Parse tool-call style JSON.
    pub fn from_json(json: &str) -> Result<Self, HseError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ── QueryResult ───────────────────────────────────────────────────────────────

/// Condensed view of one matching observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRecord {
    pub id: String,
    pub date: String,
    pub time: String,
    pub vessel: String,
    /// `"<name> (<rank>)"`.
    pub observer: String,
    #[serde(rename = "type")]
    pub observation_type: String,
    pub risk: String,
    pub related_to: String,
    /// Description cut to [`SAMPLE_DESCRIPTION_CHARS`] plus `"..."`.
    pub desc: String,
}

impl From<&Observation> for SampleRecord {
    fn from(o: &Observation) -> Self {
        Self {
            id: o.id.clone(),
            date: o.date_reported.clone(),
            time: o.time_reported.clone(),
            vessel: o.vessel.clone(),
            observer: format!("{} ({})", o.observer_name, o.observer_rank),
            observation_type: o.field_value(ObservationField::Type).into_owned(),
            risk: o.field_value(ObservationField::Category).into_owned(),
            related_to: o.observation_related_to1.clone(),
            desc: truncate_with_ellipsis(&o.description, SAMPLE_DESCRIPTION_CHARS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Observations passing every filter.
    pub total_count: u64,
    pub filters_applied: Vec<QueryFilter>,
    /// Top [`GROUP_LIMIT`] groups, present only when grouping was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_result: Option<Vec<ChartDataPoint>>,
    pub sample_records: Vec<SampleRecord>,
}

// ── Execution ─────────────────────────────────────────────────────────────────

/// Run `args` against `data`.
pub fn execute_query(data: &[Observation], args: &QueryArgs) -> QueryResult {
    let matching: Vec<&Observation> = data
        .iter()
        .filter(|o| args.filters.iter().all(|f| f.matches(o)))
        .collect();

    let aggregation_result = args.group_by.map(|field| {
        let mut counts = OrderedCounts::new();
        for obs in &matching {
            let value = obs.field_value(field);
            counts.add(if value.is_empty() {
                UNSPECIFIED
            } else {
                value.as_ref()
            });
        }
        counts.into_chart_points(Some(GROUP_LIMIT))
    });

    let limit = args.limit.unwrap_or(DEFAULT_SAMPLE_LIMIT);
    let sample_records = matching
        .iter()
        .take(limit)
        .map(|o| SampleRecord::from(*o))
        .collect();

    QueryResult {
        total_count: matching.len() as u64,
        filters_applied: args.filters.clone(),
        aggregation_result,
        sample_records,
    }
}

/// JSON schema of the query tool, for function-calling model integrations.
pub fn query_tool_schema() -> Value {
    let fields: Vec<&str> = ObservationField::ALL.iter().map(|f| f.as_str()).collect();
    let operators: Vec<&str> = [
        FilterOperator::Equals,
        FilterOperator::Contains,
        FilterOperator::Gt,
        FilterOperator::Lt,
        FilterOperator::Gte,
        FilterOperator::Lte,
    ]
    .iter()
    .map(|o| o.as_str())
    .collect();

    json!({
        "name": QUERY_TOOL_NAME,
        "description": "Query safety observations. Filters are combined with AND; \
                        groupBy returns the top 10 values by count; limit bounds the sample records.",
        "parameters": {
            "type": "object",
            "properties": {
                "filters": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "field": { "type": "string", "enum": fields },
                            "operator": { "type": "string", "enum": operators },
                            "value": { "type": "string" }
                        },
                        "required": ["field", "operator", "value"]
                    }
                },
                "groupBy": { "type": "string", "enum": fields },
                "limit": { "type": "integer", "minimum": 0, "default": DEFAULT_SAMPLE_LIMIT }
            }
        }
    })
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "filter value must be a scalar, got {other}"
        ))),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
