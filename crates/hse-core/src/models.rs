use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::HseError;
use crate::normalize::normalize_header;
use crate::time_utils::{parse_report_date, require_report_date};

/// Default for missing `mappedIssue` / `observationRelatedTo1` values.
pub const UNSPECIFIED: &str = "Unspecified";
/// Default for missing `consequences` values.
pub const NOT_SPECIFIED: &str = "Not specified";

// ── RiskLevel ─────────────────────────────────────────────────────────────────

/// Severity tier of an observation.
///
/// Recognised tiers are matched case-insensitively; anything else is kept
/// verbatim in [`RiskLevel::Other`] so it can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Other(String),
}

impl RiskLevel {
    /// The three recognised tiers, most severe first.
    pub const TIERS: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    /// Display label, e.g. `"High Risk"`.
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::High => "High Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::Low => "Low Risk",
            RiskLevel::Other(s) => s.as_str(),
        }
    }

    /// Parse a raw category cell. Returns `None` for an empty cell.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let tier = Self::TIERS
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| RiskLevel::Other(trimmed.to_string()));
        Some(tier)
    }

    /// Chart colour for the recognised tiers.
    pub fn color(&self) -> Option<&'static str> {
        match self {
            RiskLevel::High => Some("#E74C3C"),
            RiskLevel::Medium => Some("#F39C12"),
            RiskLevel::Low => Some("#2ECC71"),
            RiskLevel::Other(_) => None,
        }
    }

    pub fn is_recognised(&self) -> bool {
        !matches!(self, RiskLevel::Other(_))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RiskLevel {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or(RiskLevel::Other(s))
    }
}

impl From<RiskLevel> for String {
    fn from(r: RiskLevel) -> Self {
        match r {
            RiskLevel::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = HseError;

    /// Strict parse used for user-supplied filters: only the three tiers
    /// (with or without the `Risk` suffix) are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let key = key.strip_suffix(" risk").unwrap_or(&key);
        match key {
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            _ => Err(HseError::InvalidRiskLevel(s.to_string())),
        }
    }
}

// ── ObservationType ───────────────────────────────────────────────────────────

/// Whether an observation records an unsafe act or an unsafe condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObservationType {
    UnsafeAct,
    UnsafeCondition,
    Other(String),
}

impl ObservationType {
    pub fn as_str(&self) -> &str {
        match self {
            ObservationType::UnsafeAct => "UNSAFE_ACT",
            ObservationType::UnsafeCondition => "UNSAFE_CONDITION",
            ObservationType::Other(s) => s.as_str(),
        }
    }

    /// Parse a raw type cell. Returns `None` for an empty cell.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let parsed = if trimmed.eq_ignore_ascii_case("UNSAFE_ACT") {
            ObservationType::UnsafeAct
        } else if trimmed.eq_ignore_ascii_case("UNSAFE_CONDITION") {
            ObservationType::UnsafeCondition
        } else {
            ObservationType::Other(trimmed.to_string())
        };
        Some(parsed)
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ObservationType {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or(ObservationType::Other(s))
    }
}

impl From<ObservationType> for String {
    fn from(t: ObservationType) -> Self {
        match t {
            ObservationType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// What happened after the observation was raised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    Corrected,
    PartlyCorrected,
    NotCorrected,
    Other(String),
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Corrected => "Corrected",
            Outcome::PartlyCorrected => "Partly corrected",
            Outcome::NotCorrected => "Not corrected",
            Outcome::Other(s) => s.as_str(),
        }
    }

    /// Parse a raw outcome cell. Returns `None` for an empty cell.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let known = [
            Outcome::Corrected,
            Outcome::PartlyCorrected,
            Outcome::NotCorrected,
        ];
        let parsed = known
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| Outcome::Other(trimmed.to_string()));
        Some(parsed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Outcome {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or(Outcome::Other(s))
    }
}

impl From<Outcome> for String {
    fn from(o: Outcome) -> Self {
        match o {
            Outcome::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

// ── ObservationField ──────────────────────────────────────────────────────────

/// Every addressable attribute of an [`Observation`].
///
/// Shared by the CSV header schema and the query primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ObservationField {
    Id,
    DateReported,
    TimeReported,
    Vessel,
    ObserverName,
    ObserverRank,
    Type,
    Description,
    Outcome,
    Category,
    AreaOfWork,
    Intervention,
    MappedIssue,
    Consequences,
    ObservationRelatedTo1,
}

impl ObservationField {
    pub const ALL: [ObservationField; 15] = [
        ObservationField::Id,
        ObservationField::DateReported,
        ObservationField::TimeReported,
        ObservationField::Vessel,
        ObservationField::ObserverName,
        ObservationField::ObserverRank,
        ObservationField::Type,
        ObservationField::Description,
        ObservationField::Outcome,
        ObservationField::Category,
        ObservationField::AreaOfWork,
        ObservationField::Intervention,
        ObservationField::MappedIssue,
        ObservationField::Consequences,
        ObservationField::ObservationRelatedTo1,
    ];

    /// camelCase wire name, e.g. `"dateReported"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ObservationField::Id => "id",
            ObservationField::DateReported => "dateReported",
            ObservationField::TimeReported => "timeReported",
            ObservationField::Vessel => "vessel",
            ObservationField::ObserverName => "observerName",
            ObservationField::ObserverRank => "observerRank",
            ObservationField::Type => "type",
            ObservationField::Description => "description",
            ObservationField::Outcome => "outcome",
            ObservationField::Category => "category",
            ObservationField::AreaOfWork => "areaOfWork",
            ObservationField::Intervention => "intervention",
            ObservationField::MappedIssue => "mappedIssue",
            ObservationField::Consequences => "consequences",
            ObservationField::ObservationRelatedTo1 => "observationRelatedTo1",
        }
    }
}

impl fmt::Display for ObservationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObservationField {
    type Err = HseError;

    /// Accepts camelCase, snake_case or any casing/punctuation variant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_header(s);
        Self::ALL
            .into_iter()
            .find(|f| normalize_header(f.as_str()) == key)
            .ok_or_else(|| HseError::UnknownField(s.to_string()))
    }
}

impl TryFrom<String> for ObservationField {
    type Error = HseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ObservationField> for String {
    fn from(f: ObservationField) -> Self {
        f.as_str().to_string()
    }
}

// ── Observation ───────────────────────────────────────────────────────────────

/// One recorded safety event.
///
/// Produced once by the CSV reader and never mutated afterwards. Free-text
/// fields are empty strings rather than absent; `mapped_issue`,
/// `observation_related_to1` and `consequences` carry their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    #[serde(default)]
    pub date_reported: String,
    #[serde(default)]
    pub time_reported: String,
    #[serde(default)]
    pub vessel: String,
    #[serde(default)]
    pub observer_name: String,
    #[serde(default)]
    pub observer_rank: String,
    #[serde(rename = "type", default)]
    pub observation_type: Option<ObservationType>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub category: Option<RiskLevel>,
    #[serde(default)]
    pub area_of_work: String,
    #[serde(default)]
    pub intervention: bool,
    #[serde(default)]
    pub mapped_issue: String,
    #[serde(default)]
    pub consequences: String,
    #[serde(default)]
    pub observation_related_to1: String,
}

impl Observation {
    /// Calendar date parsed from `date_reported`, `None` when malformed.
    pub fn report_date(&self) -> Option<NaiveDate> {
        parse_report_date(&self.date_reported)
    }

    pub fn has_risk(&self, tier: &RiskLevel) -> bool {
        self.category.as_ref() == Some(tier)
    }

    pub fn is_corrected(&self) -> bool {
        self.outcome == Some(Outcome::Corrected)
    }

    pub fn has_type(&self, kind: &ObservationType) -> bool {
        self.observation_type.as_ref() == Some(kind)
    }

    /// String view of a single field, as used by the query primitives.
    ///
    /// Unset categorical fields read as `""`; `intervention` reads as
    /// `"true"` / `"false"`.
    pub fn field_value(&self, field: ObservationField) -> Cow<'_, str> {
        match field {
            ObservationField::Id => Cow::Borrowed(&self.id),
            ObservationField::DateReported => Cow::Borrowed(&self.date_reported),
            ObservationField::TimeReported => Cow::Borrowed(&self.time_reported),
            ObservationField::Vessel => Cow::Borrowed(&self.vessel),
            ObservationField::ObserverName => Cow::Borrowed(&self.observer_name),
            ObservationField::ObserverRank => Cow::Borrowed(&self.observer_rank),
            ObservationField::Type => {
                Cow::Borrowed(self.observation_type.as_ref().map_or("", |t| t.as_str()))
            }
            ObservationField::Description => Cow::Borrowed(&self.description),
            ObservationField::Outcome => {
                Cow::Borrowed(self.outcome.as_ref().map_or("", |o| o.as_str()))
            }
            ObservationField::Category => {
                Cow::Borrowed(self.category.as_ref().map_or("", |c| c.as_str()))
            }
            ObservationField::AreaOfWork => Cow::Borrowed(&self.area_of_work),
            ObservationField::Intervention => Cow::Owned(self.intervention.to_string()),
            ObservationField::MappedIssue => Cow::Borrowed(&self.mapped_issue),
            ObservationField::Consequences => Cow::Borrowed(&self.consequences),
            ObservationField::ObservationRelatedTo1 => {
                Cow::Borrowed(&self.observation_related_to1)
            }
        }
    }
}

// ── ChartDataPoint ────────────────────────────────────────────────────────────

/// The universal output contract of every aggregation and forecast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataPoint {
    /// Display label (category, vessel, date range).
    pub name: String,
    /// Primary measure.
    pub value: u64,
    /// Predicted count carried by forecast points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_prediction: Option<bool>,
}

impl ChartDataPoint {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// A historical forecast window holding an actual count.
    pub fn historical(name: impl Into<String>, value: u64) -> Self {
        Self {
            is_prediction: Some(false),
            ..Self::new(name, value)
        }
    }

    /// A projected forecast window; the estimate lives in `secondary_value`.
    pub fn prediction(name: impl Into<String>, predicted: u64) -> Self {
        Self {
            secondary_value: Some(predicted),
            is_prediction: Some(true),
            ..Self::new(name, 0)
        }
    }
}

// ── Aggregate rows ────────────────────────────────────────────────────────────

/// Headline counters for the executive overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub total_observations: u64,
    pub corrected_count: u64,
    /// Rounded to the nearest integer; `0` when there are no observations.
    pub percent_corrected: u32,
    pub intervention_count: u64,
    pub high_risk_count: u64,
    pub medium_risk_count: u64,
    pub low_risk_count: u64,
}

/// Risk-tier breakdown for one vessel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskByVesselRow {
    pub name: String,
    pub high_risk: u64,
    pub medium_risk: u64,
    pub low_risk: u64,
    /// All observations for the vessel, including unrecognised tiers.
    pub total: u64,
}

/// Unsafe-act / unsafe-condition breakdown for one vessel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeByVesselRow {
    pub name: String,
    pub unsafe_act: u64,
    pub unsafe_condition: u64,
    pub total: u64,
}

/// One consequence row of the consequence × risk heatmap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapRow {
    pub consequence: String,
    pub high_risk: u64,
    pub medium_risk: u64,
    pub low_risk: u64,
}

impl HeatmapRow {
    /// Sum of the three tier columns.
    pub fn total(&self) -> u64 {
        self.high_risk + self.medium_risk + self.low_risk
    }
}

// ── FilterState ───────────────────────────────────────────────────────────────

/// Equality predicates applied before aggregation. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub vessel: Option<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub date_reported: Option<String>,
}

impl FilterState {
    /// Build from UI-style selections where `"All"` or an empty value means
    /// no constraint.
    pub fn from_selections(
        vessel: Option<&str>,
        risk_level: Option<&str>,
        date_reported: Option<&str>,
    ) -> Self {
        fn selected(v: Option<&str>) -> Option<String> {
            v.map(str::trim)
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
                .map(str::to_string)
        }

        Self {
            vessel: selected(vessel),
            risk_level: selected(risk_level).map(RiskLevel::from),
            date_reported: selected(date_reported),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vessel.is_none() && self.risk_level.is_none() && self.date_reported.is_none()
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        if let Some(vessel) = &self.vessel {
            if &obs.vessel != vessel {
                return false;
            }
        }
        if let Some(risk) = &self.risk_level {
            if !obs.has_risk(risk) {
                return false;
            }
        }
        if let Some(date) = &self.date_reported {
            if &obs.date_reported != date {
                return false;
            }
        }
        true
    }
}

// ── Prediction ────────────────────────────────────────────────────────────────

/// Input to the per-incident predictor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub vessel: String,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
}

impl PredictionRequest {
    /// Validated request from user input.
    ///
    /// `risk` must be one of the three tiers and `target_date`, when given,
    /// a real `DD-MM-YYYY` date.
    pub fn from_input(vessel: &str, risk: &str, target_date: Option<&str>) -> Result<Self, HseError> {
        let risk_level = RiskLevel::from_str(risk)?;
        let target_date = match target_date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => {
                require_report_date(d)?;
                Some(d.to_string())
            }
            None => None,
        };
        Ok(Self {
            vessel: vessel.trim().to_string(),
            risk_level,
            target_date,
        })
    }
}

/// Where a [`PredictionResponse`] came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Remote,
    #[default]
    Heuristic,
}

/// Detailed incident prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub predicted_issue_type: String,
    pub predicted_category: String,
    pub related_to1: String,
    pub related_to2: String,
    pub predicted_count: u64,
    pub suggestions: Vec<String>,
    pub confidence_score: u32,
    /// Remote services do not send this; it is stamped by the caller.
    #[serde(default)]
    pub source: PredictionSource,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
