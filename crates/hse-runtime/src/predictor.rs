//! Per-incident prediction.
//!
//! A remote model service can be configured; when it is missing, slow or
//! broken, [`predict_incident`] falls back to [`HeuristicPredictor`], which
//! derives the most likely incident profile from the loaded history.

use std::time::Duration;

use async_trait::async_trait;

use hse_core::error::{HseError, Result};
use hse_core::models::{
    Observation, PredictionRequest, PredictionResponse, PredictionSource,
};
use hse_core::normalize::OrderedCounts;
use hse_core::settings::DEFAULT_PREDICTOR_TIMEOUT_MS;
use hse_data::forecast::weekly_series;

/// Value reported when the history has nothing to derive a field from.
pub const NOT_AVAILABLE: &str = "N/A";
/// Confidence reported by the heuristic predictor.
pub const HEURISTIC_CONFIDENCE: u32 = 85;
/// Secondary "related to" value reported by the heuristic predictor.
pub const HEURISTIC_RELATED_TO2: &str = "Situational Awareness";

// ── IncidentPredictor ─────────────────────────────────────────────────────────

/// Something that can predict the next incident for a vessel.
#[async_trait]
pub trait IncidentPredictor: Send + Sync {
    /// Predict from `request`; `history` is the loaded dataset.
    ///
    /// # Errors
    ///
    /// Returns [`HseError::Predictor`] when no prediction could be produced.
    async fn predict(
        &self,
        request: &PredictionRequest,
        history: &[Observation],
    ) -> Result<PredictionResponse>;
}

// ── RemotePredictor ───────────────────────────────────────────────────────────

/// HTTP model service: `POST <url>` with the request as JSON, expecting a
/// [`PredictionResponse`] body.
pub struct RemotePredictor {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemotePredictor {
    /// Build a predictor for `url` whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HseError::Predictor(format!("could not build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            timeout,
            client,
        })
    }

    /// [`RemotePredictor::new`] with the default timeout.
    pub fn with_default_timeout(url: impl Into<String>) -> Result<Self> {
        Self::new(url, Duration::from_millis(DEFAULT_PREDICTOR_TIMEOUT_MS))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl IncidentPredictor for RemotePredictor {
    async fn predict(
        &self,
        request: &PredictionRequest,
        _history: &[Observation],
    ) -> Result<PredictionResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| HseError::Predictor(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HseError::Predictor(format!(
                "{} returned HTTP {status}",
                self.url
            )));
        }

        let mut prediction: PredictionResponse = response
            .json()
            .await
            .map_err(|e| HseError::Predictor(format!("invalid response body: {e}")))?;
        prediction.source = PredictionSource::Remote;
        Ok(prediction)
    }
}

// ── HeuristicPredictor ────────────────────────────────────────────────────────

/// Local predictor built from the most frequent values in the history.
///
/// The history is narrowed to the requested vessel and risk tier; when that
/// subset is empty it widens to the vessel alone, then to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPredictor;

impl HeuristicPredictor {
    pub fn predict_from_history(
        &self,
        request: &PredictionRequest,
        history: &[Observation],
    ) -> PredictionResponse {
        let subset = Self::select_history(request, history);

        let predicted_issue_type = mode(subset.iter().copied().map(|o| {
            o.observation_type
                .as_ref()
                .map_or("", |t| t.as_str())
        }));
        let predicted_category = mode(subset.iter().copied().map(|o| {
            if o.mapped_issue.is_empty() {
                o.category.as_ref().map_or("", |c| c.as_str())
            } else {
                o.mapped_issue.as_str()
            }
        }));
        let related_to1 = mode(subset.iter().copied().map(|o| o.observation_related_to1.as_str()));
        let area = mode(subset.iter().copied().map(|o| o.area_of_work.as_str()));

        let predicted_count = weekly_series(subset.iter().copied()).map_or(0, |s| s.project(1));

        let suggestions = vec![
            format!(
                "Conduct targeted toolbox talk regarding {}.",
                predicted_category.to_lowercase()
            ),
            format!("Increase frequency of safety rounds in {area} area."),
            format!(
                "Review risk assessment (TRA) specifically for {} hazards.",
                related_to1.to_lowercase()
            ),
            format!(
                "Verify all crew certifications related to {}.",
                predicted_issue_type.to_lowercase().replace('_', " ")
            ),
        ];

        PredictionResponse {
            predicted_issue_type,
            predicted_category,
            related_to1,
            related_to2: HEURISTIC_RELATED_TO2.to_string(),
            predicted_count,
            suggestions,
            confidence_score: HEURISTIC_CONFIDENCE,
            source: PredictionSource::Heuristic,
        }
    }

    /// Vessel + risk tier, else vessel, else the whole history.
    fn select_history<'a>(
        request: &PredictionRequest,
        history: &'a [Observation],
    ) -> Vec<&'a Observation> {
        let vessel: Vec<&Observation> = history
            .iter()
            .filter(|o| o.vessel == request.vessel)
            .collect();
        let vessel_and_risk: Vec<&Observation> = vessel
            .iter()
            .copied()
            .filter(|o| o.has_risk(&request.risk_level))
            .collect();

        if !vessel_and_risk.is_empty() {
            vessel_and_risk
        } else if !vessel.is_empty() {
            vessel
        } else {
            history.iter().collect()
        }
    }
}

#[async_trait]
impl IncidentPredictor for HeuristicPredictor {
    async fn predict(
        &self,
        request: &PredictionRequest,
        history: &[Observation],
    ) -> Result<PredictionResponse> {
        Ok(self.predict_from_history(request, history))
    }
}

// ── Fallback ──────────────────────────────────────────────────────────────────

/// Ask `remote` when configured, falling back to the heuristic on any error.
///
/// Never fails: the worst case is a heuristic prediction.
pub async fn predict_incident(
    remote: Option<&dyn IncidentPredictor>,
    request: &PredictionRequest,
    history: &[Observation],
) -> PredictionResponse {
    if let Some(predictor) = remote {
        match predictor.predict(request, history).await {
            Ok(prediction) => {
                tracing::debug!(vessel = %request.vessel, "remote prediction received");
                return prediction;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "remote predictor unavailable; using heuristic prediction"
                );
            }
        }
    }
    HeuristicPredictor.predict_from_history(request, history)
}

/// Most frequent non-empty value; ties go to the value seen first.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let counts: OrderedCounts = values.filter(|v| !v.is_empty()).collect();
    counts
        .into_sorted_desc()
        .into_iter()
        .next()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |(value, _)| value)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hse_core::models::{ObservationType, RiskLevel};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn observation(
        vessel: &str,
        risk: RiskLevel,
        kind: ObservationType,
        issue: &str,
        date: &str,
    ) -> Observation {
        Observation {
            id: format!("{vessel}-{date}"),
            vessel: vessel.to_string(),
            category: Some(risk),
            observation_type: Some(kind),
            mapped_issue: issue.to_string(),
            observation_related_to1: "Housekeeping".to_string(),
            area_of_work: "Deck".to_string(),
            date_reported: date.to_string(),
            ..Observation::default()
        }
    }

    fn history() -> Vec<Observation> {
        vec![
            observation("Alpha", RiskLevel::High, ObservationType::UnsafeAct, "PPE", "01-01-2025"),
            observation("Alpha", RiskLevel::High, ObservationType::UnsafeAct, "PPE", "08-01-2025"),
            observation("Alpha", RiskLevel::Low, ObservationType::UnsafeCondition, "Lighting", "08-01-2025"),
            observation("Beta", RiskLevel::Medium, ObservationType::UnsafeCondition, "Slippery deck", "02-01-2025"),
        ]
    }

    fn request(vessel: &str, risk: RiskLevel) -> PredictionRequest {
        PredictionRequest {
            vessel: vessel.to_string(),
            risk_level: risk,
            target_date: None,
        }
    }

    struct FailingPredictor;

    #[async_trait]
    impl IncidentPredictor for FailingPredictor {
        async fn predict(
            &self,
            _request: &PredictionRequest,
            _history: &[Observation],
        ) -> Result<PredictionResponse> {
            Err(HseError::Predictor("offline".to_string()))
        }
    }

    struct FixedPredictor;

    #[async_trait]
    impl IncidentPredictor for FixedPredictor {
        async fn predict(
            &self,
            _request: &PredictionRequest,
            _history: &[Observation],
        ) -> Result<PredictionResponse> {
            Ok(PredictionResponse {
                predicted_issue_type: "UNSAFE_CONDITION".to_string(),
                predicted_category: "Lighting".to_string(),
                related_to1: "Housekeeping".to_string(),
                related_to2: "Procedures".to_string(),
                predicted_count: 7,
                suggestions: vec![],
                confidence_score: 91,
                source: PredictionSource::Remote,
            })
        }
    }

    /// Serve exactly one HTTP response on an ephemeral local port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                if request_complete(&received) {
                    break;
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/predict")
    }

    fn request_complete(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        received.len() >= header_end + 4 + content_length
    }

    // ── HeuristicPredictor ───────────────────────────────────────────────────

    #[test]
    fn test_heuristic_uses_vessel_and_risk_subset() {
        let resp = HeuristicPredictor.predict_from_history(&request("Alpha", RiskLevel::High), &history());
        assert_eq!(resp.predicted_issue_type, "UNSAFE_ACT");
        assert_eq!(resp.predicted_category, "PPE");
        assert_eq!(resp.related_to1, "Housekeeping");
        assert_eq!(resp.related_to2, HEURISTIC_RELATED_TO2);
        assert_eq!(resp.confidence_score, HEURISTIC_CONFIDENCE);
        assert_eq!(resp.source, PredictionSource::Heuristic);
        // One observation in each of two weeks: flat trend projects 1.
        assert_eq!(resp.predicted_count, 1);
    }

    #[test]
    fn test_heuristic_widens_to_vessel() {
        let resp =
            HeuristicPredictor.predict_from_history(&request("Beta", RiskLevel::High), &history());
        assert_eq!(resp.predicted_category, "Slippery deck");
        assert_eq!(resp.predicted_issue_type, "UNSAFE_CONDITION");
    }

    #[test]
    fn test_heuristic_widens_to_all_history() {
        let resp =
            HeuristicPredictor.predict_from_history(&request("Gamma", RiskLevel::Low), &history());
        assert_eq!(resp.predicted_category, "PPE");
    }

    #[test]
    fn test_heuristic_empty_history_reports_not_available() {
        let resp = HeuristicPredictor.predict_from_history(&request("Alpha", RiskLevel::High), &[]);
        assert_eq!(resp.predicted_issue_type, NOT_AVAILABLE);
        assert_eq!(resp.predicted_category, NOT_AVAILABLE);
        assert_eq!(resp.related_to1, NOT_AVAILABLE);
        assert_eq!(resp.predicted_count, 0);
    }

    #[test]
    fn test_heuristic_suggestions() {
        let resp = HeuristicPredictor.predict_from_history(&request("Alpha", RiskLevel::High), &history());
        assert_eq!(
            resp.suggestions,
            vec![
                "Conduct targeted toolbox talk regarding ppe.",
                "Increase frequency of safety rounds in Deck area.",
                "Review risk assessment (TRA) specifically for housekeeping hazards.",
                "Verify all crew certifications related to unsafe act.",
            ]
        );
    }

    #[test]
    fn test_mode_tie_keeps_first_seen() {
        assert_eq!(mode(["b", "a", "a", "b", ""].into_iter()), "b");
        assert_eq!(mode(std::iter::empty()), NOT_AVAILABLE);
    }

    // ── predict_incident ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_predict_incident_without_remote_uses_heuristic() {
        let resp = predict_incident(None, &request("Alpha", RiskLevel::High), &history()).await;
        assert_eq!(resp.source, PredictionSource::Heuristic);
    }

    #[tokio::test]
    async fn test_predict_incident_falls_back_on_error() {
        let remote = FailingPredictor;
        let resp = predict_incident(Some(&remote), &request("Alpha", RiskLevel::High), &history()).await;
        assert_eq!(resp.source, PredictionSource::Heuristic);
        assert_eq!(resp.predicted_category, "PPE");
    }

    #[tokio::test]
    async fn test_predict_incident_prefers_remote() {
        let remote = FixedPredictor;
        let resp = predict_incident(Some(&remote), &request("Alpha", RiskLevel::High), &history()).await;
        assert_eq!(resp.source, PredictionSource::Remote);
        assert_eq!(resp.predicted_count, 7);
    }

    // ── RemotePredictor ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_remote_predictor_parses_response() {
        let url = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"predictedIssueType":"UNSAFE_ACT","predictedCategory":"PPE","relatedTo1":"PPE","relatedTo2":"Procedures","predictedCount":3,"suggestions":["Wear gloves"],"confidenceScore":92}"#,
        )
        .await;
        let remote = RemotePredictor::new(url, Duration::from_secs(5)).expect("client");

        let resp = remote
            .predict(&request("Alpha", RiskLevel::High), &[])
            .await
            .expect("prediction");
        assert_eq!(resp.source, PredictionSource::Remote);
        assert_eq!(resp.predicted_count, 3);
        assert_eq!(resp.confidence_score, 92);
    }

    #[tokio::test]
    async fn test_remote_predictor_http_error() {
        let url = serve_once("HTTP/1.1 500 Internal Server Error", "{}").await;
        let remote = RemotePredictor::new(url, Duration::from_secs(5)).expect("client");

        let err = remote
            .predict(&request("Alpha", RiskLevel::High), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_remote_predictor_unreachable_falls_back() {
        // Bind then drop to get a local port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let remote = RemotePredictor::new(
            format!("http://127.0.0.1:{port}/predict"),
            Duration::from_millis(500),
        )
        .expect("client");

        assert!(remote
            .predict(&request("Alpha", RiskLevel::High), &history())
            .await
            .is_err());

        let resp = predict_incident(Some(&remote), &request("Alpha", RiskLevel::High), &history()).await;
        assert_eq!(resp.source, PredictionSource::Heuristic);
    }

    #[test]
    fn test_remote_predictor_default_timeout() {
        let remote = RemotePredictor::with_default_timeout("http://localhost:5000/predict").expect("client");
        assert_eq!(remote.timeout(), Duration::from_millis(2000));
        assert_eq!(remote.url(), "http://localhost:5000/predict");
    }
}
