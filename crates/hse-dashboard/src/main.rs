mod bootstrap;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;

use hse_core::models::{FilterState, PredictionRequest};
use hse_core::settings::{Command, Settings};
use hse_data::analysis::SnapshotOptions;
use hse_data::forecast::{vessel_forecast, weekly_forecast};
use hse_data::query::{execute_query, QueryArgs};
use hse_runtime::assistant::QueryAssistant;
use hse_runtime::predictor::{predict_incident, IncidentPredictor, RemotePredictor};
use hse_runtime::session::DatasetSession;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("HSE dashboard v{} starting", env!("CARGO_PKG_VERSION"));

    let mut session = DatasetSession::new();
    let csv = settings.command.csv_path();
    let count = session
        .load_file(csv)
        .with_context(|| format!("could not load observations from {}", csv.display()))?;
    tracing::info!(records = count, "observations loaded");

    match &settings.command {
        Command::Report {
            vessel, risk, date, ..
        } => {
            let filters =
                FilterState::from_selections(vessel.as_deref(), risk.as_deref(), date.as_deref());
            let options = SnapshotOptions {
                weeks_to_predict: settings.weeks_to_predict(),
                top_n: settings.top_n(),
            };
            print_json(&session.dashboard(&filters, &options), settings.pretty)?;
        }

        Command::Forecast { .. } => {
            let data = session.observations();
            let forecast = json!({
                "weeklyForecast": weekly_forecast(data, settings.weeks_to_predict()),
                "vesselForecast": vessel_forecast(data),
            });
            print_json(&forecast, settings.pretty)?;
        }

        Command::Query { json, .. } => {
            let args = QueryArgs::from_json(json).context("invalid query JSON")?;
            print_json(&execute_query(session.observations(), &args), settings.pretty)?;
        }

        Command::Ask { question, .. } => {
            let assistant = QueryAssistant::new(session.snapshot());
            println!("{}", assistant.answer(&question.join(" ")));
        }

        Command::Predict {
            vessel,
            risk,
            target_date,
            ..
        } => {
            if vessel.trim().is_empty() {
                bail!("--vessel must not be empty");
            }
            let request =
                PredictionRequest::from_input(vessel, risk, target_date.as_deref())?;

            let remote = match &settings.predictor_url {
                Some(url) => Some(RemotePredictor::new(
                    url.clone(),
                    Duration::from_millis(settings.predictor_timeout_ms),
                )?),
                None => None,
            };
            let prediction = predict_incident(
                remote.as_ref().map(|r| r as &dyn IncidentPredictor),
                &request,
                session.observations(),
            )
            .await;
            print_json(&prediction, settings.pretty)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
