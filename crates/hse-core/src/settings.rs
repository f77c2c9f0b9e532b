use clap::{CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of future weeks projected by the weekly forecast.
pub const DEFAULT_WEEKS_TO_PREDICT: usize = 4;
/// Default truncation for top-N groupings.
pub const DEFAULT_TOP_N: usize = 10;
/// Default remote predictor timeout.
pub const DEFAULT_PREDICTOR_TIMEOUT_MS: u64 = 2000;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Maritime HSE observation analytics and incident forecasting
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hse-dashboard",
    about = "Maritime HSE observation analytics and incident forecasting",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Number of future weeks to forecast (1-52)
    #[arg(long, global = true, default_value = "4", value_parser = clap::value_parser!(u16).range(1..=52))]
    pub weeks: u16,

    /// Maximum entries in top-N groupings (1-100)
    #[arg(long, global = true, default_value = "10", value_parser = clap::value_parser!(u16).range(1..=100))]
    pub top: u16,

    /// URL of a remote incident predictor (POST, JSON)
    #[arg(long, global = true, env = "HSE_PREDICTOR_URL")]
    pub predictor_url: Option<String>,

    /// Remote predictor timeout in milliseconds (100-60000)
    #[arg(long, global = true, default_value = "2000", value_parser = clap::value_parser!(u64).range(100..=60_000))]
    pub predictor_timeout_ms: u64,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,
}

/// What to compute from the observation file.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Full dashboard snapshot: KPIs, distributions, cross-tabs and forecasts
    Report {
        /// Observation CSV file
        csv: PathBuf,
        /// Only this vessel ("All" for every vessel)
        #[arg(long)]
        vessel: Option<String>,
        /// Only this risk tier ("All" for every tier)
        #[arg(long)]
        risk: Option<String>,
        /// Only this report date, DD-MM-YYYY ("All" for every date)
        #[arg(long)]
        date: Option<String>,
    },
    /// Weekly incident forecast and top vessels by projected incidents
    Forecast {
        /// Observation CSV file
        csv: PathBuf,
    },
    /// Run a structured filter/group query given as JSON
    Query {
        /// Observation CSV file
        csv: PathBuf,
        /// Query arguments, e.g. '{"filters":[...],"groupBy":"vessel"}'
        #[arg(long)]
        json: String,
    },
    /// Answer a free-text question with the rule-based assistant
    Ask {
        /// Observation CSV file
        csv: PathBuf,
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Predict the next incident profile for a vessel
    Predict {
        /// Observation CSV file
        csv: PathBuf,
        /// Vessel name
        #[arg(long)]
        vessel: String,
        /// Risk tier
        #[arg(long, default_value = "High Risk")]
        risk: String,
        /// Target date (informational, forwarded to the remote predictor)
        #[arg(long)]
        target_date: Option<String>,
    },
}

impl Command {
    /// The observation file every subcommand reads.
    pub fn csv_path(&self) -> &PathBuf {
        match self {
            Command::Report { csv, .. }
            | Command::Forecast { csv }
            | Command::Query { csv, .. }
            | Command::Ask { csv, .. }
            | Command::Predict { csv, .. } => csv,
        }
    }
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.hse-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictor_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictor_timeout_ms: Option<u64>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".hse-dashboard").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear saved configuration");
            }
            return settings;
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "weeks") {
            if let Some(v) = last.weeks {
                settings.weeks = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top") {
            if let Some(v) = last.top {
                settings.top = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "predictor_timeout_ms") {
            if let Some(v) = last.predictor_timeout_ms {
                settings.predictor_timeout_ms = v;
            }
        }
        if settings.predictor_url.is_none() {
            settings.predictor_url = last.predictor_url;
        }

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "could not persist configuration");
        }

        settings
    }

    pub fn weeks_to_predict(&self) -> usize {
        usize::from(self.weeks)
    }

    pub fn top_n(&self) -> usize {
        usize::from(self.top)
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            weeks: Some(s.weeks),
            top: Some(s.top),
            predictor_url: s.predictor_url.clone(),
            predictor_timeout_ms: Some(s.predictor_timeout_ms),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
