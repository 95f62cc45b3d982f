use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub interview: InterviewConfig,
    pub documents: DocumentConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let max_reply_attempts = env::var("SURVEY_MAX_REPLY_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_MAX_REPLY_ATTEMPTS.to_string())
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|attempts| *attempts > 0)
            .ok_or(ConfigError::InvalidReplyAttempts)?;

        let table_row_limit = match env::var("SURVEY_TABLE_ROW_LIMIT") {
            Ok(raw) => parse_row_limit(&raw)?,
            Err(_) => Some(DEFAULT_TABLE_ROW_LIMIT),
        };

        let results_dir = env::var("SURVEY_RESULTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("results"));
        let prompts_dir = env::var("SURVEY_PROMPTS_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            interview: InterviewConfig {
                max_reply_attempts,
                prompts_dir,
            },
            documents: DocumentConfig { table_row_limit },
            storage: StorageConfig { results_dir },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

const DEFAULT_MAX_REPLY_ATTEMPTS: usize = 8;
const DEFAULT_TABLE_ROW_LIMIT: i64 = 20;

fn parse_row_limit(raw: &str) -> Result<Option<i64>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(None);
    }

    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|source| ConfigError::InvalidRowLimit { source })
}

/// Settings for the interview loop.
#[derive(Debug, Clone)]
pub struct InterviewConfig {
    /// Model calls allowed per batch before the run is aborted.
    pub max_reply_attempts: usize,
    pub prompts_dir: Option<PathBuf>,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_reply_attempts: DEFAULT_MAX_REPLY_ATTEMPTS,
            prompts_dir: None,
        }
    }
}

/// Settings for reference document preparation.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Positive keeps the first N rows, negative the last N, `None` keeps all.
    pub table_row_limit: Option<i64>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            table_row_limit: Some(DEFAULT_TABLE_ROW_LIMIT),
        }
    }
}

/// Where interview results are written.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub results_dir: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidReplyAttempts,
    InvalidRowLimit { source: std::num::ParseIntError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidReplyAttempts => {
                write!(f, "SURVEY_MAX_REPLY_ATTEMPTS must be a positive integer")
            }
            ConfigError::InvalidRowLimit { .. } => {
                write!(f, "SURVEY_TABLE_ROW_LIMIT must be an integer or 'all'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidReplyAttempts => None,
            ConfigError::InvalidRowLimit { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("SURVEY_MAX_REPLY_ATTEMPTS");
        env::remove_var("SURVEY_TABLE_ROW_LIMIT");
        env::remove_var("SURVEY_RESULTS_DIR");
        env::remove_var("SURVEY_PROMPTS_DIR");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.interview.max_reply_attempts, 8);
        assert!(config.interview.prompts_dir.is_none());
        assert_eq!(config.documents.table_row_limit, Some(20));
        assert_eq!(config.storage.results_dir, PathBuf::from("results"));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn row_limit_accepts_negative_and_all() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SURVEY_TABLE_ROW_LIMIT", "-5");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.documents.table_row_limit, Some(-5));

        env::set_var("SURVEY_TABLE_ROW_LIMIT", "ALL");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.documents.table_row_limit, None);
        reset_env();
    }

    #[test]
    fn rejects_zero_reply_attempts() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SURVEY_MAX_REPLY_ATTEMPTS", "0");
        let error = AppConfig::load().expect_err("zero attempts rejected");
        assert!(matches!(error, ConfigError::InvalidReplyAttempts));
        reset_env();
    }
}
