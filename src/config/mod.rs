use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the client.
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

const DEV_API_URL: &str = "http://localhost:5000";
const DEFAULT_DEBOUNCE_MS: u64 = 800;
const DEFAULT_DRAFT_PATH: &str = "loan-draft.json";

/// Top-level configuration, resolved once at process start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub draft_path: PathBuf,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let base_url = match env::var("LOAN_API_URL") {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingApiUrl);
            }
            _ => DEV_API_URL.to_string(),
        };

        let debounce_ms = match env::var("LOAN_SYNC_DEBOUNCE_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidDebounce { value: raw })?,
            Err(_) => DEFAULT_DEBOUNCE_MS,
        };

        let draft_path = env::var("LOAN_DRAFT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DRAFT_PATH));

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            api: ApiConfig { base_url },
            sync: SyncConfig {
                debounce: Duration::from_millis(debounce_ms),
            },
            draft_path,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Remote service base address, shared by all endpoints.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

/// Quiet period before a scheduled sync actually fires.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub debounce: Duration,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingApiUrl,
    InvalidDebounce { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiUrl => {
                write!(f, "LOAN_API_URL must be set outside development")
            }
            ConfigError::InvalidDebounce { value } => {
                write!(f, "LOAN_SYNC_DEBOUNCE_MS must be an integer, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

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
        env::remove_var("LOAN_API_URL");
        env::remove_var("LOAN_SYNC_DEBOUNCE_MS");
        env::remove_var("LOAN_DRAFT_PATH");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.api.base_url, DEV_API_URL);
        assert_eq!(config.sync.debounce, Duration::from_millis(800));
        assert_eq!(config.draft_path, PathBuf::from("loan-draft.json"));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn production_requires_an_explicit_api_url() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        match AppConfig::load() {
            Err(ConfigError::MissingApiUrl) => {}
            other => panic!("expected missing api url error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_debounce() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LOAN_SYNC_DEBOUNCE_MS", "soon");
        match AppConfig::load() {
            Err(ConfigError::InvalidDebounce { value }) => assert_eq!(value, "soon"),
            other => panic!("expected invalid debounce error, got {other:?}"),
        }
        reset_env();
    }
}
