//! Runtime configuration.
//!
//! Everything has a development default; `Config::from_env` overrides those
//! from environment variables and validates the result. Heuristic tuning
//! lives in a separate rules file (see [`ExtractionRules`]).

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::extractor::rules::ExtractionRules;
use crate::fetcher::FetchConfig;

/// Environment variable names.
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_FETCH_REQUEST_TIMEOUT_SECS: &str = "FETCH_REQUEST_TIMEOUT_SECS";
pub const ENV_FETCH_MAX_RETRIES: &str = "FETCH_MAX_RETRIES";
pub const ENV_FETCH_RETRY_BASE_MS: &str = "FETCH_RETRY_BASE_MS";
pub const ENV_PREWARM_CONCURRENCY: &str = "PREWARM_CONCURRENCY";
pub const ENV_CACHE_MAX_ENTRIES: &str = "CACHE_MAX_ENTRIES";
pub const ENV_EXTRACTION_RULES_PATH: &str = "EXTRACTION_RULES_PATH";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_MAX_RETRIES: u32 = 2;
const DEFAULT_FETCH_RETRY_BASE_MS: u64 = 250;
const DEFAULT_PREWARM_CONCURRENCY: usize = 3;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 512;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rules file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    fetch_timeout: Duration,
    request_timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    prewarm_concurrency: usize,
    /// `None` means unbounded (`CACHE_MAX_ENTRIES=0`).
    cache_max_entries: Option<usize>,
    rules_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_FETCH_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_FETCH_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_FETCH_RETRY_BASE_MS),
            prewarm_concurrency: DEFAULT_PREWARM_CONCURRENCY,
            cache_max_entries: Some(DEFAULT_CACHE_MAX_ENTRIES),
            rules_path: None,
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let fetch_timeout = env_or(ENV_FETCH_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS)?;
        let request_timeout =
            env_or(ENV_FETCH_REQUEST_TIMEOUT_SECS, DEFAULT_FETCH_REQUEST_TIMEOUT_SECS)?;
        let max_retries = env_or(ENV_FETCH_MAX_RETRIES, DEFAULT_FETCH_MAX_RETRIES)?;
        let retry_base_ms = env_or(ENV_FETCH_RETRY_BASE_MS, DEFAULT_FETCH_RETRY_BASE_MS)?;
        let prewarm_concurrency = env_or(ENV_PREWARM_CONCURRENCY, DEFAULT_PREWARM_CONCURRENCY)?;
        let cache_max_entries = env_or(ENV_CACHE_MAX_ENTRIES, DEFAULT_CACHE_MAX_ENTRIES)?;
        let rules_path = env::var(ENV_EXTRACTION_RULES_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty());

        if fetch_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_FETCH_TIMEOUT_SECS,
                reason: "must be at least 1".to_string(),
            });
        }
        if request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_FETCH_REQUEST_TIMEOUT_SECS,
                reason: "must be at least 1".to_string(),
            });
        }
        if prewarm_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_PREWARM_CONCURRENCY,
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            fetch_timeout: Duration::from_secs(fetch_timeout),
            request_timeout: Duration::from_secs(request_timeout),
            max_retries,
            retry_base_delay: Duration::from_millis(retry_base_ms),
            prewarm_concurrency,
            cache_max_entries: (cache_max_entries > 0).then_some(cache_max_entries),
            rules_path,
        })
    }

    /// Overall budget for one fetch, retries included.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
    /// Retries after the first attempt for article pages.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }
    pub fn prewarm_concurrency(&self) -> usize {
        self.prewarm_concurrency
    }
    pub fn cache_max_entries(&self) -> Option<usize> {
        self.cache_max_entries
    }
    pub fn rules_path(&self) -> Option<&str> {
        self.rules_path.as_deref()
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            overall_timeout: self.fetch_timeout,
            request_timeout: self.request_timeout,
            retry_base_delay: self.retry_base_delay,
            ..FetchConfig::default()
        }
    }

    /// Rules from the configured file, or the built-in defaults.
    pub fn load_rules(&self) -> Result<ExtractionRules, ConfigError> {
        match &self.rules_path {
            Some(path) => ExtractionRules::load(path),
            None => Ok(ExtractionRules::default()),
        }
    }
}

fn env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    field: key,
                    reason: format!("{raw:?}: {e}"),
                })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_KEYS: [&str; 7] = [
        ENV_FETCH_TIMEOUT_SECS,
        ENV_FETCH_REQUEST_TIMEOUT_SECS,
        ENV_FETCH_MAX_RETRIES,
        ENV_FETCH_RETRY_BASE_MS,
        ENV_PREWARM_CONCURRENCY,
        ENV_CACHE_MAX_ENTRIES,
        ENV_EXTRACTION_RULES_PATH,
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.max_retries(), 2);
        assert_eq!(cfg.fetch_config().retry_base_delay, Duration::from_millis(250));
        assert!(cfg.load_rules().is_ok());
    }

    #[test]
    fn overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_FETCH_TIMEOUT_SECS, "20");
            env::set_var(ENV_FETCH_MAX_RETRIES, "4");
            env::set_var(ENV_FETCH_RETRY_BASE_MS, "100");
            env::set_var(ENV_PREWARM_CONCURRENCY, "8");
            env::set_var(ENV_CACHE_MAX_ENTRIES, "0");
        }
        let cfg = Config::from_env().unwrap();
        clear_env();

        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.fetch_config().overall_timeout, Duration::from_secs(20));
        assert_eq!(cfg.max_retries(), 4);
        assert_eq!(cfg.retry_base_delay(), Duration::from_millis(100));
        assert_eq!(cfg.prewarm_concurrency(), 8);
        assert_eq!(cfg.cache_max_entries(), None);
    }

    #[test]
    fn rejects_unparsable_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_FETCH_MAX_RETRIES, "lots");
        }
        let err = Config::from_env().unwrap_err();
        clear_env();

        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: ENV_FETCH_MAX_RETRIES, .. }
        ));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_PREWARM_CONCURRENCY, "0");
        }
        let err = Config::from_env().unwrap_err();
        clear_env();

        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: ENV_PREWARM_CONCURRENCY, .. }
        ));
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_EXTRACTION_RULES_PATH, "/nonexistent/rules.json");
        }
        let cfg = Config::from_env().unwrap();
        clear_env();

        assert!(matches!(cfg.load_rules(), Err(ConfigError::Io { .. })));
    }
}
