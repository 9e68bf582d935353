use kokkai_connector::KokkaiConfig;
use nonzero_ext::nonzero;
use shared::{RetryPolicy, DEFAULT_MAX_CHUNK_CHARS};
use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SUMMARY_INPUT_CHARS: usize = 12_000;
pub const TOPIC_LOG_FILE: &str = "diet_topics_summary.md";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable '{0}' is not set")]
    MissingVar(&'static str),
    #[error("environment variable '{name}' has invalid value '{value}': {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub openai: OpenAiConfig,
    pub kokkai: KokkaiConfig,
    pub output_dir: PathBuf,
    pub chunk_max_chars: usize,
    pub summary_input_chars: usize,
    pub retry: RetryPolicy,
    pub llm_requests_per_second: NonZeroU32,
    pub extract_concurrency: usize,
    pub run_deadline: Option<Duration>,
    /// Append every chunk's topics to the running log, whatever the mode.
    pub topic_log: bool,
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source. The API key
    /// is checked first so a missing credential fails before anything else.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let max_retries = parse_or(&lookup, "MAX_RETRIES", RetryPolicy::DEFAULT_MAX_RETRIES)?;
        let retry = RetryPolicy::new(
            max_retries,
            Duration::from_millis(parse_or(&lookup, "RETRY_BASE_DELAY_MS", 1000u64)?),
        );

        let mut kokkai = KokkaiConfig::default().with_max_retries(max_retries);
        if let Some(url) = lookup("KOKKAI_API_URL") {
            kokkai = kokkai.with_base_url(url);
        }
        kokkai.page_delay = Duration::from_millis(parse_or(&lookup, "PAGE_DELAY_MS", 1000u64)?);

        let chunk_max_chars = parse_or(&lookup, "CHUNK_MAX_CHARS", DEFAULT_MAX_CHUNK_CHARS)?;
        if chunk_max_chars == 0 {
            return Err(invalid("CHUNK_MAX_CHARS", "0", "must be positive"));
        }
        let summary_input_chars =
            parse_or(&lookup, "SUMMARY_INPUT_CHARS", DEFAULT_SUMMARY_INPUT_CHARS)?;
        if summary_input_chars == 0 {
            return Err(invalid("SUMMARY_INPUT_CHARS", "0", "must be positive"));
        }

        let requests_per_second: u32 = parse_or(&lookup, "LLM_REQUESTS_PER_SECOND", 2)?;
        let llm_requests_per_second = NonZeroU32::new(requests_per_second)
            .ok_or_else(|| invalid("LLM_REQUESTS_PER_SECOND", "0", "must be positive"))?;

        let extract_concurrency: usize = parse_or(&lookup, "EXTRACT_CONCURRENCY", 1)?;

        let run_deadline = parse_opt::<u64, _>(&lookup, "RUN_DEADLINE_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let topic_log = parse_opt::<bool, _>(&lookup, "TOPIC_LOG")?.unwrap_or(false);

        Ok(Self {
            openai: OpenAiConfig {
                api_key,
                base_url: lookup("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                request_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "OPENAI_TIMEOUT_SECS",
                    60u64,
                )?),
            },
            kokkai,
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            chunk_max_chars,
            summary_input_chars,
            retry,
            llm_requests_per_second,
            extract_concurrency: extract_concurrency.max(1),
            run_deadline,
            topic_log,
        })
    }

    pub fn topic_log_path(&self) -> PathBuf {
        self.output_dir.join(TOPIC_LOG_FILE)
    }
}

impl Default for AnalyzerConfig {
    /// Defaults without a credential; callers must fill in `openai.api_key`.
    fn default() -> Self {
        Self {
            openai: OpenAiConfig {
                api_key: String::new(),
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                model: DEFAULT_OPENAI_MODEL.to_string(),
                request_timeout: Duration::from_secs(60),
            },
            kokkai: KokkaiConfig::default(),
            output_dir: PathBuf::from("."),
            chunk_max_chars: DEFAULT_MAX_CHUNK_CHARS,
            summary_input_chars: DEFAULT_SUMMARY_INPUT_CHARS,
            retry: RetryPolicy::default(),
            llm_requests_per_second: nonzero!(2u32),
            extract_concurrency: 1,
            run_deadline: None,
            topic_log: false,
        }
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidVar {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_opt<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(name, &raw, &e.to_string())),
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, name)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = AnalyzerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_is_fatal() {
        let err = AnalyzerConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("OPENAI_API_KEY"));
    }

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]))
            .unwrap();

        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.kokkai.base_url, kokkai_connector::config::KOKKAI_MEETING_URL);
        assert_eq!(config.kokkai.page_delay, Duration::from_secs(1));
        assert_eq!(config.chunk_max_chars, 2000);
        assert_eq!(config.extract_concurrency, 1);
        assert_eq!(config.run_deadline, None);
        assert!(!config.topic_log);
        assert_eq!(config.topic_log_path(), PathBuf::from("./diet_topics_summary.md"));
    }

    #[test]
    fn test_overrides() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1"),
            ("KOKKAI_API_URL", "http://localhost:9001/api/meeting"),
            ("OUTPUT_DIR", "/tmp/reports"),
            ("CHUNK_MAX_CHARS", "500"),
            ("PAGE_DELAY_MS", "0"),
            ("MAX_RETRIES", "5"),
            ("EXTRACT_CONCURRENCY", "4"),
            ("RUN_DEADLINE_SECS", "3600"),
            ("TOPIC_LOG", "true"),
        ]))
        .unwrap();

        assert_eq!(config.openai.base_url, "http://localhost:9000/v1");
        assert_eq!(config.kokkai.base_url, "http://localhost:9001/api/meeting");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.chunk_max_chars, 500);
        assert_eq!(config.kokkai.page_delay, Duration::ZERO);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.kokkai.max_retries, 5);
        assert_eq!(config.extract_concurrency, 4);
        assert_eq!(config.run_deadline, Some(Duration::from_secs(3600)));
        assert!(config.topic_log);
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = AnalyzerConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHUNK_MAX_CHARS", "lots"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidVar { name: "CHUNK_MAX_CHARS", .. }
        ));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let err = AnalyzerConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_REQUESTS_PER_SECOND", "0"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidVar { name: "LLM_REQUESTS_PER_SECOND", .. }
        ));
    }
}
