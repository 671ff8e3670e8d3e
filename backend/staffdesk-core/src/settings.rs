// src/settings.rs
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::duration::{SchedulingPolicy, HOURS_PER_WORKING_DAY, WORKING_DAY_SEARCH_LIMIT};

pub const ENV_PREFIX: &str = "STAFFDESK_";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read environment configuration")]
    Env(#[from] envy::Error),

    #[error("Invalid API base URL '{url}'")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_hours_per_working_day() -> Decimal {
    HOURS_PER_WORKING_DAY
}

fn default_search_limit() -> u32 {
    WORKING_DAY_SEARCH_LIMIT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Runtime configuration read from `STAFFDESK_*` variables (and `.env`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_hours_per_working_day")]
    pub hours_per_working_day: Decimal,
    #[serde(default = "default_search_limit")]
    pub working_day_search_limit: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            hours_per_working_day: default_hours_per_working_day(),
            working_day_search_limit: default_search_limit(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        let settings = envy::prefixed(ENV_PREFIX).from_env::<Settings>()?;
        settings.validated()
    }

    /// Same as `from_env` but reads the given pairs instead of the process environment.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let settings = envy::prefixed(ENV_PREFIX).from_iter::<_, Settings>(pairs)?;
        settings.validated()
    }

    fn validated(self) -> Result<Self, SettingsError> {
        self.base_url()?;
        if self.hours_per_working_day <= dec!(0) {
            return Err(SettingsError::Invalid {
                name: "hours_per_working_day",
                reason: format!("must be positive, got {}", self.hours_per_working_day),
            });
        }
        if self.working_day_search_limit == 0 {
            return Err(SettingsError::Invalid {
                name: "working_day_search_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        debug!("Loaded settings: {:?}", self);
        Ok(self)
    }

    pub fn base_url(&self) -> Result<Url, SettingsError> {
        Url::parse(&self.api_base_url).map_err(|source| SettingsError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            source,
        })
    }

    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        SchedulingPolicy {
            hours_per_working_day: self.hours_per_working_day,
            search_limit_days: self.working_day_search_limit,
        }
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::from_pairs(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.scheduling_policy(), SchedulingPolicy::default());
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let settings = Settings::from_pairs(pairs(&[
            ("STAFFDESK_API_BASE_URL", "https://desk.example.com/api"),
            ("STAFFDESK_HOURS_PER_WORKING_DAY", "7.5"),
            ("STAFFDESK_WORKING_DAY_SEARCH_LIMIT", "30"),
            ("STAFFDESK_LOG_LEVEL", "debug"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();
        assert_eq!(settings.api_base_url, "https://desk.example.com/api");
        assert_eq!(settings.hours_per_working_day, dec!(7.5));
        assert_eq!(settings.scheduling_policy().search_limit_days, 30);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Settings::from_pairs(pairs(&[("STAFFDESK_API_BASE_URL", "not a url")])),
            Err(SettingsError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            Settings::from_pairs(pairs(&[("STAFFDESK_HOURS_PER_WORKING_DAY", "0")])),
            Err(SettingsError::Invalid {
                name: "hours_per_working_day",
                ..
            })
        ));
        assert!(matches!(
            Settings::from_pairs(pairs(&[("STAFFDESK_REQUEST_TIMEOUT_SECS", "soon")])),
            Err(SettingsError::Env(_))
        ));
    }
}
