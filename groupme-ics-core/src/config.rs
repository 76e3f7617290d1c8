//! Feed settings, read once from the environment at startup.

use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use tracing::warn;

use crate::error::{FeedError, FeedResult};

pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_STATIC_NAME: &str = "GroupMe Calendar";
pub const DEFAULT_CACHE_MINUTES: u64 = 60;
pub const DEFAULT_API_URL: &str = "https://api.groupme.com/v3";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Environment variables as seen by the `config` crate (keys lowercased).
///
/// Everything is read as text; numeric settings are parsed afterwards so that
/// ids and keys like `007` reach GroupMe unchanged.
#[derive(Deserialize)]
struct EnvSettings {
    groupme_api_key: Option<String>,
    groupme_group_ids: Option<String>,
    groupme_calendar_timezone: Option<String>,
    groupme_static_name: Option<String>,
    cache_duration: Option<String>,
    groupme_proxy_url: Option<String>,
    groupme_api_url: Option<String>,
    groupme_api_timeout: Option<String>,
    port: Option<String>,
    bind_address: Option<String>,
}

/// Everything the server needs, constructed once and shared with handlers.
///
/// Missing credentials are not a startup error; they surface per request
/// through [`Settings::api_key`] and [`Settings::group_ids`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub group_ids: Vec<String>,
    pub timezone: String,
    pub static_name: String,
    /// Zero disables caching
    pub cache_duration: Duration,
    pub proxy_url: Option<String>,
    pub api_url: String,
    pub api_timeout: Duration,
    pub port: u16,
    pub bind_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: None,
            group_ids: Vec::new(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            static_name: DEFAULT_STATIC_NAME.to_string(),
            cache_duration: Duration::from_secs(DEFAULT_CACHE_MINUTES * 60),
            proxy_url: None,
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

impl Settings {
    /// Load from the process environment.
    pub fn load() -> FeedResult<Self> {
        Self::from_environment(Environment::default())
    }

    /// Load from an explicit set of variables instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> FeedResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(Environment::default().source(Some(source)))
    }

    fn from_environment(env: Environment) -> FeedResult<Self> {
        let raw: EnvSettings = Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;

        let defaults = Settings::default();

        let timezone = non_empty(raw.groupme_calendar_timezone).unwrap_or(defaults.timezone);
        if timezone.parse::<chrono_tz::Tz>().is_err() {
            warn!(timezone = %timezone, "Unknown calendar timezone; passing it through as-is");
        }

        Ok(Settings {
            api_key: non_empty(raw.groupme_api_key),
            group_ids: raw
                .groupme_group_ids
                .as_deref()
                .map(split_group_ids)
                .unwrap_or_default(),
            timezone,
            static_name: non_empty(raw.groupme_static_name).unwrap_or(defaults.static_name),
            cache_duration: parse_number::<u64>("CACHE_DURATION", raw.cache_duration)?
                .map(|minutes| Duration::from_secs(minutes * 60))
                .unwrap_or(defaults.cache_duration),
            proxy_url: non_empty(raw.groupme_proxy_url),
            api_url: non_empty(raw.groupme_api_url)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_timeout: parse_number::<u64>("GROUPME_API_TIMEOUT", raw.groupme_api_timeout)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.api_timeout),
            port: parse_number::<u16>("PORT", raw.port)?.unwrap_or(defaults.port),
            bind_address: non_empty(raw.bind_address).unwrap_or(defaults.bind_address),
        })
    }

    pub fn api_key(&self) -> FeedResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(FeedError::MissingSetting("GROUPME_API_KEY"))
    }

    pub fn group_ids(&self) -> FeedResult<&[String]> {
        if self.group_ids.is_empty() {
            return Err(FeedError::MissingSetting("GROUPME_GROUP_IDS"));
        }
        Ok(&self.group_ids)
    }
}

fn split_group_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: FromStr>(key: &str, value: Option<String>) -> FeedResult<Option<T>> {
    non_empty(value)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| FeedError::Config(format!("{key} must be a whole number, got '{v}'")))
        })
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(settings.api_key, None);
        assert!(settings.group_ids.is_empty());
        assert_eq!(settings.timezone, "America/Los_Angeles");
        assert_eq!(settings.static_name, "GroupMe Calendar");
        assert_eq!(settings.cache_duration, Duration::from_secs(3600));
        assert_eq!(settings.api_url, "https://api.groupme.com/v3");
        assert_eq!(settings.port, 5000);
    }

    #[test]
    fn test_reads_groupme_variables() {
        let settings = Settings::from_vars([
            ("GROUPME_API_KEY", "secret"),
            ("GROUPME_GROUP_IDS", " 111, 222 ,,333"),
            ("GROUPME_CALENDAR_TIMEZONE", "America/New_York"),
            ("GROUPME_STATIC_NAME", "Club Events"),
            ("CACHE_DURATION", "0"),
            ("GROUPME_PROXY_URL", "https://cal.example.com/calendar.ics"),
            ("GROUPME_API_URL", "http://localhost:9999/v3/"),
        ])
        .unwrap();

        assert_eq!(settings.api_key().unwrap(), "secret");
        assert_eq!(settings.group_ids().unwrap(), ["111", "222", "333"]);
        assert_eq!(settings.timezone, "America/New_York");
        assert_eq!(settings.static_name, "Club Events");
        assert_eq!(settings.cache_duration, Duration::ZERO);
        assert_eq!(
            settings.proxy_url.as_deref(),
            Some("https://cal.example.com/calendar.ics")
        );
        assert_eq!(settings.api_url, "http://localhost:9999/v3");
    }

    #[test]
    fn test_single_numeric_group_id() {
        let settings = Settings::from_vars([("GROUPME_GROUP_IDS", "12345678")]).unwrap();
        assert_eq!(settings.group_ids, vec!["12345678"]);
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let settings = Settings::from_vars([("GROUPME_API_KEY", "")]).unwrap();

        let err = settings.api_key().unwrap_err();
        assert_eq!(err.to_string(), "GROUPME_API_KEY not set");
        let err = settings.group_ids().unwrap_err();
        assert_eq!(err.to_string(), "GROUPME_GROUP_IDS not set");
    }

    #[test]
    fn test_bad_cache_duration_is_rejected() {
        let result = Settings::from_vars([("CACHE_DURATION", "an hour")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_string_settings_are_not_coerced() {
        let settings = Settings::from_vars([
            ("GROUPME_API_KEY", "0123"),
            ("GROUPME_GROUP_IDS", "007"),
            ("GROUPME_STATIC_NAME", "1.50"),
        ])
        .unwrap();

        assert_eq!(settings.api_key.as_deref(), Some("0123"));
        assert_eq!(settings.group_ids, vec!["007"]);
        assert_eq!(settings.static_name, "1.50");
    }

    #[test]
    fn test_numeric_settings_are_parsed() {
        let settings = Settings::from_vars([
            ("CACHE_DURATION", " 15 "),
            ("GROUPME_API_TIMEOUT", "3"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(settings.cache_duration, Duration::from_secs(15 * 60));
        assert_eq!(settings.api_timeout, Duration::from_secs(3));
        assert_eq!(settings.port, 8080);

        let err = Settings::from_vars([("PORT", "70000")]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
