//! Client configuration.
//!
//! Resolves the backend base URL, the catalog polling interval, and the HTTP
//! request timeout from the environment. Parsing goes through a `lookup`
//! function so it can be exercised without touching the process env.

use std::env;
use std::time::Duration;

use crate::util::{normalize_base_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_API_URL: &str = "FILESTACKER_API_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "FILESTACKER_POLL_INTERVAL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "FILESTACKER_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime configuration shared by every client component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_base_url: String,
    /// Period of silent catalog refreshes.
    pub poll_interval: Duration,
    /// Connect and idle-read timeout for every request, and the total
    /// deadline for JSON calls. File transfers have no total deadline.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Build a config for an explicit base URL with default timings.
    pub fn new(api_base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url.as_ref()).map_err(Error::Config)?,
            ..Self::default()
        })
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }

    pub fn with_api_base_url(mut self, api_base_url: impl AsRef<str>) -> Result<Self> {
        self.api_base_url = normalize_base_url(api_base_url.as_ref()).map_err(Error::Config)?;
        Ok(self)
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
    let mut config = ClientConfig::default();

    if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
        config.api_base_url = normalize_base_url(&url)
            .map_err(|error| Error::Config(format!("{ENV_API_URL}: {error}")))?;
    }
    if let Some(secs) = parse_seconds(ENV_POLL_INTERVAL_SECS, lookup(ENV_POLL_INTERVAL_SECS))? {
        config.poll_interval = secs;
    }
    if let Some(secs) = parse_seconds(ENV_REQUEST_TIMEOUT_SECS, lookup(ENV_REQUEST_TIMEOUT_SECS))?
    {
        config.request_timeout = secs;
    }

    Ok(config)
}

fn parse_seconds(name: &str, raw: Option<String>) -> Result<Option<Duration>> {
    let Some(raw) = normalize_text_option(raw) else {
        return Ok(None);
    };
    let secs = raw
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{name} must be a whole number of seconds")))?;
    if secs == 0 {
        return Err(Error::Config(format!("{name} must be greater than zero")));
    }
    Ok(Some(Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<ClientConfig> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn parse_config_defaults_when_env_is_empty() {
        let config = parse_from_map(&HashMap::new()).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.api_base_url, "http://localhost:8000");
    }

    #[test]
    fn parse_config_reads_all_values() {
        let map = HashMap::from([
            (ENV_API_URL, " https://files.example.com/ "),
            (ENV_POLL_INTERVAL_SECS, "5"),
            (ENV_REQUEST_TIMEOUT_SECS, "10"),
        ]);
        let config = parse_from_map(&map).unwrap();
        assert_eq!(config.api_base_url, "https://files.example.com");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_config_rejects_bad_values() {
        let bad_url = HashMap::from([(ENV_API_URL, "files.example.com")]);
        assert!(parse_from_map(&bad_url).is_err());

        let zero_interval = HashMap::from([(ENV_POLL_INTERVAL_SECS, "0")]);
        assert!(parse_from_map(&zero_interval).is_err());

        let not_a_number = HashMap::from([(ENV_REQUEST_TIMEOUT_SECS, "soon")]);
        let error = parse_from_map(&not_a_number).unwrap_err();
        assert!(error.to_string().contains(ENV_REQUEST_TIMEOUT_SECS));
    }
}
