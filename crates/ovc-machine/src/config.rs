use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Connection and retry settings for [`crate::gateway::OvcGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub jwt: String,
    pub timeout: Duration,
    /// Extra attempts for retry-safe calls after a transient failure.
    pub retries: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    pub retry_delay: Duration,
}

impl GatewayConfig {
    /// Load from env vars:
    ///
    /// - `OVC_URL` (required)
    /// - `OVC_JWT` (required)
    /// - `OVC_TIMEOUT_SECS` (default: `60`)
    /// - `OVC_RETRIES` (default: `3`)
    /// - `OVC_RETRY_DELAY_MS` (default: `500`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::MissingEnv(name.to_string()))
        };

        Ok(Self {
            url: required("OVC_URL")?,
            jwt: required("OVC_JWT")?,
            timeout: Duration::from_secs(parse_or(&lookup, "OVC_TIMEOUT_SECS", 60)?),
            retries: parse_or(&lookup, "OVC_RETRIES", 3)?,
            retry_delay: Duration::from_millis(parse_or(&lookup, "OVC_RETRY_DELAY_MS", 500)?),
        })
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidEnv { name, value: raw }),
    }
}
