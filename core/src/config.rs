//! Client configuration.
//!
//! The API key is supplied by the caller. `from_env` is a convenience for
//! binaries and scripts that keep the key in the environment.

use std::time::Duration;

use crate::campaigns::{Campaigns, DEFAULT_API_VERSION};
use crate::error::ApiError;
use crate::gateway::{Gateway, DEFAULT_BASE_URL};
use crate::http::UreqTransport;

pub const API_KEY_VAR: &str = "LEMLIST_API_KEY";
pub const BASE_URL_VAR: &str = "LEMLIST_BASE_URL";
pub const TIMEOUT_VAR: &str = "LEMLIST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub api_version: u32,
    /// Whole-request timeout applied by the transport. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            timeout: None,
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{API_KEY_VAR} must be set and non-empty")))?;
        let mut config = Self::new(api_key);

        if let Some(url) = lookup(BASE_URL_VAR).filter(|s| !s.trim().is_empty()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ApiError::Config(format!(
                    "{BASE_URL_VAR} must start with http:// or https://"
                )));
            }
            config.base_url = url;
        }

        if let Some(secs) = lookup(TIMEOUT_VAR).filter(|s| !s.trim().is_empty()) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ApiError::Config(format!("{TIMEOUT_VAR} must be a whole number of seconds"))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Build campaign operations over a blocking `ureq` transport.
    pub fn into_campaigns(self) -> Campaigns<UreqTransport> {
        let transport = match self.timeout {
            Some(timeout) => UreqTransport::with_timeout(timeout),
            None => UreqTransport::new(),
        };
        let gateway = Gateway::with_base_url(self.api_key, &self.base_url, transport);
        Campaigns::with_version(gateway, self.api_version)
    }
}
