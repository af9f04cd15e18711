//! CRM sync configuration loaded from the environment.
//!
//! `CRM_DRIVER` selects the client (`civi` or `log`, default `log`). The live
//! CiviCRM client additionally needs the endpoint domain, both keys, and the
//! ids of the custom fields that carry the description and deletion date.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::util::is_http_url;

const DEFAULT_TIMEOUT_SECS: &str = "10";
const DEFAULT_DESCRIPTION_FIELD: &str = "description";
const DEFAULT_DELETED_AT_FIELD: &str = "deleted_at";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which CRM client handles organisation sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrmDriver {
    /// Live CiviCRM REST client
    Civi,
    /// Log payloads only; nothing leaves the process
    #[default]
    Log,
}

impl FromStr for CrmDriver {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "civi" => Ok(Self::Civi),
            "log" => Ok(Self::Log),
            other => Err(ConfigError::Invalid(format!(
                "CRM_DRIVER must be 'civi' or 'log', got '{other}'"
            ))),
        }
    }
}

/// Credentials for the CiviCRM REST endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct CiviCredentials {
    pub domain: String,
    pub site_key: String,
    pub api_key: String,
}

impl fmt::Debug for CiviCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CiviCredentials")
            .field("domain", &self.domain)
            .field("site_key", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmConfig {
    pub driver: CrmDriver,
    /// Present only for the `civi` driver
    pub civi: Option<CiviCredentials>,
    pub description_field_id: String,
    pub deleted_at_field_id: String,
    pub timeout: Duration,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            driver: CrmDriver::Log,
            civi: None,
            description_field_id: DEFAULT_DESCRIPTION_FIELD.to_string(),
            deleted_at_field_id: DEFAULT_DELETED_AT_FIELD.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl CrmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let driver: CrmDriver = value_or_default(&lookup, "CRM_DRIVER", "log").parse()?;

        let timeout_secs = value_or_default(&lookup, "CIVI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid("CIVI_TIMEOUT_SECS must be an integer in [1, 120]".to_string())
            })?;
        if !(1..=120).contains(&timeout_secs) {
            return Err(ConfigError::Invalid(
                "CIVI_TIMEOUT_SECS must be in [1, 120]".to_string(),
            ));
        }

        let (civi, description_field_id, deleted_at_field_id) = match driver {
            CrmDriver::Civi => {
                let domain = required_trimmed(&lookup, "CIVI_DOMAIN")?;
                if !is_http_url(&domain) {
                    return Err(ConfigError::Invalid(
                        "CIVI_DOMAIN must start with http:// or https://".to_string(),
                    ));
                }
                let credentials = CiviCredentials {
                    domain: domain.trim_end_matches('/').to_string(),
                    site_key: required_trimmed(&lookup, "CIVI_SITE_KEY")?,
                    api_key: required_trimmed(&lookup, "CIVI_API_KEY")?,
                };
                (
                    Some(credentials),
                    required_trimmed(&lookup, "CIVI_DESCRIPTION_FIELD_ID")?,
                    required_trimmed(&lookup, "CIVI_DELETED_AT_FIELD_ID")?,
                )
            }
            CrmDriver::Log => (
                None,
                value_or_default(
                    &lookup,
                    "CIVI_DESCRIPTION_FIELD_ID",
                    DEFAULT_DESCRIPTION_FIELD,
                ),
                value_or_default(&lookup, "CIVI_DELETED_AT_FIELD_ID", DEFAULT_DELETED_AT_FIELD),
            ),
        };

        Ok(Self {
            driver,
            civi,
            description_field_id,
            deleted_at_field_id,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
