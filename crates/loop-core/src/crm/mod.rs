//! CiviCRM contact sync for organisations.
//!
//! [`CrmClient`] is the capability set every driver offers. The service layer
//! holds a [`CrmSyncGateway`], which dispatches to the driver selected by
//! [`CrmConfig`].

mod civi;
mod log;
mod transformer;

pub use civi::CiviClient;
pub use log::{LogClient, LOG_CONTACT_ID};
pub use transformer::OrganisationTransformer;

use thiserror::Error;

use crate::config::{ConfigError, CrmConfig, CrmDriver};
use crate::error::Result;
use crate::models::Organisation;

/// A failed CRM call, carrying the status recorded on the failed sync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("CRM sync failed with status {status_code}: {message}")]
pub struct CrmSyncError {
    pub status_code: i64,
    pub message: String,
}

impl CrmSyncError {
    pub fn new(status_code: i64, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }
}

/// Mirror organisation lifecycle events onto a CRM contact.
///
/// CRM failures surface as [`crate::Error::CrmSync`]; a missing contact id on
/// update/delete is [`crate::Error::MissingExternalId`].
#[allow(async_fn_in_trait)]
pub trait CrmClient {
    /// Create the contact and return its CRM id
    async fn create(&self, organisation: &Organisation) -> Result<String>;

    /// Overwrite the existing contact
    async fn update(&self, organisation: &Organisation) -> Result<()>;

    /// Mark the existing contact as deleted
    async fn delete(&self, organisation: &Organisation) -> Result<()>;
}

/// The configured CRM driver.
#[derive(Debug, Clone)]
pub enum CrmSyncGateway {
    Civi(CiviClient),
    Log(LogClient),
}

impl CrmSyncGateway {
    pub fn from_config(config: &CrmConfig) -> Result<Self> {
        let transformer = OrganisationTransformer::new(
            config.description_field_id.clone(),
            config.deleted_at_field_id.clone(),
        );

        match config.driver {
            CrmDriver::Civi => {
                let credentials = config
                    .civi
                    .clone()
                    .ok_or(ConfigError::MissingVar("CIVI_DOMAIN"))?;
                tracing::info!("CRM sync via CiviCRM at {}", credentials.domain);
                Ok(Self::Civi(CiviClient::new(
                    credentials,
                    transformer,
                    config.timeout,
                )?))
            }
            CrmDriver::Log => {
                tracing::info!("CRM sync in log-only mode");
                Ok(Self::Log(LogClient::new(transformer)))
            }
        }
    }
}

impl CrmClient for CrmSyncGateway {
    async fn create(&self, organisation: &Organisation) -> Result<String> {
        match self {
            Self::Civi(client) => client.create(organisation).await,
            Self::Log(client) => client.create(organisation).await,
        }
    }

    async fn update(&self, organisation: &Organisation) -> Result<()> {
        match self {
            Self::Civi(client) => client.update(organisation).await,
            Self::Log(client) => client.update(organisation).await,
        }
    }

    async fn delete(&self, organisation: &Organisation) -> Result<()> {
        match self {
            Self::Civi(client) => client.delete(organisation).await,
            Self::Log(client) => client.delete(organisation).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CiviCredentials;

    #[test]
    fn default_config_selects_log_driver() {
        let gateway = CrmSyncGateway::from_config(&CrmConfig::default()).unwrap();
        assert!(matches!(gateway, CrmSyncGateway::Log(_)));
    }

    #[test]
    fn civi_driver_without_credentials_is_config_error() {
        let config = CrmConfig {
            driver: CrmDriver::Civi,
            ..CrmConfig::default()
        };
        assert!(matches!(
            CrmSyncGateway::from_config(&config),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn civi_driver_builds_live_client() {
        let config = CrmConfig {
            driver: CrmDriver::Civi,
            civi: Some(CiviCredentials {
                domain: "https://crm.example.org".to_string(),
                site_key: "site".to_string(),
                api_key: "api".to_string(),
            }),
            ..CrmConfig::default()
        };
        let gateway = CrmSyncGateway::from_config(&config).unwrap();
        assert!(matches!(gateway, CrmSyncGateway::Civi(_)));
    }

    #[test]
    fn sync_error_display_includes_status() {
        let error = CrmSyncError::new(422, "mandatory field missing");
        assert_eq!(
            error.to_string(),
            "CRM sync failed with status 422: mandatory field missing"
        );
    }
}
