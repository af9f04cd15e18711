//! Log-only CRM client for development and non-production deployments.

use serde_json::Value;

use super::{CrmClient, OrganisationTransformer};
use crate::error::Result;
use crate::models::Organisation;

/// Contact id handed out by the log driver.
pub const LOG_CONTACT_ID: &str = "log-id";

#[derive(Debug, Clone)]
pub struct LogClient {
    transformer: OrganisationTransformer,
}

impl LogClient {
    pub const fn new(transformer: OrganisationTransformer) -> Self {
        Self { transformer }
    }
}

impl CrmClient for LogClient {
    async fn create(&self, organisation: &Organisation) -> Result<String> {
        let payload = Value::Object(self.transformer.transform_create(organisation));
        tracing::info!("CiviCRM create (log driver): {}", payload);
        Ok(LOG_CONTACT_ID.to_string())
    }

    async fn update(&self, organisation: &Organisation) -> Result<()> {
        let payload = Value::Object(self.transformer.transform_update(organisation)?);
        tracing::info!("CiviCRM update (log driver): {}", payload);
        Ok(())
    }

    async fn delete(&self, organisation: &Organisation) -> Result<()> {
        let payload = Value::Object(self.transformer.transform_delete(organisation)?);
        tracing::info!("CiviCRM delete (log driver): {}", payload);
        Ok(())
    }
}
