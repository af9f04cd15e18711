//! Live CiviCRM REST client.

use std::time::Duration;

use serde_json::{json, Map, Value};

use super::{CrmClient, CrmSyncError, OrganisationTransformer};
use crate::config::{CiviCredentials, ConfigError};
use crate::error::Result;
use crate::models::Organisation;
use crate::util::compact_text;

const REST_PATH: &str = "/sites/all/modules/civicrm/extern/rest.php";
const ENTITY_CONTACT: &str = "Contact";
// CiviCRM's v3 API upserts through `create` when the payload carries an `id`.
const ACTION_CREATE: &str = "create";

const STATUS_BAD_GATEWAY: i64 = 502;
const STATUS_SERVICE_UNAVAILABLE: i64 = 503;
const STATUS_GATEWAY_TIMEOUT: i64 = 504;
const STATUS_API_ERROR: i64 = 400;

#[derive(Debug, Clone)]
pub struct CiviClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: CiviCredentials,
    transformer: OrganisationTransformer,
}

impl CiviClient {
    pub fn new(
        credentials: CiviCredentials,
        transformer: OrganisationTransformer,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                ConfigError::Invalid(format!("failed to build CiviCRM HTTP client: {error}"))
            })?;

        Ok(Self {
            http,
            endpoint: format!("{}{REST_PATH}", credentials.domain),
            credentials,
            transformer,
        })
    }

    /// Send one `Contact.create` call and return the decoded response body.
    async fn post_contact(&self, payload: Map<String, Value>) -> Result<Value> {
        let mut params = Map::new();
        params.insert("sequential".into(), json!(1));
        params.extend(payload);
        let json = serde_json::to_string(&Value::Object(params))?;

        tracing::debug!("POST {}.{} to {}", ENTITY_CONTACT, ACTION_CREATE, self.endpoint);
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[
                ("key", self.credentials.site_key.as_str()),
                ("api_key", self.credentials.api_key.as_str()),
                ("entity", ENTITY_CONTACT),
                ("action", ACTION_CREATE),
                ("json", json.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(CrmSyncError::new(
                i64::from(status.as_u16()),
                format!("CiviCRM responded with HTTP {status}: {}", compact_text(&body)),
            )
            .into());
        }

        let data: Value = serde_json::from_str(&body).map_err(|error| {
            CrmSyncError::new(
                STATUS_BAD_GATEWAY,
                format!("unreadable CiviCRM response: {error}"),
            )
        })?;

        if is_error(&data) {
            return Err(api_error(&data).into());
        }

        Ok(data)
    }
}

impl CrmClient for CiviClient {
    async fn create(&self, organisation: &Organisation) -> Result<String> {
        let data = self
            .post_contact(self.transformer.transform_create(organisation))
            .await?;

        let contact_id = match data.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(CrmSyncError::new(
                    STATUS_BAD_GATEWAY,
                    "CiviCRM create response did not include a contact id",
                )
                .into())
            }
        };

        tracing::info!(
            "Created CiviCRM contact {} for organisation {}",
            contact_id,
            organisation.id
        );
        Ok(contact_id)
    }

    async fn update(&self, organisation: &Organisation) -> Result<()> {
        let payload = self.transformer.transform_update(organisation)?;
        self.post_contact(payload).await?;
        tracing::info!("Updated CiviCRM contact for organisation {}", organisation.id);
        Ok(())
    }

    async fn delete(&self, organisation: &Organisation) -> Result<()> {
        let payload = self.transformer.transform_delete(organisation)?;
        self.post_contact(payload).await?;
        tracing::info!(
            "Marked CiviCRM contact deleted for organisation {}",
            organisation.id
        );
        Ok(())
    }
}

fn transport_error(error: reqwest::Error) -> CrmSyncError {
    let status_code = if error.is_timeout() {
        STATUS_GATEWAY_TIMEOUT
    } else {
        STATUS_SERVICE_UNAVAILABLE
    };
    CrmSyncError::new(status_code, format!("CiviCRM request failed: {error}"))
}

fn is_error(data: &Value) -> bool {
    match data.get("is_error") {
        Some(Value::Number(flag)) => flag.as_i64() == Some(1),
        Some(Value::String(flag)) => flag == "1",
        Some(Value::Bool(flag)) => *flag,
        _ => false,
    }
}

fn api_error(data: &Value) -> CrmSyncError {
    let status_code = match data.get("error_code") {
        Some(Value::Number(code)) => code.as_i64(),
        Some(Value::String(code)) => code.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(STATUS_API_ERROR);

    let message = data
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or("No error message provided.");

    CrmSyncError::new(status_code, message)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    use super::*;
    use crate::models::OrganisationDraft;
    use crate::Error;

    #[derive(Clone)]
    struct StubCivi {
        status: StatusCode,
        body: String,
        delay: Duration,
        seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    impl StubCivi {
        fn new(status: StatusCode, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                delay: Duration::ZERO,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    async fn handle(
        State(stub): State<StubCivi>,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, String) {
        stub.seen.lock().await.push(params);
        if !stub.delay.is_zero() {
            tokio::time::sleep(stub.delay).await;
        }
        (stub.status, stub.body.clone())
    }

    async fn serve(stub: StubCivi) -> String {
        let app = Router::new()
            .route(REST_PATH, post(handle))
            .with_state(stub);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(domain: String, timeout: Duration) -> CiviClient {
        CiviClient::new(
            CiviCredentials {
                domain,
                site_key: "site-key".to_string(),
                api_key: "api-key".to_string(),
            },
            OrganisationTransformer::new("12", "13"),
            timeout,
        )
        .unwrap()
    }

    fn acme(civi_id: Option<&str>) -> Organisation {
        let mut organisation = Organisation::new(OrganisationDraft {
            name: "Acme Org".to_string(),
            description: "Lorem ipsum".to_string(),
            civi_sync_enabled: true,
            ..OrganisationDraft::default()
        });
        organisation.civi_id = civi_id.map(str::to_string);
        organisation
    }

    fn status_of(result: Result<impl std::fmt::Debug>) -> i64 {
        match result {
            Err(Error::CrmSync(error)) => error.status_code,
            other => panic!("expected CrmSync error, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_sends_contact_payload_and_returns_id() {
        let stub = StubCivi::new(StatusCode::OK, r#"{"is_error":0,"id":321,"values":[]}"#);
        let seen = stub.seen.clone();
        let domain = serve(stub).await;

        let contact_id = client(domain, Duration::from_secs(5))
            .create(&acme(None))
            .await
            .unwrap();
        assert_eq!(contact_id, "321");

        let seen = seen.lock().await;
        let params = &seen[0];
        assert_eq!(params["key"], "site-key");
        assert_eq!(params["api_key"], "api-key");
        assert_eq!(params["entity"], "Contact");
        assert_eq!(params["action"], "create");

        let payload: Value = serde_json::from_str(&params["json"]).unwrap();
        assert_eq!(payload["sequential"], json!(1));
        assert_eq!(payload["organization_name"], json!("Acme Org"));
        assert_eq!(payload["custom_12"], json!("Lorem ipsum"));
        assert!(payload.get("id").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_sends_contact_id() {
        let stub = StubCivi::new(StatusCode::OK, r#"{"is_error":0,"id":"42"}"#);
        let seen = stub.seen.clone();
        let domain = serve(stub).await;

        client(domain, Duration::from_secs(5))
            .update(&acme(Some("42")))
            .await
            .unwrap();

        let seen = seen.lock().await;
        let payload: Value = serde_json::from_str(&seen[0]["json"]).unwrap();
        assert_eq!(payload["id"], json!("42"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_failure_maps_to_status() {
        let domain = serve(StubCivi::new(StatusCode::UNPROCESSABLE_ENTITY, "bad")).await;
        let result = client(domain, Duration::from_secs(5))
            .create(&acme(None))
            .await;
        assert_eq!(status_of(result), 422);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn is_error_body_maps_to_error_code() {
        let domain = serve(StubCivi::new(
            StatusCode::OK,
            r#"{"is_error":1,"error_code":"409","error_message":"duplicate"}"#,
        ))
        .await;
        let result = client(domain, Duration::from_secs(5))
            .update(&acme(Some("42")))
            .await;
        assert_eq!(status_of(result), 409);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn is_error_without_numeric_code_is_400() {
        let domain = serve(StubCivi::new(
            StatusCode::OK,
            r#"{"is_error":1,"error_code":"mandatory_missing"}"#,
        ))
        .await;
        let result = client(domain, Duration::from_secs(5))
            .create(&acme(None))
            .await;
        assert_eq!(status_of(result), 400);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_without_id_is_bad_gateway() {
        let domain = serve(StubCivi::new(StatusCode::OK, r#"{"is_error":0}"#)).await;
        let result = client(domain, Duration::from_secs(5))
            .create(&acme(None))
            .await;
        assert_eq!(status_of(result), 502);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timeout_is_gateway_timeout() {
        let mut stub = StubCivi::new(StatusCode::OK, r#"{"is_error":0,"id":1}"#);
        stub.delay = Duration::from_secs(5);
        let domain = serve(stub).await;

        let result = client(domain, Duration::from_millis(200))
            .create(&acme(None))
            .await;
        assert_eq!(status_of(result), 504);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_host_is_service_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client(format!("http://{addr}"), Duration::from_secs(2))
            .create(&acme(None))
            .await;
        assert_eq!(status_of(result), 503);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_without_contact_id_sends_nothing() {
        let stub = StubCivi::new(StatusCode::OK, r#"{"is_error":0}"#);
        let seen = stub.seen.clone();
        let domain = serve(stub).await;

        let result = client(domain, Duration::from_secs(5))
            .update(&acme(None))
            .await;
        assert!(matches!(result, Err(Error::MissingExternalId(_))));
        assert!(seen.lock().await.is_empty());
    }
}
