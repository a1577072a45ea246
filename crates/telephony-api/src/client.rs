//! Telephony backend HTTP client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use telephony_core::normalize;
use telephony_core::validation::field;
use telephony_core::{
    Ack, Agent, ApiError, CreateTrunkRequest, PhoneNumber, ScheduleRequest, ScheduledEvent,
    TelephonyBackend, Trunk, GENERIC_CONFLICT,
};

use crate::config::{ApiConfig, API_KEY_HEADER};
use crate::error::{transport, ConfigError};
use crate::types::{error_message, AgentBody, MutationResponse};

/// Client for the outbound telephony REST backend.
#[derive(Clone)]
pub struct TelephonyClient {
    http: Client,
    config: ApiConfig,
}

impl TelephonyClient {
    /// Build a client. No request is made until the first call.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| ConfigError::Invalid {
                name: "OUTBOUND_API_KEY",
                reason: "not a valid header value".to_string(),
            })?;
            headers.insert(API_KEY_HEADER, value);
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Build a client from `OUTBOUND_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn get(&self, url: &str) -> Result<Value, ApiError> {
        debug!("GET {}", url);
        self.execute(self.http.get(url)).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<MutationResponse, ApiError> {
        debug!("{} {}", method, url);
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let body = self.execute(request).await?;
        MutationResponse::parse(&body)?.check()
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(transport)?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response.text().await.map_err(transport)?;

    if !status.is_success() {
        return Err(status_error(status, &text));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Map a non-2xx status onto the shared taxonomy.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = error_message(body);
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(message.unwrap_or_else(|| {
            "The requested resource was not found. Please refresh and try again.".to_string()
        })),
        StatusCode::CONFLICT => {
            ApiError::Conflict(message.unwrap_or_else(|| GENERIC_CONFLICT.to_string()))
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::invalid(
            field::REQUEST,
            message.unwrap_or_else(|| format!("Request rejected ({})", status)),
        ),
        _ => {
            warn!("Backend answered {}", status);
            ApiError::Network(match message {
                Some(msg) => format!("HTTP {}: {}", status, msg),
                None => format!("HTTP {}", status),
            })
        }
    }
}

#[async_trait]
impl TelephonyBackend for TelephonyClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn list_agents(&self, organization_id: &str) -> Result<Vec<Agent>, ApiError> {
        let body = self.get(&self.config.agents_url(organization_id)).await?;
        Ok(normalize::agents(&body, organization_id))
    }

    async fn organization_numbers(
        &self,
        organization_id: &str,
    ) -> Result<Vec<PhoneNumber>, ApiError> {
        let body = self
            .get(&self.config.organization_numbers_url(organization_id))
            .await?;
        Ok(normalize::organization_numbers(&body, organization_id))
    }

    async fn available_numbers(&self) -> Result<Vec<PhoneNumber>, ApiError> {
        let body = self.get(&self.config.available_numbers_url()).await?;
        Ok(normalize::available_numbers(&body))
    }

    async fn assign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        let response = self
            .send(
                Method::POST,
                &self.config.assign_url(phone_id),
                Some(&AgentBody { agent_id }),
            )
            .await?;
        Ok(response.into_ack())
    }

    async fn unassign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        let response = self
            .send(
                Method::POST,
                &self.config.unassign_url(phone_id),
                Some(&AgentBody { agent_id }),
            )
            .await?;
        Ok(response.into_ack())
    }

    async fn list_trunks(&self, organization_id: &str) -> Result<Vec<Trunk>, ApiError> {
        let body = self.get(&self.config.trunks_url(organization_id)).await?;
        Ok(normalize::trunks(&body, organization_id))
    }

    async fn create_trunk(&self, request: &CreateTrunkRequest) -> Result<Option<Trunk>, ApiError> {
        let response = self
            .send(Method::POST, &self.config.create_trunk_url(), Some(request))
            .await?;
        Ok(response
            .trunk
            .as_ref()
            .and_then(|t| normalize::trunk_record(t, &request.organization_id)))
    }

    async fn delete_trunk(&self, trunk_id: &str) -> Result<Ack, ApiError> {
        let response = self
            .send::<()>(Method::DELETE, &self.config.trunk_url(trunk_id), None)
            .await?;
        Ok(response.into_ack())
    }

    async fn list_scheduled_events(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ScheduledEvent>, ApiError> {
        let body = self
            .get(&self.config.scheduled_events_url(organization_id))
            .await?;
        Ok(normalize::scheduled_events(&body))
    }

    async fn create_scheduled_event(&self, request: &ScheduleRequest) -> Result<Ack, ApiError> {
        let response = self
            .send(
                Method::POST,
                &self.config.create_scheduled_event_url(),
                Some(request),
            )
            .await?;
        Ok(response.into_ack())
    }

    async fn update_scheduled_event(
        &self,
        scheduled_id: &str,
        request: &ScheduleRequest,
    ) -> Result<Ack, ApiError> {
        let response = self
            .send(
                Method::PUT,
                &self.config.scheduled_event_url(scheduled_id),
                Some(request),
            )
            .await?;
        Ok(response.into_ack())
    }

    async fn delete_scheduled_event(&self, scheduled_id: &str) -> Result<Ack, ApiError> {
        let response = self
            .send::<()>(
                Method::DELETE,
                &self.config.scheduled_event_url(scheduled_id),
                None,
            )
            .await?;
        Ok(response.into_ack())
    }
}

impl std::fmt::Debug for TelephonyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelephonyClient")
            .field("base_url", &self.config.base_url)
            .field("has_api_key", &self.config.api_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, r#"{"message":"Trunk not found"}"#),
            ApiError::Conflict(_)
        ));
        match status_error(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"bad phone"}"#) {
            ApiError::Validation(report) => {
                assert_eq!(report.error(field::REQUEST), Some("bad phone"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            ApiError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_debug_hides_key() {
        let client = TelephonyClient::new(ApiConfig::new("http://localhost").with_api_key("s3cret"))
            .unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("s3cret"));
    }
}
