//! HTTP client for the remote assistant backend.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::backend::{
    AppointmentService, ChatBackend, ChatReply, ConsultationChatRequest, GeneralChatRequest,
    HealthProbe,
};
use crate::config::AssistantConfig;
use crate::models::AppointmentRequest;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Cannot connect to assistant backend at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

/// reqwest-backed implementation of every backend collaborator.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(config: &AssistantConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| BackendError::Http(format!("Invalid API token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else {
            BackendError::Http(e.to_string())
        }
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn consultation_chat(
        &self,
        request: &ConsultationChatRequest,
    ) -> Result<String, BackendError> {
        let path = format!("/api/assistant/consultations/{}/chat", request.consultation_id);
        let reply: ChatReply = self.post_json(&path, request).await?;
        tracing::debug!(
            consultation_id = request.consultation_id,
            chars = reply.response.len(),
            "Consultation chat reply received"
        );
        Ok(reply.response)
    }

    async fn general_chat(&self, request: &GeneralChatRequest) -> Result<String, BackendError> {
        let reply: ChatReply = self.post_json("/api/assistant/chat", request).await?;
        Ok(reply.response)
    }
}

#[async_trait]
impl HealthProbe for HttpBackend {
    async fn probe(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/api/health"))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }
}

#[async_trait]
impl AppointmentService for HttpBackend {
    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.post_json("/api/appointments", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let config = AssistantConfig {
            backend_url: "http://localhost:8000/".into(),
            ..AssistantConfig::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("/api/health"), "http://localhost:8000/api/health");
    }

    #[test]
    fn invalid_token_is_rejected() {
        let config = AssistantConfig {
            api_token: Some("bad\ntoken".into()),
            ..AssistantConfig::default()
        };
        assert!(matches!(
            HttpBackend::new(&config),
            Err(BackendError::Http(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_fails_probe() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let config = AssistantConfig {
            backend_url: "http://127.0.0.1:9".into(),
            connect_timeout_secs: 1,
            request_timeout_secs: 2,
            ..AssistantConfig::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert!(backend.probe().await.is_err());
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = BackendError::Status {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "Backend returned 503: maintenance");
        assert_eq!(
            BackendError::Timeout(60).to_string(),
            "Request timed out after 60s"
        );
    }
}
