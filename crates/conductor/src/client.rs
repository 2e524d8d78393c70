//! Outbound device protocol.
//!
//! One request per action. Drivers expose each device command as an HTTP
//! endpoint on a per-device-class microservice; the response body is the
//! device's status after the command.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;

/// A fully resolved device command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub device: String,
    pub address: String,
    /// Base URL of the driver service.
    pub microservice: String,
    /// Path with every placeholder substituted.
    pub endpoint: String,
}

impl DeviceRequest {
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.microservice.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse {
    pub status: u16,
    pub body: String,
}

impl DeviceResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as a JSON object, if it is one.
    pub fn device_status(&self) -> Option<Map<String, Value>> {
        match serde_json::from_str(&self.body) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// Sends one command to one device.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    async fn send(&self, request: &DeviceRequest) -> Result<DeviceResponse, TransportError>;
}

/// HTTP driver client.
pub struct HttpDeviceClient {
    client: Client,
    timeout: Duration,
    bearer_token: Option<String>,
}

impl HttpDeviceClient {
    pub fn new(timeout: Duration, bearer_token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            timeout,
            bearer_token,
        })
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn send(&self, request: &DeviceRequest) -> Result<DeviceResponse, TransportError> {
        let url = request.url();
        tracing::debug!(device = %request.device, url = %url, "sending device command");

        let mut builder = self.client.get(&url);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.clone(),
                    timeout: self.timeout,
                }
            } else {
                TransportError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: format!("failed to read response body: {e}"),
        })?;

        Ok(DeviceResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let request = DeviceRequest {
            device: "D1".to_string(),
            address: "d1.local".to_string(),
            microservice: "http://sony:8007/".to_string(),
            endpoint: "/d1.local/power/on".to_string(),
        };
        assert_eq!(request.url(), "http://sony:8007/d1.local/power/on");
    }

    #[test]
    fn test_device_status_only_for_objects() {
        assert!(DeviceResponse::ok(r#"{"power": "on"}"#).device_status().is_some());
        assert!(DeviceResponse::ok("[1, 2]").device_status().is_none());
        assert!(DeviceResponse::ok("ok").device_status().is_none());
    }

    #[test]
    fn test_success_range() {
        let mut response = DeviceResponse::ok("");
        assert!(response.is_success());
        response.status = 500;
        assert!(!response.is_success());
    }
}
