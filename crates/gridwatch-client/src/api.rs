//! Backend API surface: wire types, errors, and the `Backend` trait

use async_trait::async_trait;
use gridwatch_core::{AdminCommand, DeviceId, DeviceRecord, Snapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-side API error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never got an HTTP answer
    #[error("transport: {0}")]
    Transport(String),
    /// Non-2xx answer; `detail` is the server's explanation when it sent one
    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Server { status: u16, detail: Option<String> },
    /// 2xx answer with a body we could not use
    #[error("decode: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the backend refused the credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Server { status, .. } if (400..500).contains(status))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

/// `GET /api/devices` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceRecord>,
}

/// Error body used by the backend for rejections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Generic `{message}` answer to a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub message: String,
}

/// `POST /api/admin/control` answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub message: String,
    /// High-severity text to surface as a danger notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerRequest<'a> {
    pub device_id: &'a DeviceId,
    pub power_level: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoltageRequest<'a> {
    pub device_id: &'a DeviceId,
    pub voltage: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminValidateRequest<'a> {
    pub admin_token: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminControlRequest<'a> {
    pub command: AdminCommand,
    pub admin_token: &'a str,
}

/// Text shown when a mutation answer has no readable message
pub const NO_MESSAGE: &str = "no message";

/// Parse a device list body into a validated snapshot
pub fn parse_devices(body: &str) -> Result<Snapshot, ApiError> {
    let response: DevicesResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("device list: {}", e)))?;
    Snapshot::new(response.devices).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Detail reported for an error body that is not JSON at all
pub const INVALID_BODY: &str = "invalid";

/// Pull `detail` out of an error body
///
/// A body that is not JSON yields [`INVALID_BODY`]. A JSON body without a
/// usable `detail` yields `None` so the caller picks its own wording.
pub fn parse_detail(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Some(INVALID_BODY.to_string());
    };
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
}

/// Parse a mutation answer, degrading to the raw body when it is not JSON
pub fn parse_message(body: &str) -> MessageResponse {
    serde_json::from_str(body).unwrap_or_else(|_| MessageResponse {
        status: None,
        message: fallback_message(body),
    })
}

/// Parse an admin control answer with the same fallback as [`parse_message`]
pub fn parse_control(body: &str) -> ControlResponse {
    serde_json::from_str(body).unwrap_or_else(|_| ControlResponse {
        status: None,
        message: fallback_message(body),
        alert: None,
    })
}

fn fallback_message(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        NO_MESSAGE.to_string()
    } else {
        body.to_string()
    }
}

/// The backend as seen by the dashboard
///
/// One method per REST call. Implementations make exactly one request per
/// call: no retries, no queuing.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Fetch the full device snapshot
    async fn devices(&self) -> Result<Snapshot, ApiError>;

    /// Check an operator token; `Ok` means 2xx
    async fn validate_token(&self, token: &str) -> Result<(), ApiError>;

    async fn adjust_power(
        &self,
        token: &str,
        device_id: &DeviceId,
        power_level: u8,
    ) -> Result<MessageResponse, ApiError>;

    async fn adjust_voltage(
        &self,
        token: &str,
        device_id: &DeviceId,
        voltage: u8,
    ) -> Result<MessageResponse, ApiError>;

    /// Check an admin token; `Ok` means 2xx
    async fn validate_admin(&self, admin_token: &str) -> Result<(), ApiError>;

    async fn admin_control(
        &self,
        admin_token: &str,
        command: AdminCommand,
    ) -> Result<ControlResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_core::DeviceStatus;

    #[test]
    fn test_parse_devices() {
        let body = r#"{"devices":[{"id":"pp-1","name":"Plant","kind":"power","role":"Generation","location":"North","status":"OK","load":10.0,"last_seen":1700000000,"power_level":75,"voltage":50,"temperature":35.4,"extra":{}}]}"#;
        let snapshot = parse_devices(body).unwrap();
        assert_eq!(snapshot.len(), 1);
        let device = &snapshot.devices()[0];
        assert_eq!(device.status, DeviceStatus::Ok);
        assert_eq!(device.temperature(), 35.4);
        assert_eq!(device.last_seen, Some(1700000000));
    }

    #[test]
    fn test_parse_devices_accepts_float_percentages() {
        let body = r#"{"devices":[{"id":"d1","name":"Plant","status":"OK","load":12,"power_level":75.0,"voltage":62.5,"temperature":35}]}"#;
        let snapshot = parse_devices(body).unwrap();
        let device = &snapshot.devices()[0];
        assert_eq!(device.power_level(), 75);
        assert_eq!(device.voltage(), 63);
        assert_eq!(device.temperature(), 35.0);
    }

    #[test]
    fn test_parse_devices_rejects_malformed() {
        assert!(matches!(parse_devices("not json"), Err(ApiError::Decode(_))));
        assert!(matches!(parse_devices(r#"{"items":[]}"#), Err(ApiError::Decode(_))));
        let dup = r#"{"devices":[{"id":"a","name":"x"},{"id":"a","name":"y"}]}"#;
        assert!(matches!(parse_devices(dup), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_parse_detail() {
        assert_eq!(
            parse_detail(r#"{"detail":"Invalid token"}"#),
            Some("Invalid token".to_string())
        );
        assert_eq!(parse_detail("<html>502</html>").as_deref(), Some(INVALID_BODY));
        assert_eq!(parse_detail("").as_deref(), Some(INVALID_BODY));
        assert_eq!(parse_detail(r#"{"detail":""}"#), None);
        assert_eq!(parse_detail(r#"{"error":"nope"}"#), None);
    }

    #[test]
    fn test_parse_message_fallbacks() {
        assert_eq!(
            parse_message(r#"{"status":"ok","message":"Power of pp-1 set to 80%"}"#).message,
            "Power of pp-1 set to 80%"
        );
        assert_eq!(parse_message("").message, NO_MESSAGE);
        assert_eq!(parse_message("plain text").message, "plain text");
    }

    #[test]
    fn test_parse_control_alert() {
        let body = r#"{"status":"ok","message":"Grid offline","alert":"EMERGENCY SHUTDOWN"}"#;
        let response = parse_control(body);
        assert_eq!(response.alert.as_deref(), Some("EMERGENCY SHUTDOWN"));
        assert_eq!(parse_control("{}").message, "{}");
    }

    #[test]
    fn test_auth_failure_classification() {
        let forbidden = ApiError::Server {
            status: 403,
            detail: None,
        };
        assert!(forbidden.is_auth_failure());
        assert!(!ApiError::Transport("refused".to_string()).is_auth_failure());
        assert_eq!(forbidden.to_string(), "HTTP 403: no detail");
    }

    #[test]
    fn test_admin_request_wire_format() {
        let body = AdminControlRequest {
            command: AdminCommand::CompromiseAll,
            admin_token: "k",
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"command":"compromise_all","admin_token":"k"}"#
        );
    }
}
