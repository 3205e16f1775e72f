//! `reqwest` implementation of [`Backend`]

use async_trait::async_trait;
use gridwatch_core::{AdminCommand, DeviceId, Snapshot};
use std::time::Duration;
use tracing::{debug, trace};

use crate::api::{
    parse_control, parse_detail, parse_devices, parse_message, AdminControlRequest,
    AdminValidateRequest, ApiError, Backend, ControlResponse, MessageResponse, PowerRequest,
    VoltageRequest,
};

/// HTTP client for the dashboard backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client; `timeout` of `None` keeps the transport default
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read the body, mapping non-2xx answers to `ApiError::Server`
    async fn read(resp: reqwest::Response) -> Result<String, ApiError> {
        let status = resp.status();
        let body = resp.text().await?;
        trace!(status = %status, len = body.len(), "Backend response");
        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                detail: parse_detail(&body),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn devices(&self) -> Result<Snapshot, ApiError> {
        let resp = self.http.get(self.url("/api/devices")).send().await?;
        let body = Self::read(resp).await?;
        parse_devices(&body)
    }

    async fn validate_token(&self, token: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .get(self.url("/api/validate_token"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::read(resp).await?;
        Ok(())
    }

    async fn adjust_power(
        &self,
        token: &str,
        device_id: &DeviceId,
        power_level: u8,
    ) -> Result<MessageResponse, ApiError> {
        debug!(device = %device_id, power_level, "Adjusting power");
        let resp = self
            .http
            .post(self.url("/api/adjust_power"))
            .bearer_auth(token)
            .json(&PowerRequest {
                device_id,
                power_level,
            })
            .send()
            .await?;
        let body = Self::read(resp).await?;
        Ok(parse_message(&body))
    }

    async fn adjust_voltage(
        &self,
        token: &str,
        device_id: &DeviceId,
        voltage: u8,
    ) -> Result<MessageResponse, ApiError> {
        debug!(device = %device_id, voltage, "Adjusting voltage");
        let resp = self
            .http
            .post(self.url("/api/adjust_voltage"))
            .bearer_auth(token)
            .json(&VoltageRequest { device_id, voltage })
            .send()
            .await?;
        let body = Self::read(resp).await?;
        Ok(parse_message(&body))
    }

    async fn validate_admin(&self, admin_token: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("/api/admin/validate"))
            .json(&AdminValidateRequest { admin_token })
            .send()
            .await?;
        Self::read(resp).await?;
        Ok(())
    }

    async fn admin_control(
        &self,
        admin_token: &str,
        command: AdminCommand,
    ) -> Result<ControlResponse, ApiError> {
        debug!(command = %command, "Sending admin command");
        let resp = self
            .http
            .post(self.url("/api/admin/control"))
            .json(&AdminControlRequest {
                command,
                admin_token,
            })
            .send()
            .await?;
        let body = Self::read(resp).await?;
        Ok(parse_control(&body))
    }
}
