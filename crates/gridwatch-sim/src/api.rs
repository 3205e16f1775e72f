//! REST API handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use gridwatch_core::{AdminCommand, DeviceRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::pulse::RngNoise;
use crate::state::AppState;

/// Error body for rejections
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// `{status, message}` answer; `alert` only on admin commands
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
}

impl StatusMessage {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "ok",
            message: message.into(),
            alert: None,
        })
    }

    fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "error",
            message: message.into(),
            alert: None,
        })
    }
}

fn forbidden(detail: &str) -> axum::response::Response {
    (StatusCode::FORBIDDEN, Json(ErrorDetail::new(detail))).into_response()
}

#[derive(Serialize)]
pub struct DevicesBody {
    devices: Vec<DeviceRecord>,
}

/// List every device
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(DevicesBody {
        devices: state.registry.list().await,
    })
}

/// Reached only past the operator middleware
pub async fn validate_token() -> impl IntoResponse {
    StatusMessage::ok("token valid")
}

#[derive(Deserialize)]
pub struct CommandRequest {
    action: String,
    target: String,
}

/// Per-device operator actions
pub async fn command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> impl IntoResponse {
    let (result, done) = match req.action.as_str() {
        "restart" => (state.registry.restart(&req.target).await, "restarted"),
        "isolate" => (state.registry.isolate(&req.target).await, "isolated"),
        other => return StatusMessage::error(format!("Unknown action {}", other)),
    };
    match result {
        Ok(()) => {
            info!(action = %req.action, device = %req.target, "Device command applied");
            StatusMessage::ok(format!("Device {} {} (simulation)", req.target, done))
        }
        Err(e) => StatusMessage::error(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct SimulateRequest {
    scenario: String,
}

/// Run a named incident scenario
pub async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulateRequest>,
) -> impl IntoResponse {
    if !state.config.simulation.enabled {
        return forbidden("Simulations are disabled");
    }
    let message = match req.scenario.as_str() {
        "grid_cascade" => {
            state
                .registry
                .grid_cascade(&mut RngNoise::from_entropy())
                .await;
            "Simulation: cascading overload applied"
        }
        "spoof_telemetry" => {
            state.registry.spoof_telemetry().await;
            "Simulation: telemetry spoofing applied"
        }
        "transport_deadlock" => {
            state.registry.transport_deadlock().await;
            "Simulation: transport deadlock applied"
        }
        _ => return StatusMessage::error("Unknown scenario").into_response(),
    };
    info!(scenario = %req.scenario, "Scenario applied");
    StatusMessage::ok(message).into_response()
}

#[derive(Deserialize)]
pub struct PowerRequest {
    device_id: String,
    power_level: u8,
}

pub async fn adjust_power(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PowerRequest>,
) -> impl IntoResponse {
    let power_level = req.power_level.min(100);
    match state.registry.adjust_power(&req.device_id, power_level).await {
        Ok(()) => StatusMessage::ok(format!(
            "Power of {} set to {}%",
            req.device_id, power_level
        )),
        Err(e) => {
            warn!(device = %req.device_id, error = %e, "Power adjustment failed");
            StatusMessage::error("Power adjustment failed")
        }
    }
}

#[derive(Deserialize)]
pub struct VoltageRequest {
    device_id: String,
    voltage: u8,
}

pub async fn adjust_voltage(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VoltageRequest>,
) -> impl IntoResponse {
    let voltage = req.voltage.min(100);
    match state.registry.adjust_voltage(&req.device_id, voltage).await {
        Ok(()) => StatusMessage::ok(format!(
            "Voltage of {} set to {}%",
            req.device_id, voltage
        )),
        Err(e) => {
            warn!(device = %req.device_id, error = %e, "Voltage adjustment failed");
            StatusMessage::error("Voltage adjustment failed")
        }
    }
}

#[derive(Deserialize)]
pub struct AdminValidateRequest {
    admin_token: String,
}

pub async fn admin_validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminValidateRequest>,
) -> impl IntoResponse {
    if req.admin_token != state.config.auth.admin_token {
        warn!("Invalid admin token presented");
        return forbidden("Invalid admin token");
    }
    StatusMessage::ok("admin token valid").into_response()
}

#[derive(Deserialize)]
pub struct AdminControlRequest {
    command: String,
    admin_token: String,
}

/// Fleet-wide admin commands
pub async fn admin_control(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminControlRequest>,
) -> impl IntoResponse {
    if req.admin_token != state.config.auth.admin_token {
        warn!("Invalid admin token presented");
        return forbidden("Invalid admin token");
    }
    let Ok(command) = req.command.parse::<AdminCommand>() else {
        return StatusMessage::error(format!("Unknown command {}", req.command)).into_response();
    };
    match state.registry.admin(command).await {
        Ok(outcome) => Json(StatusMessage {
            status: "ok",
            message: outcome.message,
            alert: Some(outcome.alert),
        })
        .into_response(),
        Err(e) => StatusMessage::error(e.to_string()).into_response(),
    }
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    env: String,
    simulation_mode: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(Health {
        status: "running",
        env: state.config.server.env.clone(),
        simulation_mode: state.config.simulation.enabled,
    })
}
