//! Web server setup and routing

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api;
use crate::auth::require_operator;
use crate::pulse::{self, RngNoise};
use crate::state::AppState;

/// Build the REST router
pub fn router(state: Arc<AppState>) -> Router {
    // Operator routes share the bearer-token check
    let operator = Router::new()
        .route("/api/validate_token", get(api::validate_token))
        .route("/api/command", post(api::command))
        .route("/api/simulate", post(api::simulate))
        .route("/api/adjust_power", post(api::adjust_power))
        .route("/api/adjust_voltage", post(api::adjust_voltage))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_operator,
        ));

    Router::new()
        .route("/api/devices", get(api::list_devices))
        .route("/api/admin/validate", post(api::admin_validate))
        .route("/api/admin/control", post(api::admin_control))
        .route("/health", get(api::health))
        .merge(operator)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the API and run the telemetry pulse alongside it
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let app = router(state.clone());

    let registry = state.registry.clone();
    let period = state.config.simulation.pulse_interval();
    tokio::spawn(pulse::run(registry, period, RngNoise::from_entropy()));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(address = %bind, "Starting simulated backend");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    const OPERATOR: &str = "op-token";
    const ADMIN: &str = "admin-token";

    fn app_with(simulation: bool) -> Router {
        let mut config = Config::default();
        config.auth.api_token = OPERATOR.to_string();
        config.auth.admin_token = ADMIN.to_string();
        config.simulation.enabled = simulation;
        router(AppState::new(config))
    }

    fn app() -> Router {
        app_with(true)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_req(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_devices_listing() {
        let (status, body) = send(app(), get_req("/api/devices", None)).await;
        assert_eq!(status, StatusCode::OK);
        let devices = body["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 4);
        assert_eq!(devices[0]["id"], "pp-1");
        assert_eq!(devices[0]["status"], "OK");
        assert_eq!(devices[0]["power_level"], 75);
    }

    #[tokio::test]
    async fn test_validate_token_statuses() {
        let (status, _) = send(app(), get_req("/api/validate_token", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(app(), get_req("/api/validate_token", Some("Token abc"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["detail"].is_string());

        let (status, body) =
            send(app(), get_req("/api/validate_token", Some("Bearer wrong"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Invalid token");

        let auth = format!("Bearer {}", OPERATOR);
        let (status, body) = send(app(), get_req("/api/validate_token", Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "token valid");
    }

    #[tokio::test]
    async fn test_adjust_power_requires_token() {
        let req = post_json(
            "/api/adjust_power",
            None,
            serde_json::json!({"device_id": "pp-1", "power_level": 90}),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_adjust_power_applies() {
        let state = {
            let mut config = Config::default();
            config.auth.api_token = OPERATOR.to_string();
            AppState::new(config)
        };
        let req = post_json(
            "/api/adjust_power",
            Some(OPERATOR),
            serde_json::json!({"device_id": "pp-1", "power_level": 90}),
        );
        let (status, body) = send(router(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["message"], "Power of pp-1 set to 90%");

        let devices = state.registry.list().await;
        assert_eq!(devices[0].power_level, Some(90));
    }

    #[tokio::test]
    async fn test_adjust_voltage_unknown_device() {
        let req = post_json(
            "/api/adjust_voltage",
            Some(OPERATOR),
            serde_json::json!({"device_id": "nope", "voltage": 10}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_admin_validate() {
        let req = post_json(
            "/api/admin/validate",
            None,
            serde_json::json!({"admin_token": "nope"}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Invalid admin token");

        let req = post_json(
            "/api/admin/validate",
            None,
            serde_json::json!({"admin_token": ADMIN}),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_control_shutdown() {
        let mut config = Config::default();
        config.auth.admin_token = ADMIN.to_string();
        let state = AppState::new(config);

        let req = post_json(
            "/api/admin/control",
            None,
            serde_json::json!({"command": "shutdown", "admin_token": ADMIN}),
        );
        let (status, body) = send(router(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["alert"].is_string());

        let (_, body) = send(router(state), get_req("/api/devices", None)).await;
        let devices = body["devices"].as_array().unwrap();
        assert!(devices.iter().all(|d| d["status"] == "OFFLINE"));
    }

    #[tokio::test]
    async fn test_admin_control_rejects_and_unknown() {
        let req = post_json(
            "/api/admin/control",
            None,
            serde_json::json!({"command": "shutdown", "admin_token": "nope"}),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let req = post_json(
            "/api/admin/control",
            None,
            serde_json::json!({"command": "reboot", "admin_token": ADMIN}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_simulate_disabled() {
        let req = post_json(
            "/api/simulate",
            Some(OPERATOR),
            serde_json::json!({"scenario": "grid_cascade"}),
        );
        let (status, body) = send(app_with(false), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Simulations are disabled");
    }

    #[tokio::test]
    async fn test_simulate_scenario() {
        let req = post_json(
            "/api/simulate",
            Some(OPERATOR),
            serde_json::json!({"scenario": "transport_deadlock"}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_command_restart() {
        let req = post_json(
            "/api/command",
            Some(OPERATOR),
            serde_json::json!({"action": "restart", "target": "th-1"}),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Device th-1 restarted (simulation)");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app_with(false), get_req("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert_eq!(body["simulation_mode"], false);
    }
}
