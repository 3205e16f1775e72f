//! Gridwatch Client - Typed access to the Gridwatch backend
//!
//! The dashboard talks to the backend only through the [`Backend`] trait, so
//! the control loop can be driven by the HTTP client in production and by an
//! in-memory double in tests.

pub mod api;
pub mod http;

pub use api::{
    ApiError, Backend, ControlResponse, DevicesResponse, ErrorDetail, MessageResponse,
    INVALID_BODY,
};
pub use http::HttpBackend;
