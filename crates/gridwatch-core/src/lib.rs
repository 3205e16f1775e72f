//! Gridwatch Core - Device model and control-loop state for the Gridwatch dashboard
//!
//! This crate holds everything the dashboard decides without touching the
//! network:
//! - Device records and the authoritative snapshot store
//! - The speculative preview layer for unconfirmed slider drags
//! - View-model projection for the device list and charts
//! - Operator control-panel and admin authorization state machines
//! - Incident log and transient notifications

pub mod admin;
pub mod device;
pub mod incident;
pub mod notice;
pub mod preview;
pub mod projector;
pub mod session;
pub mod snapshot;

pub use admin::{AdminCommand, AdminGate, GateEffect, GateEvent, GateState};
pub use device::{DeviceId, DeviceRecord, DeviceStatus};
pub use incident::{IncidentLog, LogEntry, LogSource};
pub use notice::{Notice, NoticeLevel, Notices};
pub use preview::PreviewLayer;
pub use projector::{project, ChartSet, DashboardView, DeviceListItem, Series, StatusHistogram};
pub use session::{ControlPanel, Mutation, PanelEffect, PanelEvent, PanelState, Slider};
pub use snapshot::{ApplyOutcome, Snapshot, SnapshotError, SnapshotStore};
