//! Operator control-panel state machine
//!
//! The panel opens only after the backend accepts the operator token, and
//! closes again on the next submit without asking the backend. Handlers are
//! transition functions: [`ControlPanel::handle`] mutates the panel and
//! returns the effects the caller must carry out (network calls, preview
//! updates, notices). It never performs I/O itself.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::device::{DeviceId, DEFAULT_POWER_LEVEL, DEFAULT_VOLTAGE};
use crate::snapshot::Snapshot;

/// Fallback shown when a rejection carries no usable detail
pub const TOKEN_REJECTED: &str = "token rejected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Closed,
    /// A `validate_token` call is in flight
    Validating,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slider {
    Power,
    Voltage,
}

impl Slider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slider::Power => "power",
            Slider::Voltage => "voltage",
        }
    }
}

/// A committed operator change for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    Power { device_id: DeviceId, power_level: u8 },
    Voltage { device_id: DeviceId, voltage: u8 },
}

impl Mutation {
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Mutation::Power { device_id, .. } | Mutation::Voltage { device_id, .. } => device_id,
        }
    }

    pub fn slider(&self) -> Slider {
        match self {
            Mutation::Power { .. } => Slider::Power,
            Mutation::Voltage { .. } => Slider::Voltage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// Replace the token field's contents
    EditToken(String),
    /// The open/close form was submitted
    Submit,
    ValidationPassed,
    /// Backend answered non-2xx, with its `detail` if it had one
    ValidationRejected { detail: Option<String> },
    /// The validation call never got an answer
    ValidationFailed { error: String },
    SelectTarget(DeviceId),
    /// Continuous slider movement
    SliderInput { slider: Slider, value: u8 },
    /// Slider released
    SliderCommit { slider: Slider, value: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEffect {
    ValidateToken { token: String },
    /// Update the speculative chart layer for the device
    Preview { device_id: DeviceId, slider: Slider, value: u8 },
    Dispatch { mutation: Mutation, token: String },
    /// Raise a transient warning notification
    Warn(String),
    /// Replace the panel's inline result text
    Status(String),
}

#[derive(Debug, Clone)]
pub struct ControlPanel {
    state: PanelState,
    token: String,
    target: Option<DeviceId>,
    power: u8,
    voltage: u8,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            state: PanelState::Closed,
            token: String::new(),
            target: None,
            power: DEFAULT_POWER_LEVEL,
            voltage: DEFAULT_VOLTAGE,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PanelState::Open
    }

    /// Token field is read-only while open or validating
    pub fn token_editable(&self) -> bool {
        self.state == PanelState::Closed
    }

    /// Device selection is only enabled while open
    pub fn targeting_enabled(&self) -> bool {
        self.is_open()
    }

    pub fn sliders_visible(&self) -> bool {
        self.is_open()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn target(&self) -> Option<&DeviceId> {
        self.target.as_ref()
    }

    /// Current slider positions (power, voltage)
    pub fn sliders(&self) -> (u8, u8) {
        (self.power, self.voltage)
    }

    pub fn handle(&mut self, event: PanelEvent, snapshot: &Snapshot) -> Vec<PanelEffect> {
        match event {
            PanelEvent::EditToken(token) => self.edit_token(token),
            PanelEvent::Submit => self.submit(),
            PanelEvent::ValidationPassed => self.validation_passed(),
            PanelEvent::ValidationRejected { detail } => {
                let text = detail
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| TOKEN_REJECTED.to_string());
                self.validation_failed(text)
            }
            PanelEvent::ValidationFailed { error } => {
                self.validation_failed(format!("error: {}", error))
            }
            PanelEvent::SelectTarget(id) => self.select_target(id, snapshot),
            PanelEvent::SliderInput { slider, value } => self.slider_input(slider, value),
            PanelEvent::SliderCommit { slider, value } => self.slider_commit(slider, value),
        }
    }

    fn edit_token(&mut self, token: String) -> Vec<PanelEffect> {
        if !self.token_editable() {
            debug!(state = ?self.state, "Token edit refused");
            return vec![PanelEffect::Status(
                "operator token is locked while the panel is open".to_string(),
            )];
        }
        self.token = token;
        Vec::new()
    }

    fn submit(&mut self) -> Vec<PanelEffect> {
        match self.state {
            PanelState::Closed => {
                let token = self.token.trim();
                if token.is_empty() {
                    return vec![PanelEffect::Status("operator token required".to_string())];
                }
                self.state = PanelState::Validating;
                vec![PanelEffect::ValidateToken {
                    token: token.to_string(),
                }]
            }
            PanelState::Validating => {
                debug!("Submit ignored, validation already in flight");
                Vec::new()
            }
            PanelState::Open => {
                self.state = PanelState::Closed;
                info!("Control panel closed");
                vec![PanelEffect::Status("access closed".to_string())]
            }
        }
    }

    fn validation_passed(&mut self) -> Vec<PanelEffect> {
        if self.state != PanelState::Validating {
            warn!(state = ?self.state, "Unexpected token validation result");
            return Vec::new();
        }
        self.state = PanelState::Open;
        info!("Control panel opened");
        vec![PanelEffect::Status(
            "access granted, select a device".to_string(),
        )]
    }

    fn validation_failed(&mut self, text: String) -> Vec<PanelEffect> {
        if self.state == PanelState::Validating {
            self.state = PanelState::Closed;
        }
        warn!(reason = %text, "Operator token not accepted");
        vec![PanelEffect::Status(text)]
    }

    fn select_target(&mut self, id: DeviceId, snapshot: &Snapshot) -> Vec<PanelEffect> {
        if !self.targeting_enabled() {
            return vec![PanelEffect::Status(
                "open the control panel to select a device".to_string(),
            )];
        }
        let Some(device) = snapshot.get(&id) else {
            warn!(device = %id, "Target not in current snapshot");
            return vec![PanelEffect::Status(format!("unknown device {}", id))];
        };
        // Baseline copy; later polls do not move the sliders
        self.power = device.power_level();
        self.voltage = device.voltage();
        debug!(device = %id, power = self.power, voltage = self.voltage, "Target selected");
        self.target = Some(id);
        Vec::new()
    }

    fn slider_input(&mut self, slider: Slider, value: u8) -> Vec<PanelEffect> {
        let value = value.min(100);
        match slider {
            Slider::Power => self.power = value,
            Slider::Voltage => self.voltage = value,
        }
        match &self.target {
            Some(device_id) if self.sliders_visible() => vec![PanelEffect::Preview {
                device_id: device_id.clone(),
                slider,
                value,
            }],
            _ => Vec::new(),
        }
    }

    fn slider_commit(&mut self, slider: Slider, value: u8) -> Vec<PanelEffect> {
        let value = value.min(100);
        match slider {
            Slider::Power => self.power = value,
            Slider::Voltage => self.voltage = value,
        }

        let token = self.token.trim();
        if token.is_empty() {
            return vec![PanelEffect::Warn(format!(
                "operator token required to adjust {}",
                slider.as_str()
            ))];
        }
        let Some(device_id) = self.target.clone() else {
            return vec![PanelEffect::Warn("select a device".to_string())];
        };
        if !self.sliders_visible() {
            return vec![PanelEffect::Warn("control panel is closed".to_string())];
        }

        let mutation = match slider {
            Slider::Power => Mutation::Power {
                device_id,
                power_level: value,
            },
            Slider::Voltage => Mutation::Voltage {
                device_id,
                voltage: value,
            },
        };
        vec![PanelEffect::Dispatch {
            mutation,
            token: token.to_string(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceRecord;

    fn fleet() -> Snapshot {
        let mut a = DeviceRecord::new("pp-1", "Plant");
        a.power_level = Some(60);
        a.voltage = Some(40);
        let b = DeviceRecord::new("ss-1", "Substation");
        Snapshot::new(vec![a, b]).unwrap()
    }

    fn open_panel(token: &str, snap: &Snapshot) -> ControlPanel {
        let mut panel = ControlPanel::new();
        panel.handle(PanelEvent::EditToken(token.to_string()), snap);
        let effects = panel.handle(PanelEvent::Submit, snap);
        assert_eq!(
            effects,
            vec![PanelEffect::ValidateToken {
                token: token.to_string()
            }]
        );
        panel.handle(PanelEvent::ValidationPassed, snap);
        panel
    }

    fn count_calls(effects: &[PanelEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, PanelEffect::ValidateToken { .. } | PanelEffect::Dispatch { .. }))
            .count()
    }

    #[test]
    fn test_open_then_close_without_revalidation() {
        let snap = fleet();
        let mut panel = open_panel("abc", &snap);
        assert_eq!(panel.state(), PanelState::Open);
        assert!(!panel.token_editable());
        assert!(panel.targeting_enabled());

        let effects = panel.handle(PanelEvent::Submit, &snap);
        assert_eq!(count_calls(&effects), 0);
        assert_eq!(panel.state(), PanelState::Closed);
        assert!(panel.token_editable());
        assert!(!panel.sliders_visible());
    }

    #[test]
    fn test_empty_token_submit_makes_no_call() {
        let snap = fleet();
        let mut panel = ControlPanel::new();
        panel.handle(PanelEvent::EditToken("   ".to_string()), &snap);
        let effects = panel.handle(PanelEvent::Submit, &snap);
        assert_eq!(
            effects,
            vec![PanelEffect::Status("operator token required".to_string())]
        );
        assert_eq!(panel.state(), PanelState::Closed);
    }

    #[test]
    fn test_rejection_uses_server_detail_or_fallback() {
        let snap = fleet();
        let mut panel = ControlPanel::new();
        panel.handle(PanelEvent::EditToken("bad".to_string()), &snap);
        panel.handle(PanelEvent::Submit, &snap);
        let effects = panel.handle(
            PanelEvent::ValidationRejected {
                detail: Some("Invalid token".to_string()),
            },
            &snap,
        );
        assert_eq!(effects, vec![PanelEffect::Status("Invalid token".to_string())]);
        assert_eq!(panel.state(), PanelState::Closed);

        panel.handle(PanelEvent::Submit, &snap);
        let effects = panel.handle(PanelEvent::ValidationRejected { detail: None }, &snap);
        assert_eq!(effects, vec![PanelEffect::Status(TOKEN_REJECTED.to_string())]);
    }

    #[test]
    fn test_token_frozen_while_open() {
        let snap = fleet();
        let mut panel = open_panel("abc", &snap);
        panel.handle(PanelEvent::EditToken("other".to_string()), &snap);
        assert_eq!(panel.token(), "abc");
    }

    #[test]
    fn test_select_target_preloads_sliders() {
        let snap = fleet();
        let mut panel = open_panel("abc", &snap);
        panel.handle(PanelEvent::SelectTarget(DeviceId::new("pp-1")), &snap);
        assert_eq!(panel.sliders(), (60, 40));
        panel.handle(PanelEvent::SelectTarget(DeviceId::new("ss-1")), &snap);
        assert_eq!(panel.sliders(), (75, 50));
        assert_eq!(panel.target(), Some(&DeviceId::new("ss-1")));
    }

    #[test]
    fn test_select_target_requires_open_panel() {
        let snap = fleet();
        let mut panel = ControlPanel::new();
        panel.handle(PanelEvent::SelectTarget(DeviceId::new("pp-1")), &snap);
        assert!(panel.target().is_none());
    }

    #[test]
    fn test_slider_input_previews_without_dispatch() {
        let snap = fleet();
        let mut panel = open_panel("abc", &snap);
        panel.handle(PanelEvent::SelectTarget(DeviceId::new("pp-1")), &snap);
        let effects = panel.handle(
            PanelEvent::SliderInput {
                slider: Slider::Power,
                value: 90,
            },
            &snap,
        );
        assert_eq!(
            effects,
            vec![PanelEffect::Preview {
                device_id: DeviceId::new("pp-1"),
                slider: Slider::Power,
                value: 90
            }]
        );
        assert_eq!(count_calls(&effects), 0);
    }

    #[test]
    fn test_commit_dispatches_mutation() {
        let snap = fleet();
        let mut panel = open_panel("abc", &snap);
        panel.handle(PanelEvent::SelectTarget(DeviceId::new("pp-1")), &snap);
        let effects = panel.handle(
            PanelEvent::SliderCommit {
                slider: Slider::Voltage,
                value: 70,
            },
            &snap,
        );
        assert_eq!(
            effects,
            vec![PanelEffect::Dispatch {
                mutation: Mutation::Voltage {
                    device_id: DeviceId::new("pp-1"),
                    voltage: 70
                },
                token: "abc".to_string(),
            }]
        );
    }

    #[test]
    fn test_commit_without_target_warns() {
        let snap = fleet();
        let mut panel = open_panel("abc", &snap);
        let effects = panel.handle(
            PanelEvent::SliderCommit {
                slider: Slider::Power,
                value: 80,
            },
            &snap,
        );
        assert_eq!(effects, vec![PanelEffect::Warn("select a device".to_string())]);
    }

    #[test]
    fn test_commit_without_token_warns() {
        let snap = fleet();
        let mut panel = open_panel("abc", &snap);
        panel.handle(PanelEvent::SelectTarget(DeviceId::new("pp-1")), &snap);
        panel.handle(PanelEvent::Submit, &snap);
        panel.handle(PanelEvent::EditToken(String::new()), &snap);
        assert_eq!(panel.target(), Some(&DeviceId::new("pp-1")));

        let effects = panel.handle(
            PanelEvent::SliderCommit {
                slider: Slider::Power,
                value: 80,
            },
            &snap,
        );
        assert_eq!(count_calls(&effects), 0);
        assert!(matches!(effects.as_slice(), [PanelEffect::Warn(_)]));
    }

    #[test]
    fn test_submit_while_validating_is_ignored() {
        let snap = fleet();
        let mut panel = ControlPanel::new();
        panel.handle(PanelEvent::EditToken("abc".to_string()), &snap);
        panel.handle(PanelEvent::Submit, &snap);
        assert!(panel.handle(PanelEvent::Submit, &snap).is_empty());
        assert_eq!(panel.state(), PanelState::Validating);
    }
}
