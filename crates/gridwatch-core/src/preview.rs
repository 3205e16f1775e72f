//! Speculative values from in-progress slider drags
//!
//! Kept apart from the authoritative snapshot and merged only when charts are
//! projected. The whole layer is discarded whenever a snapshot is applied.

use std::collections::BTreeMap;

use crate::device::DeviceId;

/// Temperature shown while dragging the voltage slider
pub fn voltage_preview_temperature(voltage: u8) -> f64 {
    (20.0 + (voltage as f64 / 100.0) * 60.0).trunc().max(0.0)
}

/// Unconfirmed chart overrides for one device
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DevicePreview {
    pub power_level: Option<u8>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewLayer {
    devices: BTreeMap<DeviceId, DevicePreview>,
}

impl PreviewLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_power(&mut self, id: &DeviceId, power_level: u8) {
        self.devices.entry(id.clone()).or_default().power_level = Some(power_level);
    }

    /// Record a voltage drag as its temperature preview
    pub fn set_voltage(&mut self, id: &DeviceId, voltage: u8) {
        self.devices.entry(id.clone()).or_default().temperature =
            Some(voltage_preview_temperature(voltage));
    }

    pub fn get(&self, id: &DeviceId) -> Option<&DevicePreview> {
        self.devices.get(id)
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage_preview_temperature() {
        assert_eq!(voltage_preview_temperature(0), 20.0);
        assert_eq!(voltage_preview_temperature(50), 50.0);
        assert_eq!(voltage_preview_temperature(100), 80.0);
        assert_eq!(voltage_preview_temperature(33), 39.0);
    }

    #[test]
    fn test_power_and_voltage_share_entry() {
        let id = DeviceId::new("pp-1");
        let mut layer = PreviewLayer::new();
        layer.set_power(&id, 90);
        layer.set_voltage(&id, 50);
        let preview = layer.get(&id).unwrap();
        assert_eq!(preview.power_level, Some(90));
        assert_eq!(preview.temperature, Some(50.0));
        layer.clear();
        assert!(layer.is_empty());
    }
}
