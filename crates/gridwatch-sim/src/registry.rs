//! In-memory device fleet
//!
//! The registry is the simulator's only state. Every operation takes the
//! write lock for its whole duration, so readers never see a half-applied
//! scenario.

use chrono::{Local, Utc};
use gridwatch_core::device::{
    DEFAULT_POWER_LEVEL, DEFAULT_TEMPERATURE, DEFAULT_VOLTAGE, MAX_LOAD,
};
use gridwatch_core::{AdminCommand, DeviceId, DeviceRecord, DeviceStatus};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::pulse::Noise;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Device {0} not found")]
    DeviceNotFound(String),
}

/// What an admin command did, for the response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOutcome {
    pub message: String,
    pub alert: String,
}

const PULSE_STATUSES: [DeviceStatus; 3] = [
    DeviceStatus::Ok,
    DeviceStatus::Warning,
    DeviceStatus::Degraded,
];

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn touch(device: &mut DeviceRecord) {
    device.last_seen = Some(Utc::now().timestamp());
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn seed(id: &str, kind: &str, name: &str, location: &str, role: &str) -> DeviceRecord {
    let mut device = DeviceRecord::new(id, name);
    device.kind = kind.to_string();
    device.location = location.to_string();
    device.role = role.to_string();
    device.load = 10.0;
    device.power_level = Some(DEFAULT_POWER_LEVEL);
    device.voltage = Some(DEFAULT_VOLTAGE);
    device.temperature = Some(DEFAULT_TEMPERATURE);
    touch(&mut device);
    device
}

#[derive(Debug, Default)]
pub struct Registry {
    devices: RwLock<Vec<DeviceRecord>>,
}

impl Registry {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard four-device fleet
    pub fn seeded() -> Self {
        let devices = vec![
            seed("pp-1", "power", "Alpha Power Plant", "North District 1", "Generation"),
            seed("ss-1", "substation", "North Substation", "North District 2", "Distribution"),
            seed("th-1", "transport", "Central Rail Hub", "Central Station", "Transport Hub"),
            seed("rad-1", "defense", "East Radar", "East Ridge", "Surveillance"),
        ];
        Self {
            devices: RwLock::new(devices),
        }
    }

    #[cfg(test)]
    pub async fn insert(&self, device: DeviceRecord) {
        let mut devices = self.devices.write().await;
        match devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => *existing = device,
            None => devices.push(device),
        }
    }

    /// Snapshot of the fleet in insertion order
    pub async fn list(&self) -> Vec<DeviceRecord> {
        self.devices
            .read()
            .await
            .iter()
            .map(|d| {
                let mut d = d.clone();
                d.load = round2(d.load);
                d.temperature = d.temperature.map(round2);
                d
            })
            .collect()
    }

    async fn with_device<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut DeviceRecord) -> R,
    ) -> Result<R, RegistryError> {
        let id = DeviceId::new(id);
        let mut devices = self.devices.write().await;
        let device = devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| RegistryError::DeviceNotFound(id.to_string()))?;
        Ok(f(device))
    }

    /// Set power and nudge load toward it
    pub async fn adjust_power(&self, id: &str, power_level: u8) -> Result<(), RegistryError> {
        self.with_device(id, |d| {
            d.power_level = Some(power_level);
            d.extra.insert(
                "power_adjusted".to_string(),
                format!("Power set to {}%", power_level),
            );
            d.load = (d.load + (power_level as f64 - 75.0) / 10.0).clamp(5.0, MAX_LOAD);
            debug!(device = %d.id, power_level, load = d.load, "Power adjusted");
        })
        .await
    }

    pub async fn adjust_voltage(&self, id: &str, voltage: u8) -> Result<(), RegistryError> {
        self.with_device(id, |d| {
            d.voltage = Some(voltage);
            d.extra.insert(
                "voltage_adjusted".to_string(),
                format!("Voltage set to {}%", voltage),
            );
            debug!(device = %d.id, voltage, "Voltage adjusted");
        })
        .await
    }

    pub async fn restart(&self, id: &str) -> Result<(), RegistryError> {
        self.with_device(id, |d| {
            d.status = DeviceStatus::Ok;
            d.load = (d.load * 0.6).max(5.0);
            d.extra
                .insert("note".to_string(), "Restarted by operator".to_string());
            touch(d);
        })
        .await
    }

    pub async fn isolate(&self, id: &str) -> Result<(), RegistryError> {
        self.with_device(id, |d| {
            d.status = DeviceStatus::Degraded;
            d.extra.insert(
                "note".to_string(),
                "Isolated for investigation".to_string(),
            );
        })
        .await
    }

    /// Overload generation and distribution
    pub async fn grid_cascade<N: Noise>(&self, noise: &mut N) {
        let mut devices = self.devices.write().await;
        for d in devices
            .iter_mut()
            .filter(|d| d.kind == "power" || d.kind == "substation")
        {
            d.load = (d.load + noise.uniform(15.0, 40.0)).min(MAX_LOAD);
            d.status = if d.load < 90.0 {
                DeviceStatus::Warning
            } else {
                DeviceStatus::Offline
            };
            touch(d);
        }
        if let Some(pp) = devices.iter_mut().find(|d| d.id.as_str() == "pp-1") {
            pp.extra.insert(
                "cascade_note".to_string(),
                format!("Overload started {}", timestamp()),
            );
        }
        info!("Grid cascade applied");
    }

    pub async fn spoof_telemetry(&self) {
        let _ = self
            .with_device("th-1", |d| {
                d.extra
                    .insert("spoofed_route".to_string(), "true".to_string());
                d.status = DeviceStatus::Warning;
                touch(d);
            })
            .await;
    }

    pub async fn transport_deadlock(&self) {
        let _ = self
            .with_device("th-1", |d| {
                d.status = DeviceStatus::Offline;
                d.extra.insert(
                    "deadlock_note".to_string(),
                    "Conflicting interlock rules between systems".to_string(),
                );
                touch(d);
            })
            .await;
    }

    /// Apply a fleet-wide admin command
    pub async fn admin(&self, command: AdminCommand) -> Result<AdminOutcome, RegistryError> {
        let mut devices = self.devices.write().await;
        let stamp = timestamp();
        let outcome = match command {
            AdminCommand::Shutdown => {
                for d in devices.iter_mut() {
                    d.status = DeviceStatus::Offline;
                    d.extra.insert(
                        "shutdown_note".to_string(),
                        format!("Emergency shutdown executed {}", stamp),
                    );
                    d.load = (d.load - 30.0).max(0.0);
                    touch(d);
                }
                AdminOutcome {
                    message: "Grid shut down, devices switched to OFFLINE".to_string(),
                    alert: "EMERGENCY SHUTDOWN: system unavailable".to_string(),
                }
            }
            AdminCommand::Isolate => {
                let target = "ss-1";
                let ss = devices
                    .iter_mut()
                    .find(|d| d.id.as_str() == target)
                    .ok_or_else(|| RegistryError::DeviceNotFound(target.to_string()))?;
                ss.status = DeviceStatus::Offline;
                ss.extra.insert(
                    "isolate_note".to_string(),
                    format!("Isolated by operator {}", stamp),
                );
                touch(ss);
                if let Some(pp) = devices.iter_mut().find(|d| d.id.as_str() == "pp-1") {
                    pp.load = (pp.load + 15.0).min(MAX_LOAD);
                    pp.extra.insert(
                        "isolate_impact".to_string(),
                        format!("Load raised after isolating {}", target),
                    );
                }
                AdminOutcome {
                    message: format!("Substation {} isolated and switched to OFFLINE", target),
                    alert: "Substation isolated, local outages possible".to_string(),
                }
            }
            AdminCommand::CompromiseAll => {
                for d in devices.iter_mut() {
                    d.status = DeviceStatus::Compromised;
                    d.extra.insert(
                        "compromise_note".to_string(),
                        format!("Mass compromise recorded {}", stamp),
                    );
                    d.load = (d.load - 10.0).max(0.0);
                    touch(d);
                }
                AdminOutcome {
                    message: "All devices marked COMPROMISED".to_string(),
                    alert: "All devices compromised, investigation required".to_string(),
                }
            }
        };
        info!(command = %command, "Admin command applied");
        Ok(outcome)
    }

    /// One telemetry tick; returns how many devices changed status
    pub async fn pulse<N: Noise>(&self, noise: &mut N) -> usize {
        let mut devices = self.devices.write().await;
        let mut flipped = 0;
        for d in devices.iter_mut() {
            d.load = (d.load + noise.uniform(-3.0, 3.0)).clamp(0.0, MAX_LOAD);
            d.temperature = Some(20.0 + d.load / MAX_LOAD * 40.0 + noise.uniform(-2.0, 2.0));
            if noise.chance(0.02) {
                if let Some(status) = noise.pick(&PULSE_STATUSES) {
                    if d.status != *status {
                        flipped += 1;
                    }
                    d.status = *status;
                }
            }
            touch(d);
        }
        flipped
    }
}
