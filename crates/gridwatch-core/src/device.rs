//! Device records as reported by the backend

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Power level shown when the backend omits one
pub const DEFAULT_POWER_LEVEL: u8 = 75;
/// Voltage shown when the backend omits one
pub const DEFAULT_VOLTAGE: u8 = 50;
/// Temperature shown when the backend omits one
pub const DEFAULT_TEMPERATURE: f64 = 35.0;

/// Load scale upper bound (percent, overload allowed)
pub const MAX_LOAD: f64 = 120.0;
/// Temperature scale upper bound
pub const MAX_TEMPERATURE: f64 = 80.0;

/// Stable device identifier, used to correlate records across polls
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Operational status of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Ok,
    Warning,
    Offline,
    Degraded,
    Compromised,
}

impl DeviceStatus {
    /// Every status, in histogram order
    pub const ALL: [DeviceStatus; 5] = [
        DeviceStatus::Ok,
        DeviceStatus::Warning,
        DeviceStatus::Offline,
        DeviceStatus::Degraded,
        DeviceStatus::Compromised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Ok => "OK",
            DeviceStatus::Warning => "WARNING",
            DeviceStatus::Offline => "OFFLINE",
            DeviceStatus::Degraded => "DEGRADED",
            DeviceStatus::Compromised => "COMPROMISED",
        }
    }

    /// Position of this status in [`DeviceStatus::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::Ok
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitored device as of a single poll
///
/// `power_level`, `voltage` and `temperature` keep the wire's absence; use the
/// accessor methods for display values. Percentages arrive as any JSON number
/// and are rounded to whole slider positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub load: f64,
    #[serde(
        default,
        deserialize_with = "percent",
        skip_serializing_if = "Option::is_none"
    )]
    pub power_level: Option<u8>,
    #[serde(
        default,
        deserialize_with = "percent",
        skip_serializing_if = "Option::is_none"
    )]
    pub voltage: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Unix seconds of the backend's last contact with the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(default, deserialize_with = "extra_as_strings")]
    pub extra: BTreeMap<String, String>,
}

impl DeviceRecord {
    /// Create a record with the given identity and defaults elsewhere
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(id),
            name: name.into(),
            kind: String::new(),
            role: String::new(),
            location: String::new(),
            status: DeviceStatus::Ok,
            load: 0.0,
            power_level: None,
            voltage: None,
            temperature: None,
            last_seen: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn power_level(&self) -> u8 {
        self.power_level.unwrap_or(DEFAULT_POWER_LEVEL)
    }

    pub fn voltage(&self) -> u8 {
        self.voltage.unwrap_or(DEFAULT_VOLTAGE)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}

/// Round a numeric percentage into `0..=100`
fn percent<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.map(|v| v.round().clamp(0.0, 100.0) as u8))
}

/// Accept any JSON scalar as an `extra` value; the dashboard only displays them
fn extra_as_strings<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_absent() {
        let json = r#"{"id":"d1","name":"Plant","status":"OK","load":40}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.power_level(), 75);
        assert_eq!(device.voltage(), 50);
        assert_eq!(device.temperature(), 35.0);
        assert!(device.extra.is_empty());
    }

    #[test]
    fn test_zero_power_is_kept() {
        let json = r#"{"id":"d1","name":"Plant","power_level":0,"voltage":0}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.power_level(), 0);
        assert_eq!(device.voltage(), 0);
    }

    #[test]
    fn test_fractional_percentages_accepted() {
        let json = r#"{"id":"d1","name":"Plant","power_level":75.0,"voltage":62.5}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.power_level(), 75);
        assert_eq!(device.voltage(), 63);

        let json = r#"{"id":"d1","name":"Plant","power_level":140,"voltage":-3}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.power_level(), 100);
        assert_eq!(device.voltage(), 0);
    }

    #[test]
    fn test_null_percentage_uses_default() {
        let json = r#"{"id":"d1","name":"Plant","power_level":null}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.power_level, None);
        assert_eq!(device.power_level(), 75);
    }

    #[test]
    fn test_status_wire_names() {
        let status: DeviceStatus = serde_json::from_str("\"COMPROMISED\"").unwrap();
        assert_eq!(status, DeviceStatus::Compromised);
        assert_eq!(serde_json::to_string(&DeviceStatus::Ok).unwrap(), "\"OK\"");
        assert!(serde_json::from_str::<DeviceStatus>("\"BROKEN\"").is_err());
    }

    #[test]
    fn test_extra_values_are_stringified() {
        let json = r#"{"id":"th-1","name":"Hub","extra":{"spoofed_route":true,"note":"rerouted","n":3,"z":null}}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.extra["spoofed_route"], "true");
        assert_eq!(device.extra["note"], "rerouted");
        assert_eq!(device.extra["n"], "3");
        assert_eq!(device.extra["z"], "");
    }

    #[test]
    fn test_status_index_matches_order() {
        for (i, status) in DeviceStatus::ALL.iter().enumerate() {
            assert_eq!(status.index(), i);
        }
    }
}
