//! View-model projection for the device list and charts
//!
//! [`project`] is a pure function of the snapshot and the preview layer:
//! the same inputs always yield an identical [`DashboardView`].

use serde::Serialize;

use crate::device::{DeviceRecord, DeviceStatus, MAX_LOAD, MAX_TEMPERATURE};
use crate::preview::PreviewLayer;
use crate::snapshot::Snapshot;

/// How a dataset is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Doughnut,
    Bar,
}

/// One row of the device list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceListItem {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub role: String,
    pub location: String,
    pub status: DeviceStatus,
    pub load: f64,
    pub extra: Vec<(String, String)>,
}

impl From<&DeviceRecord> for DeviceListItem {
    fn from(d: &DeviceRecord) -> Self {
        Self {
            id: d.id.0.clone(),
            name: d.name.clone(),
            kind: d.kind.clone(),
            role: d.role.clone(),
            location: d.location.clone(),
            status: d.status,
            load: d.load,
            extra: d.extra.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

/// Per-device numeric series, labelled by device name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub kind: ChartKind,
    pub label: &'static str,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

/// Device counts per status, always all five buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusHistogram {
    counts: [usize; 5],
}

impl StatusHistogram {
    pub fn from_devices(devices: &[DeviceRecord]) -> Self {
        let mut counts = [0usize; 5];
        for device in devices {
            counts[device.status.index()] += 1;
        }
        Self { counts }
    }

    pub fn count(&self, status: DeviceStatus) -> usize {
        self.counts[status.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Buckets in fixed order, including empty ones
    pub fn iter(&self) -> impl Iterator<Item = (DeviceStatus, usize)> + '_ {
        DeviceStatus::ALL.iter().map(move |s| (*s, self.counts[s.index()]))
    }
}

/// The four chart datasets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub load: Series,
    pub status: StatusHistogram,
    pub power: Series,
    pub temperature: Series,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub devices: Vec<DeviceListItem>,
    pub charts: ChartSet,
}

/// Derive the list and chart view-models from current state
pub fn project(snapshot: &Snapshot, preview: &PreviewLayer) -> DashboardView {
    let devices = snapshot.devices();
    let labels: Vec<String> = devices.iter().map(|d| d.name.clone()).collect();

    let load = Series {
        kind: ChartKind::Line,
        label: "Load",
        labels: labels.clone(),
        values: devices.iter().map(|d| d.load).collect(),
        min: 0.0,
        max: MAX_LOAD,
    };

    let power = Series {
        kind: ChartKind::Bar,
        label: "Power",
        labels: labels.clone(),
        values: devices
            .iter()
            .map(|d| {
                preview
                    .get(&d.id)
                    .and_then(|p| p.power_level)
                    .unwrap_or_else(|| d.power_level()) as f64
            })
            .collect(),
        min: 0.0,
        max: 100.0,
    };

    let temperature = Series {
        kind: ChartKind::Line,
        label: "Temperature",
        labels,
        values: devices
            .iter()
            .map(|d| {
                preview
                    .get(&d.id)
                    .and_then(|p| p.temperature)
                    .unwrap_or_else(|| d.temperature())
            })
            .collect(),
        min: 0.0,
        max: MAX_TEMPERATURE,
    };

    DashboardView {
        devices: devices.iter().map(DeviceListItem::from).collect(),
        charts: ChartSet {
            load,
            status: StatusHistogram::from_devices(devices),
            power,
            temperature,
        },
    }
}
