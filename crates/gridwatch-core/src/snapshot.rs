//! Authoritative device snapshot and its store
//!
//! A snapshot is the full device list from one successful poll. The store
//! holds exactly one and replaces it wholesale; there is no merging.
//!
//! Poll responses may arrive out of issuance order, so every poll carries a
//! sequence number handed out by [`SnapshotStore::issue`]. A response is only
//! applied when its number is newer than the last applied one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::device::{DeviceId, DeviceRecord};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Duplicate device id in snapshot: {0}")]
    DuplicateId(DeviceId),
}

/// Ordered, id-unique list of device records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    devices: Vec<DeviceRecord>,
}

impl Snapshot {
    /// Build a snapshot, rejecting lists that repeat an id
    pub fn new(devices: Vec<DeviceRecord>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(devices.len());
        for device in &devices {
            if !seen.insert(&device.id) {
                return Err(SnapshotError::DuplicateId(device.id.clone()));
            }
        }
        Ok(Self { devices })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn get(&self, id: &DeviceId) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| &d.id == id)
    }

    /// Index of a device in snapshot order (chart position)
    pub fn position(&self, id: &DeviceId) -> Option<usize> {
        self.devices.iter().position(|d| &d.id == id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Result of offering a poll response to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot replaced the previous one
    Applied,
    /// A newer poll was already applied; the response was dropped
    Stale { latest: u64 },
}

/// Single-writer holder of the latest snapshot
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Snapshot,
    next_seq: u64,
    applied_seq: Option<u64>,
    updated_at: Option<DateTime<Utc>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the sequence number for a poll about to be issued
    pub fn issue(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Replace the snapshot if `seq` is newer than the last applied poll
    pub fn apply(&mut self, seq: u64, snapshot: Snapshot) -> ApplyOutcome {
        if let Some(latest) = self.applied_seq {
            if seq <= latest {
                debug!(seq, latest, "Dropping stale poll response");
                return ApplyOutcome::Stale { latest };
            }
        }
        self.current = snapshot;
        self.applied_seq = Some(seq);
        self.updated_at = Some(Utc::now());
        ApplyOutcome::Applied
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn applied_seq(&self) -> Option<u64> {
        self.applied_seq
    }

    /// When the current snapshot landed, if any has
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}
