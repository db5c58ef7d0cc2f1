//! Scan results: peripherals seen during a single scanning session.

use serde::{Deserialize, Serialize};

use crate::id::PeripheralId;

/// Lifecycle of a BLE scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Starting,
    Started,
    Stopping,
    #[default]
    Stopped,
}

/// A peripheral seen in an advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedPeripheral {
    pub id: PeripheralId,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Last received signal strength, in dBm.
    pub signal_strength: Option<i16>,
}

impl ScannedPeripheral {
    /// Whether this peripheral advertises exactly `name`.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// Ordered collection of [`ScannedPeripheral`]s keyed by id.
///
/// First sightings are appended; later sightings replace the entry where it
/// already sits so a list UI stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResults {
    entries: Vec<ScannedPeripheral>,
}

impl ScanResults {
    /// Create an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `peripheral.id`.
    ///
    /// Returns the stored entry.
    pub fn upsert(&mut self, peripheral: ScannedPeripheral) -> &ScannedPeripheral {
        if let Some(idx) = self.entries.iter().position(|p| p.id == peripheral.id) {
            self.entries[idx] = peripheral;
            &self.entries[idx]
        } else {
            self.entries.push(peripheral);
            let last = self.entries.len() - 1;
            &self.entries[last]
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: &PeripheralId) -> Option<&ScannedPeripheral> {
        self.entries.iter().find(|p| &p.id == id)
    }

    /// All entries in first-seen order.
    #[must_use]
    pub fn as_slice(&self) -> &[ScannedPeripheral] {
        &self.entries
    }

    /// Entries advertising exactly `name`, in first-seen order.
    pub fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ScannedPeripheral> {
        self.entries.iter().filter(move |p| p.is_named(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
