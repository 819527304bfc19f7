//! Storage inspection for the database workloads
//!
//! Warn-only: volume usage above 80% or the absence of a storage class
//! backed by a database-friendly provisioner produce warnings but never fail
//! a readiness run.

use crate::error::FormatError;
use crate::quantity::MemoryKib;
use serde::{Deserialize, Serialize};

/// Usage percentage above which storage is reported as limited
pub const USAGE_WARNING_PERCENT: f64 = 80.0;

/// Provisioner name fragments known to back block or file storage suitable
/// for MongoDB and PostgreSQL
pub const COMPATIBLE_PROVISIONERS: &[&str] =
    &["ebs", "azure", "gce", "csi", "nfs", "iscsi", "local"];

/// A persistent volume as reported by the API server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSnapshot {
    pub name: String,
    pub capacity: Option<String>,
    pub bound: bool,
}

/// A storage class as reported by the API server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClassSnapshot {
    pub name: String,
    pub provisioner: String,
}

impl StorageClassSnapshot {
    pub fn is_database_compatible(&self) -> bool {
        COMPATIBLE_PROVISIONERS
            .iter()
            .any(|fragment| self.provisioner.contains(fragment))
    }
}

/// Aggregate persistent volume capacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeUsage {
    pub total: MemoryKib,
    pub bound: MemoryKib,
}

impl VolumeUsage {
    pub fn compute(volumes: &[VolumeSnapshot]) -> Result<Self, FormatError> {
        let mut total = MemoryKib::default();
        let mut bound = MemoryKib::default();

        for volume in volumes {
            let capacity = match volume.capacity.as_deref().filter(|c| !c.is_empty()) {
                Some(c) => MemoryKib::parse(c)
                    .map_err(|e| e.located(format!("persistentvolume/{}", volume.name)))?,
                None => MemoryKib::default(),
            };
            total = total + capacity;
            if volume.bound {
                bound = bound + capacity;
            }
        }

        Ok(Self { total, bound })
    }

    /// Percentage of capacity claimed by bound volumes; `None` when no
    /// storage is configured
    pub fn usage_percent(&self) -> Option<f64> {
        if self.total.kib() == 0 {
            return None;
        }
        Some(self.bound.kib() as f64 / self.total.kib() as f64 * 100.0)
    }

    pub fn is_limited(&self) -> bool {
        self.usage_percent()
            .map(|p| p > USAGE_WARNING_PERCENT)
            .unwrap_or(false)
    }
}

/// Result of inspecting volumes and storage classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageAssessment {
    pub usage: VolumeUsage,
    pub compatible_classes: Vec<String>,
}

impl StorageAssessment {
    pub fn evaluate(
        volumes: &[VolumeSnapshot],
        classes: &[StorageClassSnapshot],
    ) -> Result<Self, FormatError> {
        Ok(Self {
            usage: VolumeUsage::compute(volumes)?,
            compatible_classes: classes
                .iter()
                .filter(|sc| sc.is_database_compatible())
                .map(|sc| sc.name.clone())
                .collect(),
        })
    }
}
