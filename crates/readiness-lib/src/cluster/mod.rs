//! Access to the cluster being audited
//!
//! The readiness checks only see the cluster through [`ClusterApi`], which
//! hands back plain snapshots and answers authorization queries. The kube-rs
//! backed implementation lives in [`KubeCluster`]; tests plug in an in-memory one.

mod kubernetes;

pub use kubernetes::KubeCluster;

use crate::error::ClusterError;
use crate::resources::{NodeSnapshot, PodSnapshot};
use crate::storage::{StorageClassSnapshot, VolumeSnapshot};
use serde::{Deserialize, Serialize};

pub use async_trait::async_trait;

/// Resource attributes of a "can I do X?" query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAttributes {
    /// `None` for cluster-scoped resources
    pub namespace: Option<String>,
    pub verb: String,
    /// Empty for the core API group
    pub group: String,
    pub version: String,
    pub resource: String,
}

/// Answer from the authorization subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Read-only view of a cluster plus an authorization oracle
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Control-plane version string, e.g. `v1.28.3`
    async fn server_version(&self) -> Result<String, ClusterError>;

    /// All nodes with their reported capacity
    async fn list_nodes(&self) -> Result<Vec<NodeSnapshot>, ClusterError>;

    /// All pods across every namespace with their container requests
    async fn list_pods(&self) -> Result<Vec<PodSnapshot>, ClusterError>;

    /// All persistent volumes
    async fn list_persistent_volumes(&self) -> Result<Vec<VolumeSnapshot>, ClusterError>;

    /// All storage classes
    async fn list_storage_classes(&self) -> Result<Vec<StorageClassSnapshot>, ClusterError>;

    /// Ask whether the current caller may perform the described action
    async fn review_access(
        &self,
        attributes: &AccessAttributes,
    ) -> Result<AccessDecision, ClusterError>;
}
