//! Cluster-wide resource accounting
//!
//! Sums node capacity and container requests from a single snapshot of the
//! cluster and derives what is left. Nothing here talks to the API server.

use crate::error::FormatError;
use crate::quantity::{CpuCores, MemoryKib};
use serde::{Deserialize, Serialize};

/// Node capacity as reported by the API server, before parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

/// Resource requests of one container, before parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRequests {
    pub name: String,
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

/// A pod and the requests of its containers, before parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSnapshot {
    pub namespace: String,
    pub name: String,
    pub containers: Vec<ContainerRequests>,
}

/// Parsed capacity of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCapacity {
    pub name: String,
    pub cpu: CpuCores,
    pub memory: MemoryKib,
}

impl NodeCapacity {
    /// Parse a node's capacity; absent or empty fields count as zero
    pub fn from_snapshot(node: &NodeSnapshot) -> Result<Self, FormatError> {
        let location = format!("node/{}", node.name);
        Ok(Self {
            name: node.name.clone(),
            cpu: parse_cpu_field(node.cpu.as_deref(), &location)?,
            memory: parse_memory_field(node.memory.as_deref(), &location)?,
        })
    }
}

/// Parsed requests of one pod, summed over its containers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodRequest {
    pub namespace: String,
    pub name: String,
    pub cpu: CpuCores,
    pub memory: MemoryKib,
}

impl PodRequest {
    /// Parse and sum a pod's container requests; absent fields count as zero
    pub fn from_snapshot(pod: &PodSnapshot) -> Result<Self, FormatError> {
        let mut cpu = CpuCores::default();
        let mut memory = MemoryKib::default();

        for container in &pod.containers {
            let location = format!(
                "pod/{}/{} container {}",
                pod.namespace, pod.name, container.name
            );
            cpu = cpu + parse_cpu_field(container.cpu.as_deref(), &location)?;
            memory = memory + parse_memory_field(container.memory.as_deref(), &location)?;
        }

        Ok(Self {
            namespace: pod.namespace.clone(),
            name: pod.name.clone(),
            cpu,
            memory,
        })
    }
}

fn parse_cpu_field(value: Option<&str>, location: &str) -> Result<CpuCores, FormatError> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => CpuCores::parse(v).map_err(|e| e.located(location)),
        None => Ok(CpuCores::default()),
    }
}

fn parse_memory_field(value: Option<&str>, location: &str) -> Result<MemoryKib, FormatError> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => MemoryKib::parse(v).map_err(|e| e.located(location)),
        None => Ok(MemoryKib::default()),
    }
}

/// Cluster-wide capacity, requests and headroom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterResourceSummary {
    pub node_count: usize,
    pub pod_count: usize,
    pub total_cpu: CpuCores,
    pub used_cpu: CpuCores,
    /// `total_cpu - used_cpu`; negative when the cluster is over-committed
    pub available_cpu: CpuCores,
    pub total_memory: MemoryKib,
    pub used_memory: MemoryKib,
    /// `total_memory - used_memory`; negative when the cluster is over-committed
    pub available_memory: MemoryKib,
}

impl ClusterResourceSummary {
    /// Aggregate a snapshot. A single malformed quantity fails the whole
    /// computation; there is no partial result.
    pub fn compute(nodes: &[NodeSnapshot], pods: &[PodSnapshot]) -> Result<Self, FormatError> {
        let capacities = nodes
            .iter()
            .map(NodeCapacity::from_snapshot)
            .collect::<Result<Vec<_>, _>>()?;
        let requests = pods
            .iter()
            .map(PodRequest::from_snapshot)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_parsed(&capacities, &requests))
    }

    /// Aggregate already-parsed capacities and requests
    pub fn from_parsed(nodes: &[NodeCapacity], pods: &[PodRequest]) -> Self {
        let total_cpu: CpuCores = nodes.iter().map(|n| n.cpu).sum();
        let total_memory: MemoryKib = nodes.iter().map(|n| n.memory).sum();
        let used_cpu: CpuCores = pods.iter().map(|p| p.cpu).sum();
        let used_memory: MemoryKib = pods.iter().map(|p| p.memory).sum();

        Self {
            node_count: nodes.len(),
            pod_count: pods.len(),
            total_cpu,
            used_cpu,
            available_cpu: total_cpu - used_cpu,
            total_memory,
            used_memory,
            available_memory: total_memory - used_memory,
        }
    }

    pub fn is_overcommitted(&self) -> bool {
        self.available_cpu.cores() < 0.0 || self.available_memory.kib() < 0
    }
}

/// Minimum headroom a deployment needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceThresholds {
    pub min_cpu_cores: f64,
    /// Expressed in GB, computed as KiB / (1024 * 1024)
    pub min_memory_gb: f64,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self {
            min_cpu_cores: 4.0,
            min_memory_gb: 16.0,
        }
    }
}

/// Headroom compared against thresholds. Shortfalls are warnings, never
/// hard failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAssessment {
    pub summary: ClusterResourceSummary,
    pub thresholds: ResourceThresholds,
    pub cpu_sufficient: bool,
    pub memory_sufficient: bool,
}

impl ResourceAssessment {
    pub fn evaluate(summary: ClusterResourceSummary, thresholds: ResourceThresholds) -> Self {
        Self {
            cpu_sufficient: summary.available_cpu.cores() >= thresholds.min_cpu_cores,
            memory_sufficient: summary.available_memory.as_gib() >= thresholds.min_memory_gb,
            summary,
            thresholds,
        }
    }

    pub fn is_sufficient(&self) -> bool {
        self.cpu_sufficient && self.memory_sufficient
    }
}
