//! Cluster readiness library
//!
//! This crate provides the core functionality for:
//! - Parsing Kubernetes CPU, memory and version strings
//! - Aggregating node capacity against pod requests
//! - Auditing RBAC permissions through self-subject access reviews
//! - Mapping permission results to per-application feasibility
//! - Composing everything into a single readiness report

pub mod applications;
pub mod checker;
pub mod cluster;
pub mod error;
pub mod observability;
pub mod permissions;
pub mod quantity;
pub mod report;
pub mod resources;
pub mod retry;
pub mod storage;
pub mod version;

pub use applications::{map_feasibility, Application, ApplicationFeasibility, FeasibilityPolicy};
pub use checker::{check_cluster, CheckOptions};
pub use cluster::{ClusterApi, KubeCluster};
pub use error::{ClusterError, FormatError, ReadinessError};
pub use observability::CheckLogger;
pub use quantity::{parse_cpu, parse_memory, CpuCores, MemoryKib, RawQuantity};
pub use report::{CheckCategory, CheckOutcome, CheckStatus, ReadinessReport};
pub use resources::{ClusterResourceSummary, ResourceThresholds};
pub use retry::RetryConfig;
pub use version::{parse_version, VersionCheck, VersionSpec};
