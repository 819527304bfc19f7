//! Structured logging for readiness runs
//!
//! The library never installs a subscriber; the binary decides where events
//! go and at what verbosity.

use crate::applications::{ApplicationFeasibility, FeasibilityPolicy};
use crate::permissions::PermissionResult;
use crate::report::ReadinessReport;
use crate::resources::ResourceAssessment;
use crate::storage::StorageAssessment;
use crate::version::VersionCheck;
use tracing::{debug, error, info, warn};

/// Structured logger for check events
///
/// Every event carries the target namespace and an `event` field so JSON log
/// output can be filtered per step.
#[derive(Debug, Clone)]
pub struct CheckLogger {
    namespace: String,
}

impl CheckLogger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn log_run_started(&self, min_version: &str, policy: FeasibilityPolicy) {
        info!(
            event = "check_started",
            namespace = %self.namespace,
            min_version = %min_version,
            feasibility = ?policy,
            "Starting cluster readiness check"
        );
    }

    pub fn log_connected(&self) {
        debug!(
            event = "cluster_connected",
            namespace = %self.namespace,
            "Connected to Kubernetes cluster"
        );
    }

    pub fn log_version(&self, check: &VersionCheck) {
        if check.passed {
            info!(
                event = "version_checked",
                namespace = %self.namespace,
                reported = %check.reported,
                minimum = %check.minimum,
                passed = true,
                "Kubernetes version is compatible"
            );
        } else {
            warn!(
                event = "version_checked",
                namespace = %self.namespace,
                reported = %check.reported,
                minimum = %check.minimum,
                passed = false,
                "Kubernetes version is below the minimum"
            );
        }
    }

    pub fn log_resources(&self, assessment: &ResourceAssessment) {
        let summary = &assessment.summary;
        info!(
            event = "resources_checked",
            namespace = %self.namespace,
            nodes = summary.node_count,
            pods = summary.pod_count,
            total_cpu_cores = summary.total_cpu.cores(),
            used_cpu_cores = summary.used_cpu.cores(),
            available_cpu_cores = summary.available_cpu.cores(),
            total_memory_kib = summary.total_memory.kib(),
            used_memory_kib = summary.used_memory.kib(),
            available_memory_kib = summary.available_memory.kib(),
            sufficient = assessment.is_sufficient(),
            "Aggregated cluster resources"
        );
        if summary.is_overcommitted() {
            warn!(
                event = "resources_overcommitted",
                namespace = %self.namespace,
                "Pod requests exceed node capacity"
            );
        }
    }

    pub fn log_storage(&self, assessment: &StorageAssessment) {
        info!(
            event = "storage_checked",
            namespace = %self.namespace,
            usage_percent = ?assessment.usage.usage_percent(),
            compatible_classes = assessment.compatible_classes.len(),
            "Inspected persistent storage"
        );
    }

    pub fn log_storage_unavailable(&self, reason: &str) {
        warn!(
            event = "storage_unavailable",
            namespace = %self.namespace,
            reason = %reason,
            "Could not inspect persistent storage"
        );
    }

    pub fn log_permission(&self, result: &PermissionResult) {
        let check = &result.check;
        if result.allowed {
            debug!(
                event = "permission_checked",
                namespace = %self.namespace,
                verb = %check.verb.as_str(),
                resource = %check.kind,
                group = %check.api_group,
                allowed = true,
                "Permission granted"
            );
        } else if result.query_failed {
            warn!(
                event = "permission_query_failed",
                namespace = %self.namespace,
                verb = %check.verb.as_str(),
                resource = %check.kind,
                group = %check.api_group,
                error = ?result.reason,
                "Access review failed"
            );
        } else {
            info!(
                event = "permission_checked",
                namespace = %self.namespace,
                verb = %check.verb.as_str(),
                resource = %check.kind,
                group = %check.api_group,
                allowed = false,
                reason = ?result.reason,
                "Permission denied"
            );
        }
    }

    pub fn log_application(&self, app: &ApplicationFeasibility) {
        info!(
            event = "application_assessed",
            namespace = %self.namespace,
            application = %app.application,
            feasible = app.feasible,
            blocking_kinds = ?app.blocking_kinds,
            "Assessed application feasibility"
        );
    }

    pub fn log_aborted(&self, step: &str, reason: &str) {
        error!(
            event = "check_aborted",
            namespace = %self.namespace,
            step = %step,
            reason = %reason,
            "Readiness check aborted"
        );
    }

    pub fn log_run_finished(&self, report: &ReadinessReport) {
        info!(
            event = "check_finished",
            namespace = %self.namespace,
            success = report.success,
            outcomes = report.checks.len(),
            warnings = report.warnings().count(),
            aborted = report.aborted.is_some(),
            "Cluster readiness check finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_logger_creation() {
        let logger = CheckLogger::new("dynamo");
        assert_eq!(logger.namespace(), "dynamo");
    }

    #[test]
    fn test_logging_without_subscriber_is_silent() {
        let logger = CheckLogger::new("dynamo");
        logger.log_run_started("1.22.0", FeasibilityPolicy::Coarse);
        logger.log_version(&VersionCheck::evaluate("v1.28.2", "1.22.0"));
        logger.log_storage_unavailable("forbidden");
        logger.log_aborted("version", "timed out");
    }
}
