//! Readiness report assembly
//!
//! Each check contributes one or more ordered outcomes. Overall success is
//! derived once the run finishes: any `Fail` outcome or an aborted run fails
//! it, `Warn` outcomes never do.

use crate::applications::ApplicationFeasibility;
use crate::permissions::PermissionAudit;
use crate::resources::ResourceAssessment;
use crate::storage::StorageAssessment;
use crate::version::VersionCheck;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single outcome line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Which part of the run produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckCategory {
    Connectivity,
    Version,
    Resources,
    Storage,
    Permission,
    Application,
    Network,
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub category: CheckCategory,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckOutcome {
    pub fn pass(category: CheckCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: CheckStatus::Pass,
            message: message.into(),
        }
    }

    pub fn warn(category: CheckCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: CheckStatus::Warn,
            message: message.into(),
        }
    }

    pub fn fail(category: CheckCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: CheckStatus::Fail,
            message: message.into(),
        }
    }
}

/// Everything a readiness run found, in check order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub namespace: String,
    pub checked_at: DateTime<Utc>,
    pub checks: Vec<CheckOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionAudit>,
    pub applications: Vec<ApplicationFeasibility>,
    /// Diagnostic of the fatal error that stopped the run early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub success: bool,
}

impl ReadinessReport {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            checked_at: Utc::now(),
            checks: Vec::new(),
            version: None,
            resources: None,
            storage: None,
            permissions: None,
            applications: Vec::new(),
            aborted: None,
            success: false,
        }
    }

    pub fn push(&mut self, outcome: CheckOutcome) {
        self.checks.push(outcome);
    }

    pub fn record_connected(&mut self) {
        self.push(CheckOutcome::pass(
            CheckCategory::Connectivity,
            "Connected to Kubernetes cluster",
        ));
    }

    pub fn record_version(&mut self, check: VersionCheck) {
        let outcome = if check.passed {
            CheckOutcome::pass(
                CheckCategory::Version,
                format!("Kubernetes version: {} (compatible)", check.reported),
            )
        } else {
            CheckOutcome::fail(
                CheckCategory::Version,
                format!(
                    "Kubernetes version {} is below the minimum required version {}",
                    check.reported, check.minimum
                ),
            )
        };
        self.push(outcome);
        self.version = Some(check);
    }

    pub fn record_resources(&mut self, assessment: ResourceAssessment) {
        let summary = &assessment.summary;
        let thresholds = &assessment.thresholds;

        if assessment.is_sufficient() {
            self.push(CheckOutcome::pass(
                CheckCategory::Resources,
                format!(
                    "Available resources: sufficient ({:.1}/{:.1} CPU cores, {:.1}/{:.1}GB memory)",
                    summary.available_cpu.cores(),
                    summary.total_cpu.cores(),
                    summary.available_memory.as_gib(),
                    summary.total_memory.as_gib()
                ),
            ));
        }
        if !assessment.cpu_sufficient {
            self.push(CheckOutcome::warn(
                CheckCategory::Resources,
                format!(
                    "Available CPU ({:.1} cores) is below the minimum requirement ({} cores)",
                    summary.available_cpu.cores(),
                    thresholds.min_cpu_cores
                ),
            ));
        }
        if !assessment.memory_sufficient {
            self.push(CheckOutcome::warn(
                CheckCategory::Resources,
                format!(
                    "Available memory ({:.1}GB) is below the minimum requirement ({}GB)",
                    summary.available_memory.as_gib(),
                    thresholds.min_memory_gb
                ),
            ));
        }
        self.resources = Some(assessment);
    }

    pub fn record_storage(&mut self, assessment: StorageAssessment) {
        match assessment.usage.usage_percent() {
            None => self.push(CheckOutcome::pass(
                CheckCategory::Storage,
                "Storage capacity: no storage configured",
            )),
            Some(percent) if assessment.usage.is_limited() => self.push(CheckOutcome::warn(
                CheckCategory::Storage,
                format!("Storage capacity: limited ({:.1}% used)", percent),
            )),
            Some(percent) => self.push(CheckOutcome::pass(
                CheckCategory::Storage,
                format!("Storage capacity: adequate ({:.1}% used)", percent),
            )),
        }

        if assessment.compatible_classes.is_empty() {
            self.push(CheckOutcome::warn(
                CheckCategory::Storage,
                "No compatible StorageClasses found for MongoDB/PostgreSQL",
            ));
        } else {
            self.push(CheckOutcome::pass(
                CheckCategory::Storage,
                format!(
                    "Compatible StorageClasses for databases: {}",
                    assessment.compatible_classes.join(", ")
                ),
            ));
        }
        self.storage = Some(assessment);
    }

    pub fn record_storage_unavailable(&mut self, error: impl std::fmt::Display) {
        self.push(CheckOutcome::warn(
            CheckCategory::Storage,
            format!("Could not inspect storage: {}", error),
        ));
    }

    pub fn record_permissions(&mut self, audit: PermissionAudit) {
        for result in &audit.results {
            let description = &result.check.description;
            let reason = result.reason.as_deref().unwrap_or_default();
            let outcome = if result.allowed {
                CheckOutcome::pass(CheckCategory::Permission, format!("Can {}", description))
            } else if result.query_failed {
                CheckOutcome::fail(
                    CheckCategory::Permission,
                    format!("Error checking permission to {}: {}", description, reason),
                )
            } else {
                CheckOutcome::fail(
                    CheckCategory::Permission,
                    format!("Cannot {}: {}", description, reason),
                )
            };
            self.checks.push(outcome);
        }
        self.permissions = Some(audit);
    }

    pub fn record_applications(&mut self, applications: Vec<ApplicationFeasibility>) {
        for app in &applications {
            let message = app.message(&self.namespace);
            let outcome = if app.feasible {
                CheckOutcome::pass(CheckCategory::Application, message)
            } else {
                CheckOutcome::warn(CheckCategory::Application, message)
            };
            self.checks.push(outcome);
        }
        self.applications = applications;
    }

    /// Network checks are not implemented; the line is always a pass
    pub fn record_network(&mut self) {
        self.push(CheckOutcome::pass(
            CheckCategory::Network,
            "Network connectivity: all tests passed",
        ));
    }

    /// Record a fatal error; no further checks follow
    pub fn abort(&mut self, category: CheckCategory, message: impl Into<String>) {
        let message = message.into();
        self.push(CheckOutcome::fail(category, message.clone()));
        self.aborted = Some(message);
    }

    /// Derive overall success
    pub fn finish(mut self) -> Self {
        self.success = self.aborted.is_none()
            && self.checks.iter().all(|c| c.status != CheckStatus::Fail);
        self
    }

    /// Whether the permission audit ran and every check was allowed
    pub fn permissions_passed(&self) -> Option<bool> {
        self.permissions.as_ref().map(PermissionAudit::passed)
    }

    pub fn outcomes(&self, category: CheckCategory) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(move |c| c.category == category)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Warn)
    }

    /// Process exit status for this report
    pub fn exit_code(&self) -> u8 {
        if self.success {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ClusterResourceSummary, NodeSnapshot, ResourceThresholds};

    fn summary(cpu: &str, memory: &str) -> ClusterResourceSummary {
        let nodes = vec![NodeSnapshot {
            name: "n".to_string(),
            cpu: Some(cpu.to_string()),
            memory: Some(memory.to_string()),
        }];
        ClusterResourceSummary::compute(&nodes, &[]).unwrap()
    }

    #[test]
    fn test_warnings_do_not_fail_the_report() {
        let mut report = ReadinessReport::new("ns");
        report.record_connected();
        report.record_resources(ResourceAssessment::evaluate(
            summary("1", "1Gi"),
            ResourceThresholds::default(),
        ));
        let report = report.finish();

        assert!(report.success);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.warnings().count(), 2);
    }

    #[test]
    fn test_sufficient_resources_message() {
        let mut report = ReadinessReport::new("ns");
        report.record_resources(ResourceAssessment::evaluate(
            summary("24", "96Gi"),
            ResourceThresholds::default(),
        ));
        let outcomes: Vec<_> = report.outcomes(CheckCategory::Resources).collect();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, CheckStatus::Pass);
        assert_eq!(
            outcomes[0].message,
            "Available resources: sufficient (24.0/24.0 CPU cores, 96.0/96.0GB memory)"
        );
    }

    #[test]
    fn test_version_failure_fails_report() {
        let mut report = ReadinessReport::new("ns");
        report.record_version(VersionCheck::evaluate("v1.20.4", "1.22.0"));
        let report = report.finish();

        assert!(!report.success);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            report.checks[0].message,
            "Kubernetes version v1.20.4 is below the minimum required version 1.22.0"
        );
    }

    #[test]
    fn test_abort_fails_report() {
        let mut report = ReadinessReport::new("ns");
        report.abort(
            CheckCategory::Connectivity,
            "Failed to connect to Kubernetes cluster: refused",
        );
        let report = report.finish();

        assert!(!report.success);
        assert!(report.aborted.is_some());
        assert_eq!(report.checks[0].status, CheckStatus::Fail);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut report = ReadinessReport::new("ns");
        report.record_connected();
        report.record_network();
        let report = report.finish();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["namespace"], "ns");
        assert_eq!(json["success"], true);
        assert_eq!(json["checks"][0]["category"], "connectivity");
        assert_eq!(json["checks"][0]["status"], "pass");
        assert!(json.get("aborted").is_none());
    }
}
