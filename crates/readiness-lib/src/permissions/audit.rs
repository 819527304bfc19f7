//! Runs the permission battery against the authorization oracle

use super::{PermissionCheck, ResourceKind};
use crate::cluster::{AccessDecision, ClusterApi};
use crate::error::ClusterError;
use crate::observability::CheckLogger;
use crate::retry::{retry_with_backoff, RetryConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const DEFAULT_DENIAL_REASON: &str = "insufficient permissions";

/// Outcome of one permission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResult {
    pub check: PermissionCheck,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The query itself failed; the check is counted as denied
    pub query_failed: bool,
}

impl PermissionResult {
    fn from_decision(check: PermissionCheck, decision: AccessDecision) -> Self {
        let reason = if decision.allowed {
            decision.reason
        } else {
            Some(
                decision
                    .reason
                    .unwrap_or_else(|| DEFAULT_DENIAL_REASON.to_string()),
            )
        };

        Self {
            check,
            allowed: decision.allowed,
            reason,
            query_failed: false,
        }
    }

    fn from_error(check: PermissionCheck, error: &ClusterError) -> Self {
        Self {
            check,
            allowed: false,
            reason: Some(error.to_string()),
            query_failed: true,
        }
    }
}

/// Results of the whole battery, in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionAudit {
    pub results: Vec<PermissionResult>,
}

impl PermissionAudit {
    /// True only when every check was allowed
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.allowed)
    }

    pub fn denied(&self) -> impl Iterator<Item = &PermissionResult> {
        self.results.iter().filter(|r| !r.allowed)
    }

    pub fn denied_kinds(&self) -> BTreeSet<ResourceKind> {
        self.denied().map(|r| r.check.kind).collect()
    }
}

/// Evaluate every check in order. A failed query is recorded as a denial and
/// the remaining checks still run.
pub async fn audit_permissions<C>(
    cluster: &C,
    checks: Vec<PermissionCheck>,
    retry: &RetryConfig,
    logger: &CheckLogger,
) -> PermissionAudit
where
    C: ClusterApi + ?Sized,
{
    let mut results = Vec::with_capacity(checks.len());

    for check in checks {
        let attributes = check.attributes();
        let attributes = &attributes;
        let operation = format!("review {} {}", check.verb.as_str(), check.kind);

        let result = match retry_with_backoff(retry, &operation, move || {
            cluster.review_access(attributes)
        })
        .await
        {
            Ok(decision) => PermissionResult::from_decision(check, decision),
            Err(e) => PermissionResult::from_error(check, &e),
        };

        logger.log_permission(&result);
        results.push(result);
    }

    PermissionAudit { results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{async_trait, AccessAttributes};
    use crate::permissions::permission_battery;
    use crate::resources::{NodeSnapshot, PodSnapshot};
    use crate::storage::{StorageClassSnapshot, VolumeSnapshot};
    use std::sync::Mutex;

    /// Oracle that answers from a fixed script and records what it was asked
    struct ScriptedOracle {
        denied: Vec<&'static str>,
        failing: Vec<&'static str>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(denied: Vec<&'static str>, failing: Vec<&'static str>) -> Self {
            Self {
                denied,
                failing,
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ClusterApi for ScriptedOracle {
        async fn server_version(&self) -> Result<String, ClusterError> {
            unimplemented!()
        }

        async fn list_nodes(&self) -> Result<Vec<NodeSnapshot>, ClusterError> {
            unimplemented!()
        }

        async fn list_pods(&self) -> Result<Vec<PodSnapshot>, ClusterError> {
            unimplemented!()
        }

        async fn list_persistent_volumes(&self) -> Result<Vec<VolumeSnapshot>, ClusterError> {
            unimplemented!()
        }

        async fn list_storage_classes(&self) -> Result<Vec<StorageClassSnapshot>, ClusterError> {
            unimplemented!()
        }

        async fn review_access(
            &self,
            attributes: &AccessAttributes,
        ) -> Result<AccessDecision, ClusterError> {
            self.asked.lock().unwrap().push(attributes.resource.clone());
            let resource = attributes.resource.as_str();
            if self.failing.iter().any(|f| *f == resource) {
                return Err(ClusterError::api("review", "connection refused"));
            }
            if self.denied.iter().any(|d| *d == resource) {
                return Ok(AccessDecision {
                    allowed: false,
                    reason: None,
                });
            }
            Ok(AccessDecision::allowed())
        }
    }

    fn logger() -> CheckLogger {
        CheckLogger::new("test-ns")
    }

    #[tokio::test]
    async fn test_all_allowed_passes() {
        let oracle = ScriptedOracle::new(vec![], vec![]);
        let audit = audit_permissions(
            &oracle,
            permission_battery("test-ns"),
            &RetryConfig::default(),
            &logger(),
        )
        .await;

        assert_eq!(audit.results.len(), 7);
        assert!(audit.passed());
        assert!(audit.denied_kinds().is_empty());
    }

    #[tokio::test]
    async fn test_single_denial_fails_audit() {
        let oracle = ScriptedOracle::new(vec!["secrets"], vec![]);
        let audit = audit_permissions(
            &oracle,
            permission_battery("test-ns"),
            &RetryConfig::default(),
            &logger(),
        )
        .await;

        assert!(!audit.passed());
        let denied: Vec<_> = audit.denied().collect();
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].check.kind, ResourceKind::Secrets);
        assert_eq!(denied[0].reason.as_deref(), Some("insufficient permissions"));
        assert!(!denied[0].query_failed);
    }

    #[tokio::test]
    async fn test_failed_query_does_not_stop_the_batch() {
        let oracle = ScriptedOracle::new(vec![], vec!["configmaps"]);
        let audit = audit_permissions(
            &oracle,
            permission_battery("test-ns"),
            &RetryConfig::default(),
            &logger(),
        )
        .await;

        assert_eq!(oracle.asked.lock().unwrap().len(), 7);
        assert_eq!(audit.results.len(), 7);
        assert!(!audit.passed());

        let failed = &audit.results[1];
        assert_eq!(failed.check.kind, ResourceKind::ConfigMaps);
        assert!(failed.query_failed);
        assert!(failed.reason.as_deref().unwrap().contains("connection refused"));

        let others_allowed = audit
            .results
            .iter()
            .filter(|r| r.check.kind != ResourceKind::ConfigMaps)
            .all(|r| r.allowed);
        assert!(others_allowed);
    }

    #[tokio::test]
    async fn test_checks_run_in_declaration_order() {
        let oracle = ScriptedOracle::new(vec![], vec![]);
        audit_permissions(
            &oracle,
            permission_battery("test-ns"),
            &RetryConfig::default(),
            &logger(),
        )
        .await;

        let asked = oracle.asked.lock().unwrap().clone();
        assert_eq!(
            asked,
            vec![
                "deployments",
                "configmaps",
                "horizontalpodautoscalers",
                "persistentvolumeclaims",
                "services",
                "secrets",
                "customresourcedefinitions",
            ]
        );
    }
}
