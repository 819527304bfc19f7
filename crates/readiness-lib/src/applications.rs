//! Per-application deployability derived from the permission audit

use crate::permissions::{PermissionAudit, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workloads the deployment ships alongside the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Application {
    Keycloak,
    MongoDb,
    PostgreSql,
}

/// All applications, in report order
pub const APPLICATIONS: [Application; 3] = [
    Application::Keycloak,
    Application::MongoDb,
    Application::PostgreSql,
];

impl Application {
    pub fn name(&self) -> &'static str {
        match self {
            Application::Keycloak => "Keycloak",
            Application::MongoDb => "MongoDB",
            Application::PostgreSql => "PostgreSQL",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Application::Keycloak => "Identity and Access Management",
            Application::MongoDb => "NoSQL Database",
            Application::PostgreSql => "Relational Database",
        }
    }

    pub fn required_kinds(&self) -> &'static [ResourceKind] {
        match self {
            Application::Keycloak => &[
                ResourceKind::Deployments,
                ResourceKind::Services,
                ResourceKind::Secrets,
                ResourceKind::ConfigMaps,
            ],
            Application::MongoDb | Application::PostgreSql => &[
                ResourceKind::Deployments,
                ResourceKind::Services,
                ResourceKind::PersistentVolumeClaims,
                ResourceKind::Secrets,
            ],
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How permission results translate into application feasibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeasibilityPolicy {
    /// Every application is feasible only if the whole audit passed
    #[default]
    Coarse,
    /// An application is infeasible only if one of its own required kinds
    /// was denied
    PerResourceKind,
}

/// Whether one application can be deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFeasibility {
    pub application: Application,
    pub feasible: bool,
    /// Required kinds that were denied; empty under the coarse policy
    pub blocking_kinds: Vec<ResourceKind>,
}

impl ApplicationFeasibility {
    pub fn message(&self, namespace: &str) -> String {
        let app = self.application;
        if self.feasible {
            return format!(
                "Can run {} ({}) in namespace '{}'",
                app.name(),
                app.description(),
                namespace
            );
        }

        let mut message = format!(
            "May not be able to run {} ({}) due to RBAC limitations",
            app.name(),
            app.description()
        );
        if !self.blocking_kinds.is_empty() {
            let kinds: Vec<_> = self.blocking_kinds.iter().map(|k| k.plural()).collect();
            message.push_str(&format!(" on {}", kinds.join(", ")));
        }
        message
    }
}

/// Fold the audit into a verdict for each application
pub fn map_feasibility(
    audit: &PermissionAudit,
    policy: FeasibilityPolicy,
) -> Vec<ApplicationFeasibility> {
    let denied = audit.denied_kinds();

    APPLICATIONS
        .iter()
        .map(|&application| match policy {
            FeasibilityPolicy::Coarse => ApplicationFeasibility {
                application,
                feasible: audit.passed(),
                blocking_kinds: Vec::new(),
            },
            FeasibilityPolicy::PerResourceKind => {
                let blocking_kinds: Vec<_> = application
                    .required_kinds()
                    .iter()
                    .copied()
                    .filter(|kind| denied.contains(kind))
                    .collect();
                ApplicationFeasibility {
                    application,
                    feasible: blocking_kinds.is_empty(),
                    blocking_kinds,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{permission_battery, PermissionResult};

    fn audit_with_denied(denied: &[ResourceKind]) -> PermissionAudit {
        PermissionAudit {
            results: permission_battery("ns")
                .into_iter()
                .map(|check| {
                    let allowed = !denied.contains(&check.kind);
                    PermissionResult {
                        check,
                        allowed,
                        reason: (!allowed).then(|| "forbidden".to_string()),
                        query_failed: false,
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_coarse_all_allowed_all_feasible() {
        let result = map_feasibility(&audit_with_denied(&[]), FeasibilityPolicy::Coarse);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|a| a.feasible));
    }

    #[test]
    fn test_coarse_any_denial_blocks_everything() {
        let result = map_feasibility(
            &audit_with_denied(&[ResourceKind::CustomResourceDefinitions]),
            FeasibilityPolicy::Coarse,
        );
        assert!(result.iter().all(|a| !a.feasible));
        assert!(result.iter().all(|a| a.blocking_kinds.is_empty()));
    }

    #[test]
    fn test_per_kind_ignores_unrelated_denials() {
        let result = map_feasibility(
            &audit_with_denied(&[ResourceKind::CustomResourceDefinitions]),
            FeasibilityPolicy::PerResourceKind,
        );
        assert!(result.iter().all(|a| a.feasible));
    }

    #[test]
    fn test_per_kind_pvc_denial_spares_keycloak() {
        let result = map_feasibility(
            &audit_with_denied(&[ResourceKind::PersistentVolumeClaims]),
            FeasibilityPolicy::PerResourceKind,
        );
        let verdict = |app: Application| result.iter().find(|a| a.application == app).unwrap();

        assert!(verdict(Application::Keycloak).feasible);
        assert!(!verdict(Application::MongoDb).feasible);
        assert!(!verdict(Application::PostgreSql).feasible);
        assert_eq!(
            verdict(Application::MongoDb).blocking_kinds,
            vec![ResourceKind::PersistentVolumeClaims]
        );
    }

    #[test]
    fn test_messages() {
        let ok = ApplicationFeasibility {
            application: Application::Keycloak,
            feasible: true,
            blocking_kinds: vec![],
        };
        assert_eq!(
            ok.message("dynamo"),
            "Can run Keycloak (Identity and Access Management) in namespace 'dynamo'"
        );

        let blocked = ApplicationFeasibility {
            application: Application::PostgreSql,
            feasible: false,
            blocking_kinds: vec![ResourceKind::Secrets],
        };
        assert_eq!(
            blocked.message("dynamo"),
            "May not be able to run PostgreSQL (Relational Database) due to RBAC limitations on secrets"
        );
    }
}
