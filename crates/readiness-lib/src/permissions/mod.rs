//! RBAC permission audit
//!
//! A fixed, ordered battery of "can I create X?" checks. Resource kinds are an
//! enum carrying their own API group and version so the table cannot drift
//! into misspelled group strings.

mod audit;

pub use audit::{audit_permissions, PermissionAudit, PermissionResult};

use crate::cluster::AccessAttributes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kinds the deployment needs to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Deployments,
    ConfigMaps,
    HorizontalPodAutoscalers,
    PersistentVolumeClaims,
    Services,
    Secrets,
    CustomResourceDefinitions,
}

impl ResourceKind {
    /// API group; empty for the core group
    pub fn api_group(&self) -> &'static str {
        match self {
            ResourceKind::Deployments => "apps",
            ResourceKind::HorizontalPodAutoscalers => "autoscaling",
            ResourceKind::CustomResourceDefinitions => "apiextensions.k8s.io",
            ResourceKind::ConfigMaps
            | ResourceKind::PersistentVolumeClaims
            | ResourceKind::Services
            | ResourceKind::Secrets => "",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::HorizontalPodAutoscalers => "v2",
            _ => "v1",
        }
    }

    /// Plural resource name as used in RBAC rules
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Deployments => "deployments",
            ResourceKind::ConfigMaps => "configmaps",
            ResourceKind::HorizontalPodAutoscalers => "horizontalpodautoscalers",
            ResourceKind::PersistentVolumeClaims => "persistentvolumeclaims",
            ResourceKind::Services => "services",
            ResourceKind::Secrets => "secrets",
            ResourceKind::CustomResourceDefinitions => "customresourcedefinitions",
        }
    }

    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self, ResourceKind::CustomResourceDefinitions)
    }

    fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Deployments => "deployments",
            ResourceKind::ConfigMaps => "configmaps",
            ResourceKind::HorizontalPodAutoscalers => "autoscaling resources",
            ResourceKind::PersistentVolumeClaims => "persistent volume claims",
            ResourceKind::Services => "services",
            ResourceKind::Secrets => "secrets",
            ResourceKind::CustomResourceDefinitions => "Custom Resource Definitions",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// RBAC verbs the audit asks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
        }
    }
}

/// The battery, in evaluation order: namespace-scoped first, cluster-scoped
/// last. The second field names the workloads that depend on the kind.
const BATTERY: &[(ResourceKind, Option<&str>)] = &[
    (ResourceKind::Deployments, None),
    (ResourceKind::ConfigMaps, None),
    (ResourceKind::HorizontalPodAutoscalers, None),
    (ResourceKind::PersistentVolumeClaims, Some("MongoDB and PostgreSQL")),
    (ResourceKind::Services, Some("Keycloak, MongoDB, PostgreSQL")),
    (ResourceKind::Secrets, Some("Keycloak, MongoDB, PostgreSQL")),
    (ResourceKind::CustomResourceDefinitions, None),
];

/// A single capability to verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    /// Empty for cluster-scoped kinds
    pub namespace: String,
    pub verb: Verb,
    pub kind: ResourceKind,
    pub api_group: String,
    pub api_version: String,
    pub description: String,
}

impl PermissionCheck {
    pub fn new(namespace: &str, verb: Verb, kind: ResourceKind, needed_for: Option<&str>) -> Self {
        let (namespace, description) = if kind.is_cluster_scoped() {
            (
                String::new(),
                format!("{} {} (cluster-wide)", verb.as_str(), kind.display_name()),
            )
        } else {
            let mut description = format!(
                "{} {} in namespace '{}'",
                verb.as_str(),
                kind.display_name(),
                namespace
            );
            if let Some(apps) = needed_for {
                description.push_str(&format!(" (needed for {})", apps));
            }
            (namespace.to_string(), description)
        };

        Self {
            namespace,
            verb,
            kind,
            api_group: kind.api_group().to_string(),
            api_version: kind.api_version().to_string(),
            description,
        }
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Attributes for the self-subject access review
    pub fn attributes(&self) -> AccessAttributes {
        AccessAttributes {
            namespace: (!self.is_cluster_scoped()).then(|| self.namespace.clone()),
            verb: self.verb.as_str().to_string(),
            group: self.api_group.clone(),
            version: self.api_version.clone(),
            resource: self.kind.plural().to_string(),
        }
    }
}

/// The fixed battery of checks for `namespace`, in evaluation order
pub fn permission_battery(namespace: &str) -> Vec<PermissionCheck> {
    BATTERY
        .iter()
        .map(|(kind, needed_for)| PermissionCheck::new(namespace, Verb::Create, *kind, *needed_for))
        .collect()
}
