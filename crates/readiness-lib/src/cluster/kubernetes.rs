//! kube-rs implementation of [`ClusterApi`]

use super::{async_trait, AccessAttributes, AccessDecision, ClusterApi};
use crate::error::ClusterError;
use crate::resources::{ContainerRequests, NodeSnapshot, PodSnapshot};
use crate::storage::{StorageClassSnapshot, VolumeSnapshot};
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use k8s_openapi::api::core::v1::{Node, PersistentVolume, Pod};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, ListParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;

/// Cluster access through a kube-rs client
///
/// Client construction (kubeconfig, context) is left to the caller.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Map a kube-rs error, classifying throttling, server and transport
/// failures as transient
fn api_error(operation: &str, err: kube::Error) -> ClusterError {
    let transient = match &err {
        kube::Error::Api(response) => response.code == 429 || response.code >= 500,
        kube::Error::HyperError(_) | kube::Error::Service(_) => true,
        _ => false,
    };

    ClusterError::Api {
        operation: operation.to_string(),
        message: err.to_string(),
        transient,
    }
}

fn quantity(map: &BTreeMap<String, Quantity>, key: &str) -> Option<String> {
    map.get(key).map(|q| q.0.clone())
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn server_version(&self) -> Result<String, ClusterError> {
        let info = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| api_error("get server version", e))?;
        Ok(info.git_version)
    }

    async fn list_nodes(&self) -> Result<Vec<NodeSnapshot>, ClusterError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| api_error("list nodes", e))?;

        Ok(list
            .items
            .into_iter()
            .map(|node| {
                let capacity = node
                    .status
                    .and_then(|status| status.capacity)
                    .unwrap_or_default();
                NodeSnapshot {
                    name: node.metadata.name.unwrap_or_default(),
                    cpu: quantity(&capacity, "cpu"),
                    memory: quantity(&capacity, "memory"),
                }
            })
            .collect())
    }

    async fn list_pods(&self) -> Result<Vec<PodSnapshot>, ClusterError> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let list = pods
            .list(&ListParams::default())
            .await
            .map_err(|e| api_error("list pods", e))?;

        Ok(list
            .items
            .into_iter()
            .map(|pod| {
                let containers = pod
                    .spec
                    .map(|spec| spec.containers)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|container| {
                        let requests = container
                            .resources
                            .and_then(|r| r.requests)
                            .unwrap_or_default();
                        ContainerRequests {
                            name: container.name,
                            cpu: quantity(&requests, "cpu"),
                            memory: quantity(&requests, "memory"),
                        }
                    })
                    .collect();

                PodSnapshot {
                    namespace: pod.metadata.namespace.unwrap_or_default(),
                    name: pod.metadata.name.unwrap_or_default(),
                    containers,
                }
            })
            .collect())
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<VolumeSnapshot>, ClusterError> {
        let volumes: Api<PersistentVolume> = Api::all(self.client.clone());
        let list = volumes
            .list(&ListParams::default())
            .await
            .map_err(|e| api_error("list persistent volumes", e))?;

        Ok(list
            .items
            .into_iter()
            .map(|pv| {
                let capacity = pv
                    .spec
                    .and_then(|spec| spec.capacity)
                    .unwrap_or_default();
                let bound = pv
                    .status
                    .and_then(|status| status.phase)
                    .map(|phase| phase == "Bound")
                    .unwrap_or(false);
                VolumeSnapshot {
                    name: pv.metadata.name.unwrap_or_default(),
                    capacity: quantity(&capacity, "storage"),
                    bound,
                }
            })
            .collect())
    }

    async fn list_storage_classes(&self) -> Result<Vec<StorageClassSnapshot>, ClusterError> {
        let classes: Api<StorageClass> = Api::all(self.client.clone());
        let list = classes
            .list(&ListParams::default())
            .await
            .map_err(|e| api_error("list storage classes", e))?;

        Ok(list
            .items
            .into_iter()
            .map(|sc| StorageClassSnapshot {
                name: sc.metadata.name.unwrap_or_default(),
                provisioner: sc.provisioner,
            })
            .collect())
    }

    async fn review_access(
        &self,
        attributes: &AccessAttributes,
    ) -> Result<AccessDecision, ClusterError> {
        let review = SelfSubjectAccessReview {
            spec: SelfSubjectAccessReviewSpec {
                resource_attributes: Some(ResourceAttributes {
                    namespace: attributes.namespace.clone(),
                    verb: Some(attributes.verb.clone()),
                    group: Some(attributes.group.clone()),
                    version: Some(attributes.version.clone()),
                    resource: Some(attributes.resource.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let reviews: Api<SelfSubjectAccessReview> = Api::all(self.client.clone());
        let response = reviews
            .create(&PostParams::default(), &review)
            .await
            .map_err(|e| api_error("create self-subject access review", e))?;

        let status = response.status.ok_or_else(|| {
            ClusterError::api(
                "create self-subject access review",
                "response carried no status",
            )
        })?;

        Ok(AccessDecision {
            allowed: status.allowed,
            reason: status
                .reason
                .or(status.evaluation_error)
                .filter(|r| !r.is_empty()),
        })
    }
}
