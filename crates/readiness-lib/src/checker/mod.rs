//! Readiness run orchestration
//!
//! Steps run strictly in order: connectivity, version, resources, storage,
//! permissions, applications, network. Every API call is awaited before the
//! next one is issued. A fatal error records a failed outcome and stops the
//! run; storage problems and permission query failures never do.

use crate::applications::{map_feasibility, FeasibilityPolicy};
use crate::cluster::ClusterApi;
use crate::error::{ClusterError, ReadinessError};
use crate::observability::CheckLogger;
use crate::permissions::{audit_permissions, permission_battery};
use crate::report::{CheckCategory, ReadinessReport};
use crate::resources::{ClusterResourceSummary, ResourceAssessment, ResourceThresholds};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::storage::StorageAssessment;
use crate::version::VersionCheck;

pub const DEFAULT_MIN_VERSION: &str = "1.22.0";

/// Parameters for one readiness run
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub namespace: String,
    pub min_version: String,
    pub thresholds: ResourceThresholds,
    pub feasibility: FeasibilityPolicy,
    pub retry: RetryConfig,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            min_version: DEFAULT_MIN_VERSION.to_string(),
            thresholds: ResourceThresholds::default(),
            feasibility: FeasibilityPolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// A fatal error together with the step it stopped
struct StepFailure {
    category: CheckCategory,
    context: &'static str,
    error: ReadinessError,
}

impl StepFailure {
    fn new(
        category: CheckCategory,
        context: &'static str,
        error: impl Into<ReadinessError>,
    ) -> Self {
        Self {
            category,
            context,
            error: error.into(),
        }
    }
}

/// Run every readiness check against an already attempted connection.
///
/// A connection error produces a failed report with no further checks.
pub async fn check_cluster<C>(
    connection: Result<C, ClusterError>,
    options: &CheckOptions,
) -> ReadinessReport
where
    C: ClusterApi,
{
    let logger = CheckLogger::new(options.namespace.clone());
    let mut report = ReadinessReport::new(options.namespace.clone());
    logger.log_run_started(&options.min_version, options.feasibility);

    match connection {
        Ok(cluster) => {
            report.record_connected();
            logger.log_connected();

            if let Err(failure) = run_checks(&cluster, options, &logger, &mut report).await {
                let message = format!("{}: {}", failure.context, failure.error);
                logger.log_aborted(failure.context, &failure.error.to_string());
                report.abort(failure.category, message);
            }
        }
        Err(e) => {
            let reason = match &e {
                ClusterError::Connection(reason) => reason.clone(),
                other => other.to_string(),
            };
            logger.log_aborted("connectivity", &reason);
            report.abort(
                CheckCategory::Connectivity,
                format!("Failed to connect to Kubernetes cluster: {}", reason),
            );
        }
    }

    let report = report.finish();
    logger.log_run_finished(&report);
    report
}

async fn run_checks<C>(
    cluster: &C,
    options: &CheckOptions,
    logger: &CheckLogger,
    report: &mut ReadinessReport,
) -> Result<(), StepFailure>
where
    C: ClusterApi + ?Sized,
{
    let retry = &options.retry;

    // A version below the minimum fails the run but the remaining checks
    // still execute so the report is complete.
    let reported = retry_with_backoff(retry, "get server version", || cluster.server_version())
        .await
        .map_err(|e| {
            StepFailure::new(
                CheckCategory::Version,
                "Failed to check Kubernetes version",
                e,
            )
        })?;
    let version = VersionCheck::evaluate(&reported, &options.min_version);
    logger.log_version(&version);
    report.record_version(version);

    let resources = assess_resources(cluster, options.thresholds, retry)
        .await
        .map_err(|e| {
            StepFailure::new(
                CheckCategory::Resources,
                "Failed to check cluster resources",
                e,
            )
        })?;
    logger.log_resources(&resources);
    report.record_resources(resources);

    match inspect_storage(cluster, retry).await {
        Ok(storage) => {
            logger.log_storage(&storage);
            report.record_storage(storage);
        }
        Err(e) => {
            logger.log_storage_unavailable(&e.to_string());
            report.record_storage_unavailable(&e);
        }
    }

    let audit = audit_permissions(
        cluster,
        permission_battery(&options.namespace),
        retry,
        logger,
    )
    .await;
    let applications = map_feasibility(&audit, options.feasibility);
    report.record_permissions(audit);

    for app in &applications {
        logger.log_application(app);
    }
    report.record_applications(applications);

    report.record_network();
    Ok(())
}

async fn assess_resources<C>(
    cluster: &C,
    thresholds: ResourceThresholds,
    retry: &RetryConfig,
) -> Result<ResourceAssessment, ReadinessError>
where
    C: ClusterApi + ?Sized,
{
    let nodes = retry_with_backoff(retry, "list nodes", || cluster.list_nodes()).await?;
    let pods = retry_with_backoff(retry, "list pods", || cluster.list_pods()).await?;
    let summary = ClusterResourceSummary::compute(&nodes, &pods)?;
    Ok(ResourceAssessment::evaluate(summary, thresholds))
}

async fn inspect_storage<C>(
    cluster: &C,
    retry: &RetryConfig,
) -> Result<StorageAssessment, ReadinessError>
where
    C: ClusterApi + ?Sized,
{
    let volumes = retry_with_backoff(retry, "list persistent volumes", || {
        cluster.list_persistent_volumes()
    })
    .await?;
    let classes = retry_with_backoff(retry, "list storage classes", || {
        cluster.list_storage_classes()
    })
    .await?;
    Ok(StorageAssessment::evaluate(&volumes, &classes)?)
}
