//! `dynactl cluster` commands

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use readiness_lib::checker::DEFAULT_MIN_VERSION;
use readiness_lib::{
    check_cluster, CheckOptions, FeasibilityPolicy, ResourceThresholds, RetryConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use crate::client::{self, ConnectOptions};
use crate::config::{resolve_context, resolve_namespace, validate_namespace, ConfigStore};
use crate::output::{print_report, OutputFormat};

/// How denied permissions map to application feasibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Feasibility {
    /// Any denial makes every application infeasible
    #[default]
    Coarse,
    /// Only denials of an application's own resource kinds block it
    PerResourceKind,
}

impl From<Feasibility> for FeasibilityPolicy {
    fn from(value: Feasibility) -> Self {
        match value {
            Feasibility::Coarse => FeasibilityPolicy::Coarse,
            Feasibility::PerResourceKind => FeasibilityPolicy::PerResourceKind,
        }
    }
}

/// Arguments for `cluster check`
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Target namespace (falls back to the `namespace` and `cluster.namespace` config keys)
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Minimum required Kubernetes version
    #[arg(long = "min-k8s-version", default_value = DEFAULT_MIN_VERSION)]
    pub min_k8s_version: String,

    /// Minimum available CPU cores
    #[arg(long, default_value_t = 4.0)]
    pub min_cpu: f64,

    /// Minimum available memory in GB
    #[arg(long, default_value_t = 16.0)]
    pub min_memory: f64,

    /// Application feasibility policy
    #[arg(long, value_enum, default_value_t = Feasibility::Coarse)]
    pub feasibility: Feasibility,

    /// Extra attempts for transient API errors
    #[arg(long, default_value_t = 0)]
    pub retries: u32,
}

/// Global settings the check needs
pub struct ClusterContext<'a> {
    pub store: &'a ConfigStore,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub format: OutputFormat,
}

/// Run the readiness check and render the report
pub async fn check(ctx: ClusterContext<'_>, args: CheckArgs) -> Result<ExitCode> {
    let (namespace, namespace_source) = resolve_namespace(args.namespace.as_deref(), ctx.store);
    if let Err(reason) = validate_namespace(&namespace) {
        bail!("Invalid namespace '{}': {}", namespace, reason);
    }
    if args.min_cpu < 0.0 || args.min_memory < 0.0 {
        bail!("--min-cpu and --min-memory must not be negative");
    }

    let context = resolve_context(ctx.context.as_deref(), ctx.store);
    let context_name = context
        .as_ref()
        .map(|(name, _)| name.clone())
        .or_else(|| client::current_context(ctx.kubeconfig.as_deref()));

    info!(
        namespace = %namespace,
        namespace_source = %namespace_source,
        context = ?context_name,
        context_source = ?context.as_ref().map(|(_, source)| source.to_string()),
        "Resolved check target"
    );

    if ctx.format == OutputFormat::Table {
        println!("Checking cluster status...");
        if let Some(name) = &context_name {
            println!("Using context '{}', namespace '{}'", name, namespace);
        }
    }

    let options = CheckOptions {
        namespace,
        min_version: args.min_k8s_version,
        thresholds: ResourceThresholds {
            min_cpu_cores: args.min_cpu,
            min_memory_gb: args.min_memory,
        },
        feasibility: args.feasibility.into(),
        retry: RetryConfig::with_retries(args.retries),
    };

    let connection = client::connect(&ConnectOptions {
        kubeconfig: ctx.kubeconfig,
        context: context.map(|(name, _)| name),
    })
    .await;

    let report = check_cluster(connection, &options).await;
    print_report(&report, ctx.format)?;

    Ok(ExitCode::from(report.exit_code()))
}
