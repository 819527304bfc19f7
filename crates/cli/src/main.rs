//! dynactl
//!
//! A command-line tool that checks whether a Kubernetes cluster is ready for
//! a platform deployment and manages the tool's local configuration.

mod client;
mod commands;
mod config;
mod logging;
mod output;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::cluster::{CheckArgs, ClusterContext};

/// Deployment readiness tool for Kubernetes clusters
#[derive(Parser)]
#[command(name = "dynactl")]
#[command(
    author,
    version,
    about = "Deployment readiness tool for Kubernetes clusters",
    long_about = None
)]
pub struct Cli {
    /// Path to config file (defaults to ~/.dynactl/config)
    #[arg(long, env = "DYNACTL_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Increase verbosity (can be used multiple times)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Kubeconfig file or path list (defaults to KUBECONFIG, then ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context (falls back to the `cluster.context` config key)
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: logging::LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check cluster readiness for deployment
    #[command(subcommand)]
    Cluster(ClusterCommands),

    /// Get and set configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ClusterCommands {
    /// Check resources, RBAC permissions and version compatibility
    Check(CheckArgs),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Fetch the value of a configuration key
    Get {
        /// Configuration key
        key: String,
    },

    /// Set the value of a configuration key
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Remove a configuration key
    Unset {
        /// Configuration key
        key: String,
    },

    /// List all configuration settings
    List,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.log_format);

    let config_path = match cli.config_file {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let mut store = config::ConfigStore::load(config_path)?;

    let code = match cli.command {
        Commands::Cluster(ClusterCommands::Check(args)) => {
            let ctx = ClusterContext {
                store: &store,
                kubeconfig: cli.kubeconfig,
                context: cli.context,
                format: cli.format,
            };
            commands::cluster::check(ctx, args).await?
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Get { key } => commands::config::get(&store, &key, cli.format)?,
            ConfigCommands::Set { key, value } => {
                commands::config::set(&mut store, &key, &value)?
            }
            ConfigCommands::Unset { key } => commands::config::unset(&mut store, &key)?,
            ConfigCommands::List => commands::config::list(&store, cli.format)?,
        },
    };

    Ok(code)
}
