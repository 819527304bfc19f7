//! Kubernetes client construction

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use readiness_lib::{ClusterError, KubeCluster};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How to reach the cluster
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Explicit kubeconfig file, or a list of files joined with the platform
    /// path separator; otherwise `KUBECONFIG`, `~/.kube/config` and finally
    /// in-cluster configuration are tried
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context; the current context when unset
    pub context: Option<String>,
}

/// Load client configuration and build a cluster handle
pub async fn connect(options: &ConnectOptions) -> Result<KubeCluster, ClusterError> {
    let kube_options = KubeConfigOptions {
        context: options.context.clone(),
        ..Default::default()
    };

    let config = match (&options.kubeconfig, &options.context) {
        (Some(path), _) => {
            let kubeconfig = read_kubeconfig(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &kube_options)
                .await
                .map_err(|e| ClusterError::connection(e.to_string()))?
        }
        (None, Some(_)) => Config::from_kubeconfig(&kube_options)
            .await
            .map_err(|e| ClusterError::connection(e.to_string()))?,
        (None, None) => Config::infer()
            .await
            .map_err(|e| ClusterError::connection(e.to_string()))?,
    };

    debug!(cluster_url = %config.cluster_url, "Loaded Kubernetes client configuration");

    let client = Client::try_from(config).map_err(|e| ClusterError::connection(e.to_string()))?;
    Ok(KubeCluster::new(client))
}

/// Name of the kubeconfig's current context, if one can be read
pub fn current_context(kubeconfig: Option<&Path>) -> Option<String> {
    let config = match kubeconfig {
        Some(paths) => read_kubeconfig(paths).ok()?,
        None => Kubeconfig::read().ok()?,
    };
    config.current_context
}

/// Read every file in a kubeconfig path list; earlier files win on conflicts
fn read_kubeconfig(paths: &Path) -> Result<Kubeconfig, ClusterError> {
    let mut merged: Option<Kubeconfig> = None;

    for path in env::split_paths(paths.as_os_str()).filter(|p| !p.as_os_str().is_empty()) {
        let next = Kubeconfig::read_from(&path).map_err(|e| {
            ClusterError::connection(format!(
                "failed to read kubeconfig {}: {}",
                path.display(),
                e
            ))
        })?;
        merged = Some(match merged {
            Some(current) => current.merge(next).map_err(|e| {
                ClusterError::connection(format!("failed to merge kubeconfig: {}", e))
            })?,
            None => next,
        });
    }

    merged.ok_or_else(|| ClusterError::connection("empty kubeconfig path"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: staging
clusters:
- name: staging
  cluster:
    server: https://127.0.0.1:6443
contexts:
- name: staging
  context:
    cluster: staging
    user: admin
users:
- name: admin
  user:
    token: abc
"#;

    #[test]
    fn test_current_context_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, KUBECONFIG).unwrap();

        assert_eq!(current_context(Some(&path)).as_deref(), Some("staging"));
    }

    const CLUSTERS: &str = r#"
apiVersion: v1
kind: Config
current-context: staging
clusters:
- name: staging
  cluster:
    server: https://127.0.0.1:6443
contexts:
- name: staging
  context:
    cluster: staging
    user: admin
"#;

    const USERS: &str = r#"
apiVersion: v1
kind: Config
users:
- name: admin
  user:
    token: abc
"#;

    fn split_kubeconfig(dir: &TempDir) -> PathBuf {
        let clusters = dir.path().join("clusters");
        let users = dir.path().join("users");
        std::fs::write(&clusters, CLUSTERS).unwrap();
        std::fs::write(&users, USERS).unwrap();
        PathBuf::from(env::join_paths([clusters, users]).unwrap())
    }

    #[test]
    fn test_path_list_is_merged() {
        let dir = TempDir::new().unwrap();
        let paths = split_kubeconfig(&dir);

        let merged = read_kubeconfig(&paths).unwrap();
        assert_eq!(merged.current_context.as_deref(), Some("staging"));
        assert_eq!(merged.contexts.len(), 1);
        assert_eq!(merged.auth_infos.len(), 1);
        assert_eq!(current_context(Some(&paths)).as_deref(), Some("staging"));
    }

    #[tokio::test]
    async fn test_connect_accepts_path_list() {
        let dir = TempDir::new().unwrap();
        let options = ConnectOptions {
            kubeconfig: Some(split_kubeconfig(&dir)),
            context: None,
        };

        if let Err(err) = connect(&options).await {
            assert!(!err.to_string().contains("failed to read kubeconfig"), "{}", err);
        }
    }

    #[test]
    fn test_current_context_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(current_context(Some(&dir.path().join("absent"))), None);
    }

    #[tokio::test]
    async fn test_connect_with_missing_kubeconfig_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let options = ConnectOptions {
            kubeconfig: Some(dir.path().join("absent")),
            context: None,
        };

        let err = connect(&options).await.err().unwrap();
        assert!(matches!(err, ClusterError::Connection(_)));
        assert!(err.to_string().contains("failed to read kubeconfig"));
    }

    #[tokio::test]
    async fn test_connect_with_unknown_context_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, KUBECONFIG).unwrap();
        let options = ConnectOptions {
            kubeconfig: Some(path),
            context: Some("production".to_string()),
        };

        let err = connect(&options).await.err().unwrap();
        assert!(matches!(err, ClusterError::Connection(_)));
    }
}
