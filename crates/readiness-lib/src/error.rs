//! Error types for readiness checks

use thiserror::Error;

/// A cluster-reported quantity that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {dimension} quantity '{input}': {reason}")]
pub struct FormatError {
    pub dimension: &'static str,
    pub input: String,
    pub reason: String,
}

impl FormatError {
    pub fn new(
        dimension: &'static str,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            dimension,
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Attach the object the quantity came from, e.g. `node/worker-1`
    pub fn located(mut self, location: impl AsRef<str>) -> Self {
        self.reason = format!("{} (in {})", self.reason, location.as_ref());
        self
    }
}

/// Errors talking to the cluster
#[derive(Debug, Clone, Error)]
pub enum ClusterError {
    /// Cluster unreachable or kubeconfig unusable
    #[error("failed to connect to Kubernetes cluster: {0}")]
    Connection(String),

    /// A single API request failed
    #[error("{operation} failed: {message}")]
    Api {
        operation: String,
        message: String,
        /// Whether retrying the same request may succeed (429, 5xx, transport)
        transient: bool,
    },
}

impl ClusterError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
            transient: false,
        }
    }

    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
            transient: true,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api { transient: true, .. })
    }
}

/// Fatal errors that abort a readiness run
#[derive(Debug, Clone, Error)]
pub enum ReadinessError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Format(#[from] FormatError),
}
