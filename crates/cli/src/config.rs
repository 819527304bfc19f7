//! Configuration management for the CLI
//!
//! Settings live in a flat JSON object keyed by dotted names
//! (`cluster.namespace`). Only a fixed set of keys is accepted.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

pub const CLOUD_PROVIDERS: &[&str] = &["aws", "azure", "gcp", "on-prem"];

const MAX_NAMESPACE_LEN: usize = 63;

/// Errors from key or value validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: ConfigKey, reason: String },
}

/// Supported configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigKey {
    Cloud,
    RegistryUrl,
    RegistryUsername,
    RegistryPassword,
    ClusterContext,
    ClusterNamespace,
    Namespace,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 7] = [
        ConfigKey::Cloud,
        ConfigKey::RegistryUrl,
        ConfigKey::RegistryUsername,
        ConfigKey::RegistryPassword,
        ConfigKey::ClusterContext,
        ConfigKey::ClusterNamespace,
        ConfigKey::Namespace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Cloud => "cloud",
            ConfigKey::RegistryUrl => "registry.url",
            ConfigKey::RegistryUsername => "registry.username",
            ConfigKey::RegistryPassword => "registry.password",
            ConfigKey::ClusterContext => "cluster.context",
            ConfigKey::ClusterNamespace => "cluster.namespace",
            ConfigKey::Namespace => "namespace",
        }
    }

    pub fn validate(&self, value: &str) -> Result<(), ConfigError> {
        match self {
            ConfigKey::Cloud if !CLOUD_PROVIDERS.contains(&value) => Err(ConfigError::InvalidValue {
                key: *self,
                reason: format!("must be one of {}", CLOUD_PROVIDERS.join(", ")),
            }),
            ConfigKey::Namespace => validate_namespace(value).map_err(|reason| {
                ConfigError::InvalidValue {
                    key: *self,
                    reason,
                }
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidKey(s.to_string()))
    }
}

/// Whether a stored value must be masked when displayed
pub fn is_secret(name: &str) -> bool {
    name.ends_with(".password") || name.ends_with(".token")
}

/// Check a Kubernetes namespace name (RFC 1123 label)
pub fn validate_namespace(name: &str) -> Result<(), String> {
    let bytes = name.as_bytes();
    let valid_char = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-';
    let alnum = |b: Option<&u8>| {
        b.map(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
            .unwrap_or(false)
    };

    if name.is_empty() || name.len() > MAX_NAMESPACE_LEN {
        return Err(format!("namespace must be 1-{} characters", MAX_NAMESPACE_LEN));
    }
    if !bytes.iter().all(valid_char) || !alnum(bytes.first()) || !alnum(bytes.last()) {
        return Err(
            "namespace must consist of lowercase alphanumeric characters or '-', \
             and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

/// Default config file location, `~/.dynactl/config`
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".dynactl").join("config"))
}

/// Read access to configuration values, keyed by validated key
pub trait ConfigLookup {
    fn lookup(&self, key: ConfigKey) -> Option<&str>;
}

/// JSON-file backed configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Load configuration from file. A missing file yields an empty store;
    /// malformed JSON is logged and ignored.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using empty config");
            return Ok(Self {
                path,
                values: BTreeMap::new(),
            });
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let values = match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
            Ok(raw) => raw
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Invalid JSON in config file, using empty config"
                );
                BTreeMap::new()
            }
        };

        debug!(path = %path.display(), keys = values.len(), "Loaded configuration");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(key.as_str()).map(String::as_str)
    }

    /// Validate and persist a value
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        key.validate(value)?;
        self.values.insert(key.as_str().to_string(), value.to_string());
        self.save()
    }

    /// Remove a key; returns whether it was present
    pub fn unset(&mut self, key: ConfigKey) -> Result<bool> {
        if self.values.remove(key.as_str()).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// All stored entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Save configuration to file
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(&self.values).context("Failed to serialize config")?;
        std::fs::write(&self.path, content).context("Failed to write config file")?;

        debug!(path = %self.path.display(), "Saved configuration");
        Ok(())
    }
}

impl ConfigLookup for ConfigStore {
    fn lookup(&self, key: ConfigKey) -> Option<&str> {
        self.get(key)
    }
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flag,
    Key(ConfigKey),
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Flag => f.write_str("flag"),
            Source::Key(key) => write!(f, "config key {}", key),
            Source::Default => f.write_str("default"),
        }
    }
}

/// Namespace candidates, first match wins
pub const NAMESPACE_SOURCES: [Source; 4] = [
    Source::Flag,
    Source::Key(ConfigKey::Namespace),
    Source::Key(ConfigKey::ClusterNamespace),
    Source::Default,
];

/// Context candidates; the kubeconfig's current context applies when none match
pub const CONTEXT_SOURCES: [Source; 2] = [Source::Flag, Source::Key(ConfigKey::ClusterContext)];

pub const DEFAULT_NAMESPACE: &str = "default";

/// Walk `sources` in order and return the first value present
pub fn resolve<'a>(
    sources: &[Source],
    flag: Option<&'a str>,
    config: &'a dyn ConfigLookup,
    default: Option<&'a str>,
) -> Option<(&'a str, Source)> {
    sources.iter().find_map(|source| {
        let value = match source {
            Source::Flag => flag,
            Source::Key(key) => config.lookup(*key),
            Source::Default => default,
        };
        value.filter(|v| !v.is_empty()).map(|v| (v, *source))
    })
}

pub fn resolve_namespace(flag: Option<&str>, config: &dyn ConfigLookup) -> (String, Source) {
    resolve(&NAMESPACE_SOURCES, flag, config, Some(DEFAULT_NAMESPACE))
        .map(|(value, source)| (value.to_string(), source))
        .unwrap_or_else(|| (DEFAULT_NAMESPACE.to_string(), Source::Default))
}

pub fn resolve_context(flag: Option<&str>, config: &dyn ConfigLookup) -> Option<(String, Source)> {
    resolve(&CONTEXT_SOURCES, flag, config, None).map(|(value, source)| (value.to_string(), source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::load(dir.path().join(".dynactl").join("config")).unwrap()
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!("cluster.namespace".parse::<ConfigKey>(), Ok(ConfigKey::ClusterNamespace));
        assert_eq!(
            "registry.token".parse::<ConfigKey>(),
            Err(ConfigError::InvalidKey("registry.token".to_string()))
        );
    }

    #[test]
    fn test_secret_names() {
        assert!(is_secret(ConfigKey::RegistryPassword.as_str()));
        assert!(is_secret("registry.token"));
        assert!(!is_secret(ConfigKey::RegistryUsername.as_str()));
    }

    #[test]
    fn test_cloud_validation() {
        assert!(ConfigKey::Cloud.validate("gcp").is_ok());
        assert!(ConfigKey::Cloud.validate("on-prem").is_ok());
        assert!(ConfigKey::Cloud.validate("digitalocean").is_err());
    }

    #[test]
    fn test_namespace_validation() {
        assert!(validate_namespace("dynamo").is_ok());
        assert!(validate_namespace("team-a1").is_ok());
        assert!(validate_namespace("Dynamo").is_err());
        assert!(validate_namespace("-dynamo").is_err());
        assert!(validate_namespace("dynamo-").is_err());
        assert!(validate_namespace("dyn_amo").is_err());
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace(&"a".repeat(64)).is_err());
        assert!(validate_namespace(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_invalid_json_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::load(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_persists_and_creates_directory() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set(ConfigKey::Namespace, "dynamo").unwrap();
        store.set(ConfigKey::Cloud, "aws").unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.get(ConfigKey::Namespace), Some("dynamo"));
        assert_eq!(reloaded.get(ConfigKey::Cloud), Some("aws"));
    }

    #[test]
    fn test_invalid_value_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert!(store.set(ConfigKey::Namespace, "Not_Valid").is_err());
        assert_eq!(store.get(ConfigKey::Namespace), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_unset() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set(ConfigKey::RegistryUrl, "registry.example.com").unwrap();

        assert!(store.unset(ConfigKey::RegistryUrl).unwrap());
        assert!(!store.unset(ConfigKey::RegistryUrl).unwrap());
        assert_eq!(store_in(&dir).get(ConfigKey::RegistryUrl), None);
    }

    #[test]
    fn test_namespace_precedence() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert_eq!(resolve_namespace(None, &store), ("default".to_string(), Source::Default));

        store.set(ConfigKey::ClusterNamespace, "from-cluster").unwrap();
        assert_eq!(
            resolve_namespace(None, &store),
            ("from-cluster".to_string(), Source::Key(ConfigKey::ClusterNamespace))
        );

        store.set(ConfigKey::Namespace, "from-key").unwrap();
        assert_eq!(
            resolve_namespace(None, &store),
            ("from-key".to_string(), Source::Key(ConfigKey::Namespace))
        );

        assert_eq!(
            resolve_namespace(Some("from-flag"), &store),
            ("from-flag".to_string(), Source::Flag)
        );
    }

    #[test]
    fn test_context_precedence() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert_eq!(resolve_context(None, &store), None);

        store.set(ConfigKey::ClusterContext, "staging").unwrap();
        assert_eq!(
            resolve_context(None, &store),
            Some(("staging".to_string(), Source::Key(ConfigKey::ClusterContext)))
        );
        assert_eq!(
            resolve_context(Some("prod"), &store),
            Some(("prod".to_string(), Source::Flag))
        );
    }
}
