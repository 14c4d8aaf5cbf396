use serde::{Deserialize, Serialize};

/// Operator configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// data-dir: /var/lib/appset-operator/data
/// namespace: argocd
/// reconcile-interval-secs: 10
/// gc-interval-secs: 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfigFile {
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    /// Only reconcile ArgoCD instances in this namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, alias = "reconcile-interval-secs")]
    pub reconcile_interval_secs: Option<u64>,
    #[serde(default, alias = "gc-interval-secs")]
    pub gc_interval_secs: Option<u64>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Merge an interval setting: CLI > config file > default.
/// Zero is rejected, a loop cannot tick every 0 seconds.
pub fn resolve_interval_secs(
    key: &str,
    cli: Option<u64>,
    file: Option<u64>,
    default: u64,
) -> anyhow::Result<u64> {
    let secs = cli.or(file).unwrap_or(default);
    if secs == 0 {
        anyhow::bail!("{} must be at least 1 second", key);
    }
    Ok(secs)
}
