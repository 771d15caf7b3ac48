use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::retry::RetryOn;

/// Retry defaults (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the initial attempt for calls that do not specify a
    /// ceiling of their own. Zero means no retries.
    pub default_retry_count: u32,
    /// Which failures are eligible: "all_failures" or "transient".
    #[serde(default)]
    pub retry_on: RetryOn,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_retry_count: 0,
            retry_on: RetryOn::AllFailures,
        }
    }
}

/// Client configuration loaded from `~/.config/evreq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Headers merged under each task's own headers (task headers win).
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert(
            "Accept-Encoding".to_string(),
            "gzip;q=1.0, compress;q=0.5".to_string(),
        );
        Self {
            user_agent: format!("evreq/{}", env!("CARGO_PKG_VERSION")),
            default_headers,
            retry: RetryConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("evreq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClientConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ClientConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ClientConfig::default();
        assert!(cfg.user_agent.starts_with("evreq/"));
        assert!(cfg.default_headers.contains_key("Accept-Encoding"));
        assert_eq!(cfg.retry.default_retry_count, 0);
        assert_eq!(cfg.retry.retry_on, RetryOn::AllFailures);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ClientConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.user_agent, cfg.user_agent);
        assert_eq!(parsed.retry.default_retry_count, cfg.retry.default_retry_count);
        assert_eq!(parsed.retry.retry_on, cfg.retry.retry_on);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            user_agent = "probe/2.0"

            [default_headers]
            "X-Env" = "staging"

            [retry]
            default_retry_count = 3
            retry_on = "transient"
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.user_agent, "probe/2.0");
        assert_eq!(cfg.default_headers.get("X-Env").unwrap(), "staging");
        assert_eq!(cfg.retry.default_retry_count, 3);
        assert_eq!(cfg.retry.retry_on, RetryOn::Transient);
    }

    #[test]
    fn retry_section_is_optional() {
        let cfg: ClientConfig = toml::from_str(r#"user_agent = "x""#).unwrap();
        assert_eq!(cfg.retry.default_retry_count, 0);
        assert_eq!(cfg.retry.retry_on, RetryOn::AllFailures);
    }
}
