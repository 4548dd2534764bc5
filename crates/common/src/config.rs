//! Dashboard configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// HTTP listen address
    pub listen_addr: String,

    /// Container runtime connection
    pub docker: DockerConfig,

    /// File navigator limits
    pub files: FilesConfig,

    /// Interactive session bookkeeping
    pub sessions: SessionConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            docker: DockerConfig::default(),
            files: FilesConfig::default(),
            sessions: SessionConfig::default(),
        }
    }
}

/// Docker Engine connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// `unix:///var/run/docker.sock`, a bare socket path, or `tcp://host:port`.
    /// Unset means local defaults (honours `DOCKER_HOST`).
    pub host: Option<String>,

    /// Transport timeout for every API call
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout_secs: 120,
        }
    }
}

/// File navigator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Largest accepted upload body
    pub max_upload_bytes: usize,

    /// Exported as `LC_ALL` for the remote listing so columns stay parseable
    pub listing_locale: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 256 * 1024 * 1024,
            listing_locale: "C".to_string(),
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped
    pub idle_timeout_secs: u64,

    /// Upper bound on live sessions; the longest idle one is evicted first
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 60 * 60,
            max_sessions: 256,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay `DOCKHAND_*` environment variables
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(addr) = env_nonempty("DOCKHAND_WEB_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(host) = env_nonempty("DOCKHAND_DOCKER_HOST") {
            self.docker.host = Some(host);
        }
        if let Some(limit) = env_nonempty("DOCKHAND_MAX_UPLOAD_BYTES") {
            self.files.max_upload_bytes = limit.parse().map_err(|_| {
                Error::InvalidConfig(format!("DOCKHAND_MAX_UPLOAD_BYTES is not a number: {}", limit))
            })?;
        }
        if let Some(idle) = env_nonempty("DOCKHAND_SESSION_IDLE_SECS") {
            self.sessions.idle_timeout_secs = idle.parse().map_err(|_| {
                Error::InvalidConfig(format!("DOCKHAND_SESSION_IDLE_SECS is not a number: {}", idle))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.files.max_upload_bytes == 0 {
            return Err(Error::InvalidConfig("files.max_upload_bytes must be > 0".into()));
        }
        if self.sessions.max_sessions == 0 {
            return Err(Error::InvalidConfig("sessions.max_sessions must be > 0".into()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("invalid listen_addr: {}", self.listen_addr)))
    }
}

/// Config file path: `DOCKHAND_CONFIG`, else `~/.dockhand/config.toml`
pub fn default_config_path() -> PathBuf {
    match env_nonempty("DOCKHAND_CONFIG") {
        Some(path) => PathBuf::from(path),
        None => crate::default_store_path().join("config.toml"),
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = DashboardConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.files.listing_locale, "C");
        assert_eq!(cfg.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DashboardConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut cfg = DashboardConfig::default();
        cfg.docker.host = Some("unix:///run/user/1000/docker.sock".into());
        cfg.sessions.idle_timeout_secs = 30;
        cfg.save(&path).unwrap();

        let loaded = DashboardConfig::load(&path).unwrap();
        assert_eq!(loaded.docker.host.as_deref(), Some("unix:///run/user/1000/docker.sock"));
        assert_eq!(loaded.sessions.idle_timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "listen_addr = \"0.0.0.0:9000\"\n[files]\nmax_upload_bytes = 1024\n").unwrap();

        let cfg = DashboardConfig::load(&path).unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:9000");
        assert_eq!(cfg.files.max_upload_bytes, 1024);
        assert_eq!(cfg.files.listing_locale, "C");
        assert_eq!(cfg.docker.timeout_secs, 120);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = DashboardConfig::default();
        cfg.listen_addr = "not-an-addr".into();
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let mut cfg = DashboardConfig::default();
        cfg.files.max_upload_bytes = 0;
        assert!(cfg.validate().is_err());
    }
}
