pub mod server;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DashError;
pub use server::{LuciPackage, OpenWrtAccess, ServerProfile};

fn default_timeout_secs() -> u64 {
    10
}

/// clashdash application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Saved controllers
    #[serde(default)]
    pub servers: Vec<ServerProfile>,

    /// Server used when `--server` is not given
    #[serde(default)]
    pub default_server: Option<String>,

    /// Per-request timeout for router and controller calls
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            default_server: None,
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Get the default config file path, honouring `CLASHDASH_CONFIG`
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os("CLASHDASH_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        Ok(config_dir.join("clashdash").join("config.yaml"))
    }

    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_yaml::to_string(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Add a server; the first one added becomes the default
    pub fn add_server(&mut self, server: ServerProfile) -> Result<(), DashError> {
        let server = server.normalized();
        server.validate()?;

        if self.servers.iter().any(|s| s.name == server.name) {
            return Err(DashError::validation(format!(
                "Server '{}' already exists",
                server.name
            )));
        }

        if self.default_server.is_none() {
            self.default_server = Some(server.name.clone());
        }
        self.servers.push(server);
        Ok(())
    }

    pub fn remove_server(&mut self, name: &str) -> Result<ServerProfile, DashError> {
        let pos = self
            .servers
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| DashError::validation(format!("Server '{}' not found", name)))?;

        let removed = self.servers.remove(pos);
        if self.default_server.as_deref() == Some(name) {
            self.default_server = self.servers.first().map(|s| s.name.clone());
        }
        Ok(removed)
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), DashError> {
        if !self.servers.iter().any(|s| s.name == name) {
            return Err(DashError::validation(format!("Server '{}' not found", name)));
        }
        self.default_server = Some(name.to_string());
        Ok(())
    }

    /// Resolve a server by explicit name, then the default, then the first saved
    pub fn find_server(&self, name: Option<&str>) -> Result<&ServerProfile, DashError> {
        if let Some(name) = name {
            return self
                .servers
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| DashError::validation(format!("Server '{}' not found", name)));
        }

        self.default_server
            .as_deref()
            .and_then(|name| self.servers.iter().find(|s| s.name == name))
            .or_else(|| self.servers.first())
            .ok_or_else(|| {
                DashError::validation("No servers configured, add one with `clashdash server add`")
            })
    }
}
