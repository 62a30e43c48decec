use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{DashError, DashResult};

/// Proxy manager installed in LuCI on the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuciPackage {
    OpenClash,
    /// Nikki, formerly MihomoTProxy
    Nikki,
}

impl LuciPackage {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openclash" => Some(LuciPackage::OpenClash),
            "nikki" | "mihomotproxy" => Some(LuciPackage::Nikki),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LuciPackage::OpenClash => "OpenClash",
            LuciPackage::Nikki => "Nikki",
        }
    }
}

impl Default for LuciPackage {
    fn default() -> Self {
        LuciPackage::OpenClash
    }
}

fn default_luci_port() -> u16 {
    80
}

/// LuCI login details for managing the router itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenWrtAccess {
    pub host: String,
    #[serde(default = "default_luci_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default)]
    pub package: LuciPackage,
}

/// A saved controller, optionally with router access
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerProfile {
    pub name: String,

    /// External controller host, without scheme
    pub host: String,

    pub port: u16,

    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default)]
    pub use_tls: bool,

    #[serde(default)]
    pub openwrt: Option<OpenWrtAccess>,
}

impl ServerProfile {
    /// Normalize user input: strip schemes and surrounding whitespace
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.host = clean_host(&self.host);
        if self.name.is_empty() {
            self.name = self.host.clone();
        }
        self.secret = self
            .secret
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(openwrt) = self.openwrt.as_mut() {
            openwrt.host = clean_host(&openwrt.host);
            openwrt.username = openwrt.username.trim().to_string();
        }
        self
    }

    /// Reject incomplete profiles before any request is made
    pub fn validate(&self) -> DashResult<()> {
        if self.host.is_empty() {
            return Err(DashError::validation("Controller address is required"));
        }
        if self.port == 0 {
            return Err(DashError::validation("Controller port is required"));
        }

        if let Some(openwrt) = &self.openwrt {
            if openwrt.host.is_empty() {
                return Err(DashError::validation("OpenWRT address is required"));
            }
            if openwrt.port == 0 {
                return Err(DashError::validation("OpenWRT port is required"));
            }
            if openwrt.username.is_empty() {
                return Err(DashError::validation("OpenWRT username is required"));
            }
            if openwrt.password.is_empty() {
                return Err(DashError::validation("OpenWRT password is required"));
            }
        }

        Ok(())
    }

    /// External controller base URL
    pub fn controller_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, url_host(&self.host), self.port)
    }

    /// Router access, required for rule management
    pub fn openwrt(&self) -> DashResult<&OpenWrtAccess> {
        self.openwrt.as_ref().ok_or_else(|| {
            DashError::validation(format!(
                "Server '{}' has no OpenWRT login configured",
                self.name
            ))
        })
    }
}

/// Strip a leading `http://` or `https://` and any trailing slash
pub fn clean_host(host: &str) -> String {
    let trimmed = host.trim();
    let lower = trimmed.to_ascii_lowercase();
    let without_scheme = if lower.starts_with("https://") {
        &trimmed[8..]
    } else if lower.starts_with("http://") {
        &trimmed[7..]
    } else {
        trimmed
    };
    without_scheme.trim_end_matches('/').to_string()
}

/// IPv6 literals need brackets inside a URL
fn url_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Whether the host is a name rather than an IP literal
pub fn is_hostname(host: &str) -> bool {
    let trimmed = host.trim().trim_start_matches('[').trim_end_matches(']');
    !trimmed.is_empty() && trimmed.parse::<IpAddr>().is_err()
}
