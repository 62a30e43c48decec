use serde::{Deserialize, Serialize};

/// Clash mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ClashMode {
    Rule,
    Global,
    Direct,
}

impl ClashMode {
    pub fn as_str(&self) -> &str {
        match self {
            ClashMode::Rule => "rule",
            ClashMode::Global => "global",
            ClashMode::Direct => "direct",
        }
    }
}

/// Version response from GET /version
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub meta: bool,
}

impl VersionResponse {
    /// Core flavour reported by the controller
    pub fn flavour(&self) -> &str {
        if self.meta {
            "Mihomo (Meta)"
        } else if self.premium {
            "Clash Premium"
        } else {
            "Clash"
        }
    }
}

/// Config response from GET /configs
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigResponse {
    #[serde(default)]
    pub port: u16,
    #[serde(rename = "socks-port", default)]
    pub socks_port: u16,
    #[serde(rename = "mixed-port", default)]
    pub mixed_port: u16,
    #[serde(rename = "allow-lan", default)]
    pub allow_lan: bool,
    #[serde(default)]
    pub mode: Option<ClashMode>,
    #[serde(rename = "log-level", default)]
    pub log_level: String,
}

/// Rule as loaded by the running core
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub payload: String,
    pub proxy: String,
}

/// Rules response from GET /rules
#[derive(Debug, Clone, Deserialize)]
pub struct RulesResponse {
    pub rules: Vec<RuntimeRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_response() {
        let json = r#"{"port":7890,"socks-port":7891,"mixed-port":7893,"allow-lan":true,"mode":"rule","log-level":"info","tun":{}}"#;
        let config: ConfigResponse = serde_json::from_str(json).unwrap();
        assert_eq!(config.mixed_port, 7893);
        assert_eq!(config.mode, Some(ClashMode::Rule));
        assert!(config.allow_lan);
    }

    #[test]
    fn test_version_flavour() {
        let version: VersionResponse =
            serde_json::from_str(r#"{"meta":true,"version":"v1.18.1"}"#).unwrap();
        assert_eq!(version.flavour(), "Mihomo (Meta)");

        let version: VersionResponse = serde_json::from_str(r#"{"version":"1.0"}"#).unwrap();
        assert_eq!(version.flavour(), "Clash");
    }

    #[test]
    fn test_rules_response() {
        let json = r#"{"rules":[{"type":"DomainSuffix","payload":"example.com","proxy":"DIRECT","size":-1}]}"#;
        let rules: RulesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(rules.rules[0].rule_type, "DomainSuffix");
        assert_eq!(rules.rules[0].proxy, "DIRECT");
    }
}
