use serde::{Deserialize, Serialize};

/// Matcher kinds offered when creating or editing a rule.
///
/// The line parser accepts any matcher string; this set only restricts
/// what users can pick for new rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "DOMAIN")]
    Domain,
    #[serde(rename = "DOMAIN-SUFFIX")]
    DomainSuffix,
    #[serde(rename = "DOMAIN-KEYWORD")]
    DomainKeyword,
    #[serde(rename = "GEOSITE")]
    GeoSite,
    #[serde(rename = "GEOIP")]
    GeoIp,
    #[serde(rename = "IP-CIDR")]
    IpCidr,
    #[serde(rename = "IP-CIDR6")]
    IpCidr6,
    #[serde(rename = "SRC-IP-CIDR")]
    SrcIpCidr,
    #[serde(rename = "SRC-PORT")]
    SrcPort,
    #[serde(rename = "DST-PORT")]
    DstPort,
    #[serde(rename = "PROCESS-NAME")]
    ProcessName,
    #[serde(rename = "RULE-SET")]
    RuleSet,
}

impl RuleType {
    pub fn from_str(s: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Domain => "DOMAIN",
            RuleType::DomainSuffix => "DOMAIN-SUFFIX",
            RuleType::DomainKeyword => "DOMAIN-KEYWORD",
            RuleType::GeoSite => "GEOSITE",
            RuleType::GeoIp => "GEOIP",
            RuleType::IpCidr => "IP-CIDR",
            RuleType::IpCidr6 => "IP-CIDR6",
            RuleType::SrcIpCidr => "SRC-IP-CIDR",
            RuleType::SrcPort => "SRC-PORT",
            RuleType::DstPort => "DST-PORT",
            RuleType::ProcessName => "PROCESS-NAME",
            RuleType::RuleSet => "RULE-SET",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RuleType::Domain => "Exact domain match",
            RuleType::DomainSuffix => "Domain and all its subdomains",
            RuleType::DomainKeyword => "Domain containing a keyword",
            RuleType::GeoSite => "Domain list from the geosite database",
            RuleType::GeoIp => "Destination IP by country code",
            RuleType::IpCidr => "Destination IPv4 range",
            RuleType::IpCidr6 => "Destination IPv6 range",
            RuleType::SrcIpCidr => "Source IP range",
            RuleType::SrcPort => "Source port",
            RuleType::DstPort => "Destination port",
            RuleType::ProcessName => "Name of the originating process",
            RuleType::RuleSet => "Rule provider by name",
        }
    }

    pub fn example(&self) -> &'static str {
        match self {
            RuleType::Domain => "www.example.com",
            RuleType::DomainSuffix => "example.com",
            RuleType::DomainKeyword => "google",
            RuleType::GeoSite => "youtube",
            RuleType::GeoIp => "CN",
            RuleType::IpCidr => "192.168.1.0/24",
            RuleType::IpCidr6 => "2001:db8::/32",
            RuleType::SrcIpCidr => "192.168.1.100/32",
            RuleType::SrcPort => "8080",
            RuleType::DstPort => "443",
            RuleType::ProcessName => "curl",
            RuleType::RuleSet => "reject-list",
        }
    }

    pub fn all() -> Vec<RuleType> {
        vec![
            RuleType::Domain,
            RuleType::DomainSuffix,
            RuleType::DomainKeyword,
            RuleType::GeoSite,
            RuleType::GeoIp,
            RuleType::IpCidr,
            RuleType::IpCidr6,
            RuleType::SrcIpCidr,
            RuleType::SrcPort,
            RuleType::DstPort,
            RuleType::ProcessName,
            RuleType::RuleSet,
        ]
    }
}

impl Default for RuleType {
    fn default() -> Self {
        RuleType::Domain
    }
}
