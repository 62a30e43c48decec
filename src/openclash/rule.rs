use serde::Serialize;
use std::fmt;

/// Prefix of a commented-out (disabled) rule line
pub const DISABLED_MARKER: &str = "##";

/// Line that opens the rule section of the custom rules file
pub const SECTION_MARKER: &str = "rules:";

const ITEM_PREFIX: &str = "- ";
const DISABLED_ITEM_PREFIX: &str = "##- ";
/// Decodes back to a single `ITEM_PREFIX`
const ESCAPED_ITEM_PREFIX: &str = "--  ";

/// One routing directive from the OpenClash custom rules file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub match_type: String,
    pub target: String,
    pub action: String,
    pub enabled: bool,
    pub comment: Option<String>,
}

impl Rule {
    pub fn new(match_type: &str, target: &str, action: &str) -> Self {
        Self {
            match_type: match_type.to_string(),
            target: target.to_string(),
            action: action.to_string(),
            enabled: true,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Decode one line of the rules file.
    ///
    /// Never fails: a body with fewer than three comma separated fields
    /// yields empty `match_type`, `target` and `action`, see [`Rule::is_valid`].
    pub fn decode(line: &str) -> Self {
        let trimmed = line.trim();
        let enabled = !trimmed.starts_with(DISABLED_MARKER);

        // Markers are removed wherever they occur, not only at the start.
        let cleaned = trimmed
            .replace(DISABLED_ITEM_PREFIX, "")
            .replace(ITEM_PREFIX, "");

        let mut segments = cleaned.split('#');
        let body = segments.next().unwrap_or_default();
        let comment = segments.next().map(|c| c.trim().to_string());

        let fields: Vec<&str> = body.split(',').collect();
        let (match_type, target, action) = if fields.len() >= 3 {
            (
                fields[0].trim().to_string(),
                fields[1].trim().to_string(),
                fields[2].trim().to_string(),
            )
        } else {
            (String::new(), String::new(), String::new())
        };

        Self {
            match_type,
            target,
            action,
            enabled,
            comment,
        }
    }

    /// Render the rule in the line grammar accepted by [`Rule::decode`].
    ///
    /// A `- ` inside a field is written as `--  ` so that decoding, which
    /// strips every `- `, gives the field back unchanged.
    pub fn encode(&self) -> String {
        let prefix = if self.enabled {
            ITEM_PREFIX
        } else {
            DISABLED_ITEM_PREFIX
        };

        let mut line = format!(
            "{}{},{},{}",
            prefix,
            escape(&self.match_type),
            escape(&self.target),
            escape(&self.action)
        );
        if let Some(comment) = &self.comment {
            line.push_str(",# ");
            line.push_str(&escape(comment));
        }
        line
    }

    /// A decoded rule is usable only when its matcher kind is present
    pub fn is_valid(&self) -> bool {
        !self.match_type.is_empty()
    }

    /// Whether a trimmed line may hold a rule
    pub fn is_candidate(line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.starts_with('-') || trimmed.starts_with("##-")
    }

    pub fn is_section_marker(line: &str) -> bool {
        line.trim() == SECTION_MARKER
    }
}

fn escape(field: &str) -> String {
    field.replace(ITEM_PREFIX, ESCAPED_ITEM_PREFIX)
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_enabled_rule() {
        let rule = Rule::decode("- DOMAIN-SUFFIX,example.com,DIRECT");
        assert_eq!(rule, Rule::new("DOMAIN-SUFFIX", "example.com", "DIRECT"));
        assert!(rule.enabled);
        assert_eq!(rule.comment, None);
    }

    #[test]
    fn test_decode_disabled_rule_with_comment() {
        let rule = Rule::decode("##- DOMAIN,ads.com,REJECT# note");
        assert_eq!(rule.match_type, "DOMAIN");
        assert_eq!(rule.target, "ads.com");
        assert_eq!(rule.action, "REJECT");
        assert!(!rule.enabled);
        assert_eq!(rule.comment.as_deref(), Some("note"));
    }

    #[test]
    fn test_decode_trims_fields_and_surrounding_whitespace() {
        let rule = Rule::decode("   -  IP-CIDR , 10.0.0.0/8 ,  Proxy Group   ");
        assert_eq!(rule.match_type, "IP-CIDR");
        assert_eq!(rule.target, "10.0.0.0/8");
        assert_eq!(rule.action, "Proxy Group");
    }

    #[test]
    fn test_decode_short_body_is_degenerate() {
        let rule = Rule::decode("- DIRECT");
        assert_eq!(rule.match_type, "");
        assert_eq!(rule.target, "");
        assert_eq!(rule.action, "");
        assert!(!rule.is_valid());

        let rule = Rule::decode("- DOMAIN,only-two.com");
        assert!(!rule.is_valid());
    }

    #[test]
    fn test_decode_ignores_extra_fields_and_comment_segments() {
        let rule = Rule::decode("- IP-CIDR,192.168.0.0/16,DIRECT,no-resolve#lan#second");
        assert_eq!(rule.action, "DIRECT");
        assert_eq!(rule.comment.as_deref(), Some("lan"));
    }

    #[test]
    fn test_decode_strips_markers_anywhere() {
        // "- " inside the body is removed too, joining the surrounding text.
        let rule = Rule::decode("- DOMAIN,foo- bar.com,DIRECT");
        assert_eq!(rule.target, "foobar.com");
    }

    #[test]
    fn test_decode_empty_comment() {
        let rule = Rule::decode("- DOMAIN,a.com,DIRECT#");
        assert_eq!(rule.comment.as_deref(), Some(""));
    }

    #[test]
    fn test_encode() {
        let rule = Rule::new("DOMAIN-SUFFIX", "example.com", "DIRECT");
        assert_eq!(rule.encode(), "- DOMAIN-SUFFIX,example.com,DIRECT");

        let mut rule = Rule::new("DOMAIN", "ads.com", "REJECT")
            .with_comment(Some("blocked".to_string()));
        rule.enabled = false;
        assert_eq!(rule.encode(), "##- DOMAIN,ads.com,REJECT,# blocked");
        assert_eq!(rule.to_string(), rule.encode());
    }

    #[test]
    fn test_encode_decode_preserves_fields() {
        let lines = [
            "- DOMAIN-SUFFIX,example.com,DIRECT",
            "##- DOMAIN,ads.com,REJECT#blocked",
            "  - GEOIP , CN , DIRECT # mainland  ",
            "- IP-CIDR,10.0.0.0/8,DIRECT,no-resolve",
            "##-  DST-PORT,22,REJECT#",
            "- DOMAIN,x--  y,DIRECT",
            "- DOMAIN-KEYWORD,a--  --  b,Proxy--  1#note--  here",
        ];

        for line in lines {
            let decoded = Rule::decode(line);
            assert!(decoded.is_valid(), "{line}");
            assert_eq!(Rule::decode(&decoded.encode()), decoded, "{line}");
        }
    }

    #[test]
    fn test_encode_escapes_list_marker_in_fields() {
        let rule = Rule::decode("- DOMAIN,x--  y,DIRECT");
        assert_eq!(rule.target, "x- y");
        assert_eq!(rule.encode(), "- DOMAIN,x--  y,DIRECT");

        let rule = Rule::new("DOMAIN", "a.com", "DIRECT").with_comment(Some("- work".to_string()));
        assert_eq!(rule.encode(), "- DOMAIN,a.com,DIRECT,# --  work");
        assert_eq!(Rule::decode(&rule.encode()).comment.as_deref(), Some("- work"));
    }

    #[test]
    fn test_candidate_lines() {
        assert!(Rule::is_candidate("- DOMAIN,a.com,DIRECT"));
        assert!(Rule::is_candidate("  ##- DOMAIN,a.com,DIRECT"));
        assert!(!Rule::is_candidate("# plain comment"));
        assert!(!Rule::is_candidate("rules:"));
        assert!(Rule::is_section_marker("  rules:  "));
        assert!(!Rule::is_section_marker("rules: []"));
    }
}
