pub mod document;
pub mod draft;
pub mod rule;
pub mod rule_type;

pub use document::RulesDocument;
pub use draft::{RuleDraft, RuleEdit};
pub use rule::Rule;
pub use rule_type::RuleType;

/// Custom rules file managed by OpenClash on the router
pub const CUSTOM_RULES_PATH: &str = "/etc/openclash/custom/openclash_custom_rules.list";
