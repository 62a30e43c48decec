use super::rule::Rule;
use super::rule_type::RuleType;
use crate::error::{DashError, DashResult};

/// User input for a new or edited rule, checked before touching the router
#[derive(Debug, Clone, Default)]
pub struct RuleDraft {
    pub match_type: RuleType,
    pub target: String,
    pub action: String,
    pub comment: String,
}

impl RuleDraft {
    /// Prefill from an existing rule; unknown matcher kinds fall back to DOMAIN
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            match_type: RuleType::from_str(&rule.match_type).unwrap_or_default(),
            target: rule.target.clone(),
            action: rule.action.clone(),
            comment: rule.comment.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> DashResult<()> {
        let target = self.target.trim();
        let action = self.action.trim();

        if target.is_empty() {
            return Err(DashError::validation("Match target is required"));
        }
        if action.is_empty() {
            return Err(DashError::validation("Policy is required"));
        }

        check_field("Match target", target, &[',', '#'])?;
        check_field("Policy", action, &[',', '#'])?;
        check_field("Comment", self.comment.trim(), &['#'])?;

        Ok(())
    }

    /// Build a rule, keeping the enabled state of the rule being replaced
    pub fn into_rule(self, existing: Option<&Rule>) -> DashResult<Rule> {
        self.validate()?;

        let comment = self.comment.trim();
        let mut rule = Rule::new(
            self.match_type.as_str(),
            self.target.trim(),
            self.action.trim(),
        )
        .with_comment((!comment.is_empty()).then(|| comment.to_string()));
        rule.enabled = existing.map(|r| r.enabled).unwrap_or(true);

        Ok(rule)
    }
}

/// Fields to change on an existing rule; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct RuleEdit {
    pub match_type: Option<RuleType>,
    pub target: Option<String>,
    pub action: Option<String>,
    /// An empty string clears the comment
    pub comment: Option<String>,
}

impl RuleEdit {
    /// Merge into `existing` and validate the result.
    ///
    /// The matcher kind of `existing` is kept verbatim unless a new one is
    /// given, so kinds outside [`RuleType`] survive edits of other fields.
    pub fn apply(self, existing: &Rule) -> DashResult<Rule> {
        let keep_type = self.match_type.is_none();

        let mut draft = RuleDraft::from_rule(existing);
        if let Some(match_type) = self.match_type {
            draft.match_type = match_type;
        }
        if let Some(target) = self.target {
            draft.target = target;
        }
        if let Some(action) = self.action {
            draft.action = action;
        }
        if let Some(comment) = self.comment {
            draft.comment = comment;
        }

        let mut rule = draft.into_rule(Some(existing))?;
        if keep_type {
            rule.match_type = existing.match_type.clone();
        }
        Ok(rule)
    }
}

fn check_field(label: &str, value: &str, forbidden: &[char]) -> DashResult<()> {
    if value.contains(['\n', '\r']) {
        return Err(DashError::validation(format!(
            "{} must be a single line",
            label
        )));
    }
    if let Some(c) = value.chars().find(|c| forbidden.contains(c)) {
        return Err(DashError::validation(format!(
            "{} must not contain '{}'",
            label, c
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(target: &str, action: &str, comment: &str) -> RuleDraft {
        RuleDraft {
            match_type: RuleType::DomainSuffix,
            target: target.to_string(),
            action: action.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_required_fields() {
        assert!(matches!(
            draft("  ", "DIRECT", "").validate(),
            Err(DashError::Validation(_))
        ));
        assert!(matches!(
            draft("example.com", "", "").validate(),
            Err(DashError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_separators() {
        assert!(draft("a.com,b.com", "DIRECT", "").validate().is_err());
        assert!(draft("a.com", "DIRECT#x", "").validate().is_err());
        assert!(draft("a.com", "DIRECT", "see #12").validate().is_err());
        assert!(draft("a.com", "DIRECT", "two\nlines").validate().is_err());
        assert!(draft("a.com", "DIRECT", "note - kept").validate().is_ok());
        assert!(draft("a.com", "DIRECT", "fine, with comma").validate().is_ok());
    }

    #[test]
    fn test_into_rule_trims_and_drops_empty_comment() {
        let rule = draft(" example.com ", " DIRECT ", "  ").into_rule(None).unwrap();
        assert_eq!(rule, Rule::new("DOMAIN-SUFFIX", "example.com", "DIRECT"));
    }

    #[test]
    fn test_into_rule_keeps_enabled_state() {
        let existing = Rule::decode("##- DOMAIN,ads.com,REJECT");
        let rule = draft("ads.com", "REJECT", "blocked")
            .into_rule(Some(&existing))
            .unwrap();
        assert!(!rule.enabled);
        assert_eq!(rule.comment.as_deref(), Some("blocked"));
        assert_eq!(Rule::decode(&rule.encode()), rule);
    }

    #[test]
    fn test_edit_keeps_unknown_type() {
        let existing = Rule::decode("##- MATCH-ALL,x,DIRECT#catch all");
        let edit = RuleEdit {
            target: Some("y".to_string()),
            ..Default::default()
        };

        let rule = edit.apply(&existing).unwrap();
        assert_eq!(rule.match_type, "MATCH-ALL");
        assert_eq!(rule.target, "y");
        assert_eq!(rule.action, "DIRECT");
        assert_eq!(rule.comment.as_deref(), Some("catch all"));
        assert!(!rule.enabled);
    }

    #[test]
    fn test_edit_replaces_type_and_clears_comment() {
        let existing = Rule::decode("- MATCH-ALL,x,DIRECT#note");
        let edit = RuleEdit {
            match_type: Some(RuleType::DomainSuffix),
            comment: Some(String::new()),
            ..Default::default()
        };

        let rule = edit.apply(&existing).unwrap();
        assert_eq!(rule, Rule::new("DOMAIN-SUFFIX", "x", "DIRECT"));
    }

    #[test]
    fn test_edit_is_validated() {
        let existing = Rule::decode("- DOMAIN,a.com,DIRECT");
        let edit = RuleEdit {
            action: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(edit.apply(&existing), Err(DashError::Validation(_))));
    }

    #[test]
    fn test_from_rule_unknown_type() {
        let rule = Rule::decode("- MATCH-ALL,x,DIRECT");
        let draft = RuleDraft::from_rule(&rule);
        assert_eq!(draft.match_type, RuleType::Domain);
        assert_eq!(draft.target, "x");
    }
}
