use super::rule::{Rule, SECTION_MARKER};
use crate::error::{DashError, DashResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Raw(String),
    Rule {
        rule: Rule,
        /// Source text, kept until the rule is edited so untouched lines
        /// are written back byte for byte
        original: Option<String>,
    },
}

/// The custom rules file as an ordered list of lines.
///
/// Lines before the `rules:` marker, comments, and lines that do not decode
/// into a valid rule are kept verbatim. Rules are addressed by their
/// position among the valid rules only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesDocument {
    lines: Vec<Line>,
}

impl RulesDocument {
    pub fn parse(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut in_rules_section = false;

        for line in text.lines() {
            if Rule::is_section_marker(line) {
                in_rules_section = true;
                lines.push(Line::Raw(line.to_string()));
                continue;
            }

            if in_rules_section && Rule::is_candidate(line) {
                let rule = Rule::decode(line);
                if rule.is_valid() {
                    lines.push(Line::Rule {
                        rule,
                        original: Some(line.to_string()),
                    });
                    continue;
                }
            }

            lines.push(Line::Raw(line.to_string()));
        }

        Self { lines }
    }

    /// Valid rules in file order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.lines.iter().filter_map(|line| match line {
            Line::Rule { rule, .. } => Some(rule),
            Line::Raw(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.rules().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules().nth(index)
    }

    /// Append a rule after the last existing rule, creating the section if needed
    pub fn push(&mut self, rule: Rule) {
        let last_rule = self
            .lines
            .iter()
            .rposition(|line| matches!(line, Line::Rule { .. }));
        let marker = self
            .lines
            .iter()
            .position(|line| matches!(line, Line::Raw(text) if Rule::is_section_marker(text)));

        let entry = Line::Rule {
            rule,
            original: None,
        };

        match (last_rule, marker) {
            (Some(idx), _) | (None, Some(idx)) => self.lines.insert(idx + 1, entry),
            (None, None) => {
                self.lines.push(Line::Raw(SECTION_MARKER.to_string()));
                self.lines.push(entry);
            }
        }
    }

    pub fn replace(&mut self, index: usize, rule: Rule) -> DashResult<()> {
        let (slot, original) = self.rule_slot(index)?;
        *slot = rule;
        *original = None;
        Ok(())
    }

    /// Flip the enabled flag of a rule, returning its new state
    pub fn toggle(&mut self, index: usize) -> DashResult<bool> {
        let (slot, original) = self.rule_slot(index)?;
        slot.enabled = !slot.enabled;
        *original = None;
        Ok(slot.enabled)
    }

    pub fn remove(&mut self, index: usize) -> DashResult<Rule> {
        let pos = self.line_position(index)?;
        match self.lines.remove(pos) {
            Line::Rule { rule, .. } => Ok(rule),
            Line::Raw(_) => unreachable!("line_position only returns rule lines"),
        }
    }

    /// Render back to file text; untouched lines are reproduced as read
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Raw(text) => out.push_str(text),
                Line::Rule {
                    original: Some(text),
                    ..
                } => out.push_str(text),
                Line::Rule {
                    rule,
                    original: None,
                } => out.push_str(&rule.encode()),
            }
            out.push('\n');
        }
        out
    }

    fn line_position(&self, index: usize) -> DashResult<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| matches!(line, Line::Rule { .. }))
            .map(|(pos, _)| pos)
            .nth(index)
            .ok_or_else(|| {
                DashError::validation(format!(
                    "Rule #{} does not exist ({} rules loaded)",
                    index + 1,
                    self.len()
                ))
            })
    }

    fn rule_slot(&mut self, index: usize) -> DashResult<(&mut Rule, &mut Option<String>)> {
        let pos = self.line_position(index)?;
        match &mut self.lines[pos] {
            Line::Rule { rule, original } => Ok((rule, original)),
            Line::Raw(_) => unreachable!("line_position only returns rule lines"),
        }
    }
}
