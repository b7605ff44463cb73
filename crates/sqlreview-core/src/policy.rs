//! Review policy - which rules run, at what level, with which payload

use serde::{Deserialize, Serialize};

use crate::advice::AdviceStatus;
use crate::dialect::Engine;
use crate::rules::RuleRegistry;

/// Severity a rule reports at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Error,
    #[default]
    Warning,
    Disabled,
}

impl RuleLevel {
    /// Advice status for findings, `None` when the rule is off
    pub fn status(&self) -> Option<AdviceStatus> {
        match self {
            RuleLevel::Error => Some(AdviceStatus::Error),
            RuleLevel::Warning => Some(AdviceStatus::Warning),
            RuleLevel::Disabled => None,
        }
    }
}

/// One configured rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Rule-type identifier such as `naming.table`
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub level: RuleLevel,
    /// Interpreted only by the rule's checker; null means the default payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RuleDefinition {
    pub fn new(rule_type: impl AsRef<str>, level: RuleLevel) -> Self {
        Self {
            rule_type: rule_type.as_ref().to_string(),
            level,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Configured set of rules for a review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewPolicy {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    /// Warnings fail the review, not just errors
    #[serde(default)]
    pub warning_blocks: bool,
}

impl ReviewPolicy {
    pub fn new(rules: Vec<RuleDefinition>) -> Self {
        Self {
            rules,
            warning_blocks: false,
        }
    }

    /// Every rule applicable to `engine`, at warning level with its default payload
    pub fn default_for(registry: &RuleRegistry, engine: Engine) -> Self {
        let rules = registry
            .rules(engine)
            .into_iter()
            .map(|checker| {
                RuleDefinition::new(checker.id(), RuleLevel::Warning)
                    .with_payload(checker.default_payload())
            })
            .collect();
        Self::new(rules)
    }

    /// Append a rule with its default payload
    pub fn with_rule(mut self, rule_type: impl AsRef<str>, level: RuleLevel) -> Self {
        self.rules.push(RuleDefinition::new(rule_type, level));
        self
    }

    pub fn with_warning_blocks(mut self, warning_blocks: bool) -> Self {
        self.warning_blocks = warning_blocks;
        self
    }
}
