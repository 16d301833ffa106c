//! Built-in PII categories.
//!
//! Each category carries its own tier and activation metadata instead of
//! deriving them from which table it sits in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "high"),
            ConfidenceTier::Medium => write!(f, "medium"),
        }
    }
}

/// How a category finds candidates in region text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Pattern(&'static str),
    /// Delegated to the name recogniser.
    Names,
}

/// Secondary check a syntactic candidate must pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    None,
    Luhn,
}

#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub name: &'static str,
    pub tier: ConfidenceTier,
    pub always_on: bool,
    pub rule: Rule,
    pub validator: Validator,
}

pub const PERSON_NAME: &str = "person_name";
pub const CREDIT_CARD: &str = "credit_card";

const fn always(name: &'static str, pattern: &'static str) -> CategorySpec {
    CategorySpec {
        name,
        tier: ConfidenceTier::High,
        always_on: true,
        rule: Rule::Pattern(pattern),
        validator: Validator::None,
    }
}

const fn optional(name: &'static str, rule: Rule) -> CategorySpec {
    CategorySpec {
        name,
        tier: ConfidenceTier::Medium,
        always_on: false,
        rule,
        validator: Validator::None,
    }
}

/// Evaluation order is the order of this table.
pub const BUILTIN: &[CategorySpec] = &[
    always("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b"),
    always("phone", r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}"),
    always("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
    CategorySpec {
        name: CREDIT_CARD,
        tier: ConfidenceTier::High,
        always_on: true,
        rule: Rule::Pattern(r"\b(?:\d{4}[-\s]?){3}\d{4}\b"),
        validator: Validator::Luhn,
    },
    always("ip_address", r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
    always("user_path_unix", r"/Users/[A-Za-z0-9_-]+"),
    always("user_path_windows", r"C:\\Users\\[A-Za-z0-9_-]+"),
    always("aws_key", r"\b(?:AKIA|ABIA|ACCA|ASIA)[A-Z0-9]{16}\b"),
    always("api_key_openai", r"\bsk-[A-Za-z0-9]{32,}\b"),
    always("api_key_github", r"\bghp_[A-Za-z0-9]{36}\b"),
    optional("url", Rule::Pattern(r#"https?://[^\s<>"{}|\\^`\[\]]+"#)),
    optional("date", Rule::Pattern(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b")),
    optional(PERSON_NAME, Rule::Names),
];

pub fn find(name: &str) -> Option<&'static CategorySpec> {
    BUILTIN.iter().find(|c| c.name == name)
}

pub fn optional_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().filter(|c| !c.always_on).map(|c| c.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = BUILTIN.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTIN.len());
    }

    #[test]
    fn test_tier_follows_activation_for_builtins() {
        for builtin in BUILTIN {
            let expected = if builtin.always_on {
                ConfidenceTier::High
            } else {
                ConfidenceTier::Medium
            };
            assert_eq!(builtin.tier, expected, "{}", builtin.name);
        }
    }

    #[test]
    fn test_optional_names() {
        let optional: Vec<_> = optional_names().collect();
        assert_eq!(optional, vec!["url", "date", PERSON_NAME]);
    }

    #[test]
    fn test_only_credit_card_uses_luhn() {
        let luhn: Vec<_> = BUILTIN
            .iter()
            .filter(|c| c.validator == Validator::Luhn)
            .map(|c| c.name)
            .collect();
        assert_eq!(luhn, vec![CREDIT_CARD]);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(ConfidenceTier::High.to_string(), "high");
        assert_eq!(ConfidenceTier::Medium.to_string(), "medium");
    }
}
