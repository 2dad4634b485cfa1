//! Tier-0 deterministic keyword rules
//!
//! Scores a user turn against ordered keyword classes to extract the
//! project type and obvious requirement slots. Classes are checked most
//! specific first, so "mobile app" wins over any generic web rule, and the
//! bare tokens "app" / "application" never classify on their own.

use super::tokenizer::{contains_phrase, tokenize};
use crate::session::slots::{self, SlotValue};
use std::collections::BTreeMap;

/// One keyword class: the project type it implies and the whole-token
/// phrases that imply it, in priority order.
struct KeywordClass {
    project_type: &'static str,
    phrases: &'static [&'static str],
}

/// Ordered most-specific-first. Order matters: "web application" contains
/// the token "application", so the mobile class must be consulted before
/// any rule that could be misled by generic tokens.
const PROJECT_CLASSES: &[KeywordClass] = &[
    KeywordClass {
        project_type: "mobile_application",
        phrases: &[
            "mobile app",
            "mobile application",
            "ios",
            "android",
            "iphone",
            "flutter",
        ],
    },
    KeywordClass {
        project_type: "web_application",
        phrases: &["web application", "web app", "webapp", "website", "web"],
    },
    KeywordClass {
        project_type: "api_service",
        phrases: &["rest api", "api", "backend", "microservice"],
    },
    KeywordClass {
        project_type: "cli_tool",
        phrases: &["cli", "command line", "terminal tool"],
    },
    KeywordClass {
        project_type: "data_pipeline",
        phrases: &["data pipeline", "etl", "data warehouse"],
    },
];

/// Technology tokens recognized for the `tech_stack` slot.
const TECH_TOKENS: &[&str] = &[
    "rust",
    "python",
    "typescript",
    "javascript",
    "go",
    "java",
    "kotlin",
    "swift",
    "react",
    "vue",
    "django",
    "rails",
    "node",
    "postgres",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
];

/// Tokens that mark a number as a head count.
const TEAM_TOKENS: &[&str] = &["people", "person", "developers", "developer", "engineers"];

/// Result of running the tier-0 rules over one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleClassification {
    /// Extracted project type, if any class matched
    pub project_type: Option<String>,
    /// Obvious slots extracted alongside (tech stack, team size, features)
    pub slots: BTreeMap<String, SlotValue>,
    /// Extraction confidence in [0, 1]; 0.0 when nothing classified
    pub confidence: f64,
}

/// Run the deterministic keyword rules over one user turn.
pub fn classify(text: &str) -> RuleClassification {
    let tokens = tokenize(text);
    let mut slots = BTreeMap::new();

    let project_type = PROJECT_CLASSES
        .iter()
        .find(|class| {
            class
                .phrases
                .iter()
                .any(|phrase| contains_phrase(&tokens, phrase))
        })
        .map(|class| class.project_type.to_string());

    if let Some(pt) = &project_type {
        slots.insert(
            slots::PROJECT_TYPE.to_string(),
            SlotValue::stated(pt.clone()),
        );
    }

    let tech: Vec<&str> = TECH_TOKENS
        .iter()
        .copied()
        .filter(|t| tokens.iter().any(|token| token == t))
        .collect();
    if !tech.is_empty() {
        slots.insert(
            slots::TECH_STACK.to_string(),
            SlotValue::stated(tech.join(", ")),
        );
    }

    if let Some(size) = extract_team_size(&tokens) {
        slots.insert(
            slots::TEAM_SIZE.to_string(),
            SlotValue::stated(size.to_string()),
        );
    }

    if let Some(features) = extract_features(&tokens) {
        slots.insert(slots::KEY_FEATURES.to_string(), SlotValue::stated(features));
    }

    let confidence = score(&project_type, &slots);

    RuleClassification {
        project_type,
        slots,
        confidence,
    }
}

/// A number token immediately followed by a head-count token
/// ("4 developers", "3 people").
fn extract_team_size(tokens: &[String]) -> Option<u32> {
    tokens.windows(2).find_map(|pair| {
        let count: u32 = pair[0].parse().ok()?;
        if TEAM_TOKENS.contains(&pair[1].as_str()) {
            Some(count)
        } else {
            None
        }
    })
}

/// Everything after the first "for" token is taken as the feature phrase
/// ("... for tracking fitness goals" → "tracking fitness goals").
fn extract_features(tokens: &[String]) -> Option<String> {
    let pos = tokens.iter().position(|t| t == "for")?;
    let rest = &tokens[pos + 1..];
    if rest.is_empty() {
        return None;
    }
    Some(rest.join(" "))
}

/// Confidence: a matched project class carries most of the weight, each
/// additional slot adds a little. No project type means no classification.
fn score(project_type: &Option<String>, slots: &BTreeMap<String, SlotValue>) -> f64 {
    if project_type.is_none() {
        return 0.0;
    }
    let extra_slots = slots.len().saturating_sub(1);
    (0.85 + 0.04 * extra_slots as f64).min(0.95)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_application_never_classified_as_mobile() {
        let result = classify("I want to build a web application for tracking fitness goals");
        assert_eq!(result.project_type.as_deref(), Some("web_application"));
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn test_mobile_whole_tokens_classify_as_mobile() {
        for text in [
            "a mobile app for notes",
            "an ios client",
            "android game with friends",
        ] {
            let result = classify(text);
            assert_eq!(
                result.project_type.as_deref(),
                Some("mobile_application"),
                "input: {text}"
            );
        }
    }

    #[test]
    fn test_bare_application_does_not_classify() {
        let result = classify("I need an application");
        assert_eq!(result.project_type, None);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_extracts_features_after_for() {
        let result = classify("a web app for tracking fitness goals");
        assert_eq!(
            result.slots.get(crate::session::slots::KEY_FEATURES).map(|s| s.value.as_str()),
            Some("tracking fitness goals")
        );
    }

    #[test]
    fn test_extracts_tech_stack_and_team_size() {
        let result = classify("web app in rust and postgres with 4 developers");
        assert_eq!(
            result.slots.get(crate::session::slots::TECH_STACK).map(|s| s.value.as_str()),
            Some("rust, postgres")
        );
        assert_eq!(
            result.slots.get(crate::session::slots::TEAM_SIZE).map(|s| s.value.as_str()),
            Some("4")
        );
    }

    #[test]
    fn test_team_size_requires_head_count_token() {
        let result = classify("a web app with 4 screens");
        assert!(!result.slots.contains_key(crate::session::slots::TEAM_SIZE));
    }

    #[test]
    fn test_confidence_grows_with_slots_but_caps() {
        let bare = classify("build a website");
        let rich = classify("a web app in rust for 3 people for tracking workouts");
        assert!(rich.confidence > bare.confidence);
        assert!(rich.confidence <= 0.95);
    }
}
