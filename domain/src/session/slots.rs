//! Requirement slots gathered during the plan phase

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known slot keys
pub const PROJECT_TYPE: &str = "project_type";
pub const TECH_STACK: &str = "tech_stack";
pub const TEAM_SIZE: &str = "team_size";
pub const KEY_FEATURES: &str = "key_features";

/// The slots that can satisfy the "at least one of" half of the minimum
/// slot set, alongside the mandatory project type.
const SUPPORTING_SLOTS: &[&str] = &[TECH_STACK, TEAM_SIZE, KEY_FEATURES];

/// A requirement value extracted from conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotValue {
    pub value: String,
    /// True when the value was filled by forced progression defaults
    /// rather than stated by the user.
    pub assumed: bool,
}

impl SlotValue {
    /// A value the user actually stated
    pub fn stated(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            assumed: false,
        }
    }

    /// A default the coordinator assumed when gathering was cut short
    pub fn assumed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            assumed: true,
        }
    }
}

/// Check the configurable minimum slot set: project type plus at least one
/// supporting slot (tech stack, team size, or key features).
pub fn minimum_set_filled(slots: &BTreeMap<String, SlotValue>) -> bool {
    slots.contains_key(PROJECT_TYPE)
        && SUPPORTING_SLOTS.iter().any(|key| slots.contains_key(*key))
}

/// Slots still missing from the minimum set, in a stable order. Used to
/// target clarifying questions at a concrete gap.
pub fn missing_from_minimum_set(slots: &BTreeMap<String, SlotValue>) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !slots.contains_key(PROJECT_TYPE) {
        missing.push(PROJECT_TYPE);
    }
    if !SUPPORTING_SLOTS.iter().any(|key| slots.contains_key(*key)) {
        missing.push(TECH_STACK);
    }
    missing
}

/// Fill whatever the minimum set still lacks with defaults flagged as
/// assumed. Called when the gathering loop hits its turn cap.
pub fn fill_assumed_defaults(slots: &mut BTreeMap<String, SlotValue>) {
    if !slots.contains_key(PROJECT_TYPE) {
        slots.insert(
            PROJECT_TYPE.to_string(),
            SlotValue::assumed("web_application"),
        );
    }
    if !SUPPORTING_SLOTS.iter().any(|key| slots.contains_key(*key)) {
        slots.insert(TEAM_SIZE.to_string(), SlotValue::assumed("4"));
    }
}

/// A human-readable question for the first missing slot.
pub fn question_for(missing: &str) -> String {
    match missing {
        PROJECT_TYPE => {
            "What kind of project is this (web application, mobile app, API, CLI)?".to_string()
        }
        TECH_STACK => {
            "Do you have a tech stack, team size, or key features in mind?".to_string()
        }
        other => format!("Could you tell me about {other}?"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_set_requires_project_type() {
        let mut slots = BTreeMap::new();
        slots.insert(TECH_STACK.to_string(), SlotValue::stated("rust"));
        assert!(!minimum_set_filled(&slots));

        slots.insert(
            PROJECT_TYPE.to_string(),
            SlotValue::stated("web_application"),
        );
        assert!(minimum_set_filled(&slots));
    }

    #[test]
    fn test_project_type_alone_is_not_enough() {
        let mut slots = BTreeMap::new();
        slots.insert(
            PROJECT_TYPE.to_string(),
            SlotValue::stated("web_application"),
        );
        assert!(!minimum_set_filled(&slots));
        assert_eq!(missing_from_minimum_set(&slots), vec![TECH_STACK]);
    }

    #[test]
    fn test_fill_assumed_defaults_flags_values() {
        let mut slots = BTreeMap::new();
        fill_assumed_defaults(&mut slots);
        assert!(minimum_set_filled(&slots));
        assert!(slots.values().all(|v| v.assumed));
    }

    #[test]
    fn test_fill_assumed_defaults_keeps_stated_values() {
        let mut slots = BTreeMap::new();
        slots.insert(
            PROJECT_TYPE.to_string(),
            SlotValue::stated("mobile_application"),
        );
        fill_assumed_defaults(&mut slots);
        assert_eq!(slots[PROJECT_TYPE].value, "mobile_application");
        assert!(!slots[PROJECT_TYPE].assumed);
    }
}
