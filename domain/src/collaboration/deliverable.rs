//! Structured deliverable built from agent contributions
//!
//! Agents contribute structured `FIELD: value` lines; the deliverable
//! absorbs them incrementally. Goal satisfaction is a deterministic
//! predicate over the deliverable's required fields, never a model-judged
//! "looks done".

use serde::{Deserialize, Serialize};

/// One planned task inside the deliverable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub title: String,
    pub owner_role: String,
    pub estimate: String,
}

/// The structured output of a collaboration (e.g. a sprint plan)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Deliverable {
    pub objective: String,
    pub tasks: Vec<PlannedTask>,
    pub risks: Vec<String>,
    pub acceptance_criteria: Vec<String>,
}

impl Deliverable {
    /// The goal-satisfaction predicate: every required field populated.
    pub fn is_complete(&self) -> bool {
        !self.objective.is_empty()
            && !self.tasks.is_empty()
            && !self.risks.is_empty()
            && !self.acceptance_criteria.is_empty()
    }

    /// Sections still missing, for moderator prompts and failure reports.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.objective.is_empty() {
            missing.push("objective");
        }
        if self.tasks.is_empty() {
            missing.push("tasks");
        }
        if self.risks.is_empty() {
            missing.push("risks");
        }
        if self.acceptance_criteria.is_empty() {
            missing.push("acceptance_criteria");
        }
        missing
    }

    /// Parse one agent contribution and merge its structured lines.
    ///
    /// Recognized lines (case-sensitive prefixes, one per line):
    /// - `OBJECTIVE: <text>` (first one wins)
    /// - `TASK: <title> | <owner_role> | <estimate>`
    /// - `RISK: <text>`
    /// - `ACCEPTANCE: <text>`
    ///
    /// Unstructured prose is ignored.
    pub fn absorb(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("OBJECTIVE:") {
                if self.objective.is_empty() {
                    self.objective = rest.trim().to_string();
                }
            } else if let Some(rest) = line.strip_prefix("TASK:") {
                if let Some(task) = parse_task(rest) {
                    if !self.tasks.contains(&task) {
                        self.tasks.push(task);
                    }
                }
            } else if let Some(rest) = line.strip_prefix("RISK:") {
                push_unique(&mut self.risks, rest.trim());
            } else if let Some(rest) = line.strip_prefix("ACCEPTANCE:") {
                push_unique(&mut self.acceptance_criteria, rest.trim());
            }
        }
    }
}

fn parse_task(rest: &str) -> Option<PlannedTask> {
    let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [title, owner, estimate] if !title.is_empty() => Some(PlannedTask {
            title: title.to_string(),
            owner_role: owner.to_string(),
            estimate: estimate.to_string(),
        }),
        [title] if !title.is_empty() => Some(PlannedTask {
            title: title.to_string(),
            owner_role: String::new(),
            estimate: String::new(),
        }),
        _ => None,
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Check for an explicit stop token: a line that is exactly `STOP`.
pub fn contains_stop(content: &str) -> bool {
    content.lines().any(|line| line.trim() == "STOP")
}

/// Parse a declared unmet dependency: `NEEDS: <role>` means the speaker
/// is blocked on another participant's output.
pub fn parse_needs(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.trim()
            .strip_prefix("NEEDS:")
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty())
    })
}
