//! PDCA phase of a coordination session

use serde::{Deserialize, Serialize};

/// Phase of the Plan-Do-Check-Act workflow
///
/// `Plan` and `Do` carry sub-states: the plan phase loops in `PlanGathering`
/// until the minimum slot set is filled, and the do phase becomes
/// `DoActive` once agent instances have been created and verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdcaPhase {
    /// Plan phase, still gathering requirement slots
    PlanGathering,
    /// Plan phase, a plan has been proposed and awaits confirmation
    PlanReady,
    /// Do phase, no agents instantiated yet
    Do,
    /// Do phase with a verified agent team
    DoActive,
    /// Check phase, a deliverable is attached and under review
    Check,
    /// Act phase, outcome accepted
    Act,
}

impl PdcaPhase {
    pub fn as_str(&self) -> &str {
        match self {
            PdcaPhase::PlanGathering => "plan.gathering",
            PdcaPhase::PlanReady => "plan",
            PdcaPhase::Do => "do",
            PdcaPhase::DoActive => "do.active",
            PdcaPhase::Check => "check",
            PdcaPhase::Act => "act",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            PdcaPhase::PlanGathering => "Plan (gathering)",
            PdcaPhase::PlanReady => "Plan",
            PdcaPhase::Do => "Do",
            PdcaPhase::DoActive => "Do (active)",
            PdcaPhase::Check => "Check",
            PdcaPhase::Act => "Act",
        }
    }

    pub fn is_plan(&self) -> bool {
        matches!(self, PdcaPhase::PlanGathering | PdcaPhase::PlanReady)
    }

    pub fn is_do(&self) -> bool {
        matches!(self, PdcaPhase::Do | PdcaPhase::DoActive)
    }
}

impl std::fmt::Display for PdcaPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
