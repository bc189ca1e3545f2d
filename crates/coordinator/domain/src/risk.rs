//! Risk bucketing for display and policy input.

use strum::{Display, EnumString, IntoStaticStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Display bucket for a normalized fraud-risk score in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum RiskLevel {
    /// Score below 0.3.
    Minimal,
    /// Score in `0.3..0.5`.
    Low,
    /// Score in `0.5..0.7`.
    Medium,
    /// Score in `0.7..0.8`.
    High,
    /// Score of 0.8 and above.
    Critical,
}

impl RiskLevel {
    /// Buckets a normalized score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.7 {
            RiskLevel::High
        } else if score >= 0.5 {
            RiskLevel::Medium
        } else if score >= 0.3 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }
}
