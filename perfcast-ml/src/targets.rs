//! The performance outcomes a model can be trained to predict.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTarget {
    SatisfactionScore,
    ImprovementRank,
    JobEfficiencyRank,
}

impl PerformanceTarget {
    pub const ALL: [PerformanceTarget; 3] = [
        Self::SatisfactionScore,
        Self::ImprovementRank,
        Self::JobEfficiencyRank,
    ];

    /// Name recorded as `name_object_predict` on model cards.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SatisfactionScore => "satisfaction_score",
            Self::ImprovementRank => "improvement_rank",
            Self::JobEfficiencyRank => "job_efficiency_rank",
        }
    }
}

impl fmt::Display for PerformanceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceTarget {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == norm)
            .ok_or_else(|| {
                MlError::invalid_input(format!(
                    "unknown performance target '{s}' (expected one of: satisfaction_score, improvement_rank, job_efficiency_rank)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "satisfaction_score".parse::<PerformanceTarget>().unwrap(),
            PerformanceTarget::SatisfactionScore
        );
        assert_eq!(
            "Job-Efficiency-Rank".parse::<PerformanceTarget>().unwrap(),
            PerformanceTarget::JobEfficiencyRank
        );
        assert!("salary".parse::<PerformanceTarget>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        for target in PerformanceTarget::ALL {
            let json = serde_json::to_string(&target).unwrap();
            assert_eq!(json, format!("\"{target}\""));
        }
    }
}
