//! Tracked weight goals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Which way the user wants their weight to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDirection {
    Lose,
    Gain,
    Maintain,
}

impl GoalDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lose => "lose",
            Self::Gain => "gain",
            Self::Maintain => "maintain",
        }
    }

    /// Parse a storage string back into a direction.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lose" => Some(Self::Lose),
            "gain" => Some(Self::Gain),
            "maintain" => Some(Self::Maintain),
            _ => None,
        }
    }
}

impl std::fmt::Display for GoalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An active tracked goal. A user has at most one; setting a new goal
/// replaces the prior one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub direction: GoalDirection,
    pub target_weight: f64,
    /// Weight on record when the goal was created.
    pub start_weight: f64,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Create a goal, enforcing direction consistency: a lose goal needs
    /// target < start, a gain goal needs target > start. Violations are
    /// rejected with a corrective prompt, never silently accepted.
    pub fn new(
        direction: GoalDirection,
        target_weight: f64,
        start_weight: f64,
    ) -> Result<Self, ChatError> {
        match direction {
            GoalDirection::Lose if target_weight >= start_weight => {
                return Err(ChatError::Validation(format!(
                    "To lose weight your target should be below your current {start_weight:.1} kg. \
                     What target would you like?"
                )));
            }
            GoalDirection::Gain if target_weight <= start_weight => {
                return Err(ChatError::Validation(format!(
                    "To gain weight your target should be above your current {start_weight:.1} kg. \
                     What target would you like?"
                )));
            }
            _ => {}
        }
        Ok(Self {
            direction,
            target_weight,
            start_weight,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lose_goal_requires_lower_target() {
        assert!(Goal::new(GoalDirection::Lose, 70.0, 80.0).is_ok());
        assert!(Goal::new(GoalDirection::Lose, 80.0, 80.0).is_err());
        assert!(Goal::new(GoalDirection::Lose, 85.0, 80.0).is_err());
    }

    #[test]
    fn gain_goal_requires_higher_target() {
        assert!(Goal::new(GoalDirection::Gain, 85.0, 80.0).is_ok());
        assert!(Goal::new(GoalDirection::Gain, 75.0, 80.0).is_err());
        assert!(Goal::new(GoalDirection::Gain, 80.0, 80.0).is_err());
    }

    #[test]
    fn maintain_accepts_any_target() {
        assert!(Goal::new(GoalDirection::Maintain, 80.0, 80.0).is_ok());
    }
}
