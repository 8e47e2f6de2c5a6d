//! Dialogue state — tracks what the bot is waiting for, per user.
//!
//! One tagged variant instead of independent flags, so invalid combinations
//! (e.g. awaiting a goal confirmation and a target weight at once) cannot
//! be represented.

use serde::{Deserialize, Serialize};

use crate::goals::GoalDirection;

/// The onboarding questions, asked in order.
///
/// Progresses linearly: Age → Height → Weight → Gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Age,
    Height,
    Weight,
    Gender,
}

impl OnboardingStep {
    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        match self {
            Self::Age => Some(Self::Height),
            Self::Height => Some(Self::Weight),
            Self::Weight => Some(Self::Gender),
            Self::Gender => None,
        }
    }

    /// The prompt asking for this step's value.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Age => "How old are you?",
            Self::Height => "Got it. What's your height in centimeters?",
            Self::Weight => "Thanks. What's your current weight in kilograms?",
            Self::Gender => "Almost done — what's your gender? (male / female / other)",
        }
    }
}

/// What the conversation is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DialogueState {
    /// Steady state — every turn goes through the intent classifier.
    Idle,
    /// Collecting a profile field.
    Onboarding { step: OnboardingStep },
    /// A goal was proposed; waiting for yes/no.
    AwaitingGoalConfirmation { direction: GoalDirection },
    /// Goal confirmed; waiting for a numeric target weight.
    AwaitingTargetWeight { direction: GoalDirection },
}

impl Default for DialogueState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Transient per-user conversational context.
///
/// Ephemeral by design: losing it degrades the current multi-turn exchange
/// but never corrupts the durable profile record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueSession {
    /// Whether the welcome line has been sent this session.
    pub started: bool,
    pub state: DialogueState,
}

impl DialogueSession {
    /// Resolve any pending sub-dialogue back to idle.
    pub fn resolve(&mut self) {
        self.state = DialogueState::Idle;
    }

    /// Reset after a farewell: the next message re-triggers the welcome.
    pub fn end(&mut self) {
        self.started = false;
        self.state = DialogueState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onboarding_steps_walk_in_order() {
        let expected = [
            OnboardingStep::Height,
            OnboardingStep::Weight,
            OnboardingStep::Gender,
        ];
        let mut current = OnboardingStep::Age;
        for next in expected {
            assert_eq!(current.next(), Some(next));
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn default_session_is_fresh() {
        let session = DialogueSession::default();
        assert!(!session.started);
        assert_eq!(session.state, DialogueState::Idle);
    }

    #[test]
    fn resolve_clears_sub_dialogue_only() {
        let mut session = DialogueSession {
            started: true,
            state: DialogueState::AwaitingGoalConfirmation {
                direction: GoalDirection::Lose,
            },
        };
        session.resolve();
        assert!(session.started);
        assert_eq!(session.state, DialogueState::Idle);
    }

    #[test]
    fn end_resets_welcome() {
        let mut session = DialogueSession {
            started: true,
            state: DialogueState::AwaitingTargetWeight {
                direction: GoalDirection::Gain,
            },
        };
        session.end();
        assert!(!session.started);
        assert_eq!(session.state, DialogueState::Idle);
    }

    #[test]
    fn state_serde_roundtrip() {
        let state = DialogueState::AwaitingTargetWeight {
            direction: GoalDirection::Lose,
        };
        let json = serde_json::to_string(&state).unwrap();
        let parsed: DialogueState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
