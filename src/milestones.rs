//! Achievement milestones over the weight-log history.
//!
//! A fixed catalog of conditions, evaluated in order after every appended
//! entry. Each milestone unlocks at most once per user; idempotence is
//! enforced by an id-set membership check before insertion.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goals::Goal;
use crate::weight::WeightEntry;

/// Catalog ids.
pub const FIRST_LOG: &str = "first-log";
pub const WEEK_STREAK: &str = "week-streak";
pub const FIVE_KG_CHANGE: &str = "five-kg-change";
pub const GOAL_REACHED: &str = "goal-reached";

/// An unlocked achievement. Never removed once inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Catalog id, e.g. "first-log".
    pub id: String,
    pub title: String,
    pub description: String,
    /// UI icon tag.
    pub icon: String,
    pub unlocked_at: DateTime<Utc>,
}

impl Milestone {
    fn unlock(id: &str, title: impl Into<String>, description: impl Into<String>, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.into(),
            description: description.into(),
            icon: icon.to_string(),
            unlocked_at: Utc::now(),
        }
    }
}

/// Evaluate the catalog against the full history and current goal state.
///
/// `unlocked` holds the ids already earned; those conditions are skipped.
/// Returns newly unlocked milestones in catalog order.
///
/// Week-streak counts logged entries, not distinct calendar days.
pub fn evaluate(
    entries: &[WeightEntry],
    goal: Option<&Goal>,
    target_weight: Option<f64>,
    unlocked: &HashSet<String>,
) -> Vec<Milestone> {
    let mut new = Vec::new();
    let Some(latest) = entries.last() else {
        return new;
    };

    if !unlocked.contains(FIRST_LOG) && entries.len() == 1 {
        new.push(Milestone::unlock(
            FIRST_LOG,
            "First log",
            "You logged your weight for the first time.",
            "seedling",
        ));
    }

    if !unlocked.contains(WEEK_STREAK) && entries.len() >= 7 {
        new.push(Milestone::unlock(
            WEEK_STREAK,
            "Week streak",
            "Seven weight logs on the books.",
            "calendar",
        ));
    }

    if !unlocked.contains(FIVE_KG_CHANGE) {
        if let Some(first) = entries.first() {
            let delta = latest.weight_kg - first.weight_kg;
            if delta.abs() >= 5.0 {
                let word = if delta < 0.0 { "lost" } else { "gained" };
                new.push(Milestone::unlock(
                    FIVE_KG_CHANGE,
                    format!("5 kg {word}"),
                    format!("You've {word} {:.1} kg since your first log.", delta.abs()),
                    "scale",
                ));
            }
        }
    }

    if !unlocked.contains(GOAL_REACHED) {
        let target = goal.map(|g| g.target_weight).or(target_weight);
        if let Some(target) = target {
            if (latest.weight_kg - target).abs() < 0.5 {
                new.push(Milestone::unlock(
                    GOAL_REACHED,
                    "Goal reached",
                    format!("You hit your target of {target:.1} kg."),
                    "trophy",
                ));
            }
        }
    }

    new
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalDirection;

    fn entry(weight: f64) -> WeightEntry {
        WeightEntry::new(weight, Some(175.0), None)
    }

    fn history(weights: &[f64]) -> Vec<WeightEntry> {
        weights.iter().map(|w| entry(*w)).collect()
    }

    #[test]
    fn first_log_on_single_entry() {
        let entries = history(&[80.0]);
        let new = evaluate(&entries, None, None, &HashSet::new());
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, FIRST_LOG);
    }

    #[test]
    fn first_log_is_idempotent() {
        let entries = history(&[80.0]);
        let unlocked: HashSet<String> = [FIRST_LOG.to_string()].into();
        assert!(evaluate(&entries, None, None, &unlocked).is_empty());
    }

    #[test]
    fn week_streak_counts_entries() {
        let entries = history(&[80.0; 6]);
        let unlocked: HashSet<String> = [FIRST_LOG.to_string()].into();
        assert!(evaluate(&entries, None, None, &unlocked).is_empty());

        let entries = history(&[80.0; 7]);
        let new = evaluate(&entries, None, None, &unlocked);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, WEEK_STREAK);
    }

    #[test]
    fn five_kg_change_records_direction() {
        let entries = history(&[80.0, 78.0, 75.0]);
        let unlocked: HashSet<String> = [FIRST_LOG.to_string()].into();
        let new = evaluate(&entries, None, None, &unlocked);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, FIVE_KG_CHANGE);
        assert!(new[0].title.contains("lost"));

        let entries = history(&[70.0, 76.0]);
        let new = evaluate(&entries, None, None, &unlocked);
        assert!(new[0].title.contains("gained"));
    }

    #[test]
    fn goal_reached_within_half_kilo() {
        let goal = Goal::new(GoalDirection::Lose, 75.0, 80.0).unwrap();
        let unlocked: HashSet<String> =
            [FIRST_LOG.to_string(), FIVE_KG_CHANGE.to_string()].into();

        let entries = history(&[80.0, 75.6]);
        assert!(evaluate(&entries, Some(&goal), None, &unlocked).is_empty());

        let entries = history(&[80.0, 75.4]);
        let new = evaluate(&entries, Some(&goal), None, &unlocked);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].id, GOAL_REACHED);
    }

    #[test]
    fn no_goal_means_no_goal_reached() {
        let entries = history(&[75.0, 75.0]);
        let unlocked: HashSet<String> = [FIRST_LOG.to_string()].into();
        assert!(evaluate(&entries, None, None, &unlocked).is_empty());
    }

    #[test]
    fn steady_loss_unlocks_in_order() {
        // [80,79,78,77,76,75] with target 75: first-log at entry 1,
        // five-kg-change and goal-reached both at entry 6, no week-streak.
        let goal = Goal::new(GoalDirection::Lose, 75.0, 80.0).unwrap();
        let mut entries = Vec::new();
        let mut unlocked = HashSet::new();
        let mut order = Vec::new();

        for w in [80.0, 79.0, 78.0, 77.0, 76.0, 75.0] {
            entries.push(entry(w));
            for m in evaluate(&entries, Some(&goal), None, &unlocked) {
                unlocked.insert(m.id.clone());
                order.push((entries.len(), m.id));
            }
        }

        assert_eq!(
            order,
            vec![
                (1, FIRST_LOG.to_string()),
                (6, FIVE_KG_CHANGE.to_string()),
                (6, GOAL_REACHED.to_string()),
            ]
        );
    }
}
