//! Weight-log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::compute_bmi;

/// One logged weight. Immutable once created; the history is an
/// append-only chronological sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub id: Uuid,
    pub weight_kg: f64,
    /// BMI computed at log time from the then-current height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl WeightEntry {
    /// Create an entry, computing BMI from the current height if known.
    pub fn new(weight_kg: f64, height_cm: Option<f64>, notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            weight_kg,
            bmi: height_cm.and_then(|h| compute_bmi(weight_kg, h)),
            notes,
            logged_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_captures_bmi_at_log_time() {
        let entry = WeightEntry::new(70.0, Some(175.0), None);
        assert_eq!(entry.bmi, Some(22.86));
    }

    #[test]
    fn entry_without_height_has_no_bmi() {
        let entry = WeightEntry::new(70.0, None, Some("morning".into()));
        assert_eq!(entry.bmi, None);
        assert_eq!(entry.notes.as_deref(), Some("morning"));
    }
}
