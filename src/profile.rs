//! User profile and derived health metrics.
//!
//! The three calculator functions (`compute_bmi`, `categorize_bmi`,
//! `daily_calories`) are pure and are always applied together via
//! [`UserProfile::refresh_derived`] whenever a biometric changes, so the
//! derived fields never disagree with the current age/height/weight/gender.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// User gender as captured during onboarding.
///
/// Free text that isn't recognized as male/female is preserved verbatim;
/// the calorie formula then uses the non-male constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other(String),
}

impl Gender {
    /// Parse user text into a gender. Exact word match, not substring —
    /// "female" contains "male" and must not match it.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "male" | "m" | "man" => Self::Male,
            "female" | "f" | "woman" => Self::Female,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical storage string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// WHO BMI bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Underweight => "underweight",
            Self::Normal => "normal",
            Self::Overweight => "overweight",
            Self::Obese => "obese",
        }
    }

    /// Parse a storage string back into a category.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "underweight" => Some(Self::Underweight),
            "normal" => Some(Self::Normal),
            "overweight" => Some(Self::Overweight),
            "obese" => Some(Self::Obese),
            _ => None,
        }
    }
}

impl std::fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// BMI = weight / height_m², rounded to 2 decimal places.
///
/// Returns `None` (never panics) on non-positive or non-finite input.
pub fn compute_bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if !weight_kg.is_finite() || !height_cm.is_finite() || weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);
    Some((bmi * 100.0).round() / 100.0)
}

/// Band a BMI value. Boundary values belong to the upper band
/// (18.5 is Normal, 25.0 is Overweight, 30.0 is Obese).
pub fn categorize_bmi(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

/// Mifflin-St Jeor daily calorie estimate. No rounding at this layer;
/// the display layer rounds.
pub fn daily_calories(weight_kg: f64, height_cm: f64, age_years: u32, gender: &Gender) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years);
    match gender {
        Gender::Male => base + 5.0,
        _ => base - 161.0,
    }
}

/// Durable per-user profile.
///
/// Invariant: `completed == true` implies age, height, weight, gender, bmi
/// and daily_calories are all set. Mutation goes through the onboarding
/// sub-dialogue or the one-shot setup; derived fields are only written by
/// [`UserProfile::refresh_derived`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi_category: Option<BmiCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Recompute bmi, bmi_category and daily_calories from the current
    /// biometrics. Clears all three when any input is missing.
    pub fn refresh_derived(&mut self) {
        let (Some(age), Some(height), Some(weight), Some(gender)) =
            (self.age, self.height_cm, self.weight_kg, self.gender.as_ref())
        else {
            self.bmi = None;
            self.bmi_category = None;
            self.daily_calories = None;
            return;
        };
        self.bmi = compute_bmi(weight, height);
        self.bmi_category = self.bmi.map(categorize_bmi);
        self.daily_calories = Some(daily_calories(weight, height, age, gender));
    }

    /// Short summary used as generator context, e.g.
    /// "age 30, height 175 cm, weight 70 kg, gender male".
    pub fn summary(&self) -> Option<String> {
        if !self.completed {
            return None;
        }
        let (age, height, weight, gender) = (
            self.age?,
            self.height_cm?,
            self.weight_kg?,
            self.gender.as_ref()?,
        );
        Some(format!(
            "age {age}, height {height:.0} cm, weight {weight:.1} kg, gender {gender}"
        ))
    }
}

/// One-shot profile setup payload (the non-chat boundary path).
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSetup {
    pub age: u32,
    pub height_cm: u32,
    pub weight_kg: u32,
    pub gender: String,
}

impl ProfileSetup {
    /// Validate and apply onto a profile. All four fields are required and
    /// positive or the whole operation is rejected.
    pub fn apply(&self, profile: &mut UserProfile) -> Result<(), ChatError> {
        if self.age == 0 || self.height_cm == 0 || self.weight_kg == 0 || self.gender.trim().is_empty()
        {
            return Err(ChatError::Validation(
                "Please fill in all fields: age, height, weight and gender.".to_string(),
            ));
        }
        profile.age = Some(self.age);
        profile.height_cm = Some(f64::from(self.height_cm));
        profile.weight_kg = Some(f64::from(self.weight_kg));
        profile.gender = Some(Gender::parse(&self.gender));
        profile.completed = true;
        profile.completed_at = Some(Utc::now());
        profile.refresh_derived();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmi_basic() {
        // 70kg at 1.75m → 22.86
        assert_eq!(compute_bmi(70.0, 175.0), Some(22.86));
    }

    #[test]
    fn bmi_invalid_inputs() {
        assert_eq!(compute_bmi(0.0, 175.0), None);
        assert_eq!(compute_bmi(70.0, 0.0), None);
        assert_eq!(compute_bmi(-5.0, 175.0), None);
        assert_eq!(compute_bmi(f64::NAN, 175.0), None);
        assert_eq!(compute_bmi(70.0, f64::INFINITY), None);
    }

    #[test]
    fn category_boundaries() {
        assert_eq!(categorize_bmi(18.49), BmiCategory::Underweight);
        assert_eq!(categorize_bmi(18.5), BmiCategory::Normal);
        assert_eq!(categorize_bmi(24.99), BmiCategory::Normal);
        assert_eq!(categorize_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(categorize_bmi(29.99), BmiCategory::Overweight);
        assert_eq!(categorize_bmi(30.0), BmiCategory::Obese);
    }

    #[test]
    fn calories_mifflin_st_jeor() {
        let male = daily_calories(70.0, 175.0, 30, &Gender::Male);
        assert!((male - 1648.75).abs() < 1e-9);

        let female = daily_calories(70.0, 175.0, 30, &Gender::Female);
        assert!((female - 1482.75).abs() < 1e-9);

        // Unrecognized gender uses the non-male constant
        let other = daily_calories(70.0, 175.0, 30, &Gender::Other("nonbinary".into()));
        assert!((other - 1482.75).abs() < 1e-9);
    }

    #[test]
    fn gender_parse_is_exact() {
        assert_eq!(Gender::parse("Male"), Gender::Male);
        assert_eq!(Gender::parse(" f "), Gender::Female);
        // "female" must not substring-match "male"
        assert_eq!(Gender::parse("female"), Gender::Female);
        assert_eq!(
            Gender::parse("nonbinary"),
            Gender::Other("nonbinary".to_string())
        );
    }

    #[test]
    fn refresh_derived_keeps_fields_in_step() {
        let mut profile = UserProfile {
            age: Some(30),
            height_cm: Some(175.0),
            weight_kg: Some(70.0),
            gender: Some(Gender::Male),
            ..Default::default()
        };
        profile.refresh_derived();
        assert_eq!(profile.bmi, Some(22.86));
        assert_eq!(profile.bmi_category, Some(BmiCategory::Normal));
        assert!(profile.daily_calories.is_some());

        // Dropping an input clears all derived fields together
        profile.age = None;
        profile.refresh_derived();
        assert_eq!(profile.bmi, None);
        assert_eq!(profile.bmi_category, None);
        assert_eq!(profile.daily_calories, None);
    }

    #[test]
    fn setup_rejects_missing_fields() {
        let setup = ProfileSetup {
            age: 0,
            height_cm: 170,
            weight_kg: 65,
            gender: "male".into(),
        };
        let mut profile = UserProfile::default();
        assert!(setup.apply(&mut profile).is_err());
        assert!(!profile.completed);
    }

    #[test]
    fn setup_completes_profile() {
        let setup = ProfileSetup {
            age: 25,
            height_cm: 170,
            weight_kg: 65,
            gender: "male".into(),
        };
        let mut profile = UserProfile::default();
        setup.apply(&mut profile).unwrap();
        assert!(profile.completed);
        assert_eq!(profile.bmi, Some(22.49));
        assert_eq!(profile.bmi_category, Some(BmiCategory::Normal));
        assert!(profile.summary().unwrap().contains("age 25"));
    }
}
