use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

pub const GENDERS: &[&str] = &[
    "Bigender",
    "Female",
    "Genderfluid",
    "Genderqueer",
    "Male",
    "Non-binary",
    "Polygender",
];

pub const ACADEMIC_YEARS: &[&str] = &["2023-2024", "2024-2025", "2025-2026"];

// The first entry of each of these is the reference level and has no column.
pub const PHYSICAL_ACTIVITY_LEVELS: &[&str] = &["active", "moderate", "sedentary"];
pub const RELATIONSHIP_STATUSES: &[&str] = &["in a relationship", "single"];
pub const ACADEMIC_PRESSURE_LEVELS: &[&str] = &["high", "low", "medium"];
pub const SLEEP_QUALITIES: &[&str] = &["average", "good", "poor"];

/// Request body for `POST /predict`.
///
/// Categorical fields stay strings so the encoder can apply its
/// unknown-category fallback; [`StudentProfile::validate`] restricts them to
/// their closed enumerations before anything is encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentProfile {
    pub age: f64,
    pub cgpa: f64,
    pub hours_of_sleep: f64,
    pub study_hours_per_day: f64,
    pub social_activity_hours: f64,
    pub screen_time: f64,
    pub family_income: f64,
    pub gender: String,
    pub academic_year: String,
    pub physical_activity: String,
    pub part_time_job: bool,
    pub relationship_status: String,
    pub academic_pressure: String,
    pub sleep_quality: String,
    pub mental_health_support: bool,
}

impl StudentProfile {
    pub fn validate(&self) -> Result<(), AppError> {
        check_range("age", self.age, 15.0, Some(100.0))?;
        check_range("cgpa", self.cgpa, 0.0, Some(10.0))?;
        check_range("hours_of_sleep", self.hours_of_sleep, 0.0, Some(24.0))?;
        check_range("study_hours_per_day", self.study_hours_per_day, 0.0, Some(24.0))?;
        check_range("social_activity_hours", self.social_activity_hours, 0.0, Some(24.0))?;
        check_range("screen_time", self.screen_time, 0.0, Some(24.0))?;
        check_range("family_income", self.family_income, 0.0, None)?;

        check_member("gender", &self.gender, GENDERS)?;
        check_member("academic_year", &self.academic_year, ACADEMIC_YEARS)?;
        check_member("physical_activity", &self.physical_activity, PHYSICAL_ACTIVITY_LEVELS)?;
        check_member("relationship_status", &self.relationship_status, RELATIONSHIP_STATUSES)?;
        check_member("academic_pressure", &self.academic_pressure, ACADEMIC_PRESSURE_LEVELS)?;
        check_member("sleep_quality", &self.sleep_quality, SLEEP_QUALITIES)?;

        Ok(())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: Option<f64>) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::InvalidInput(format!("{} must be a finite number", field)));
    }

    match max {
        Some(max) if value < min || value > max => Err(AppError::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        ))),
        None if value < min => Err(AppError::InvalidInput(format!(
            "{} must be at least {}, got {}",
            field, min, value
        ))),
        _ => Ok(()),
    }
}

fn check_member(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "{} must be one of {:?}, got {:?}",
            field, allowed, value
        )))
    }
}

/// User-facing stress label.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum StressCategory {
    Low,
    Moderate,
    High,
}

impl StressCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressCategory::Low => "Low",
            StressCategory::Moderate => "Moderate",
            StressCategory::High => "High",
        }
    }

    /// Maps a string class emitted by the classifier. Unmatched labels fall
    /// back to `Moderate`.
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "low" => StressCategory::Low,
            "medium" => StressCategory::Moderate,
            "high" => StressCategory::High,
            _ => StressCategory::Moderate,
        }
    }

    /// Maps an integer class emitted by the classifier. Unmatched indices
    /// fall back to `Low`.
    pub fn from_class_index(index: i64) -> Self {
        match index {
            1 => StressCategory::Moderate,
            2 => StressCategory::High,
            _ => StressCategory::Low,
        }
    }
}

impl fmt::Display for StressCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictResponse {
    pub stress_level: StressCategory,
    pub confidence: f64,
    pub recommendations: Vec<String>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_profile;
    use super::*;

    fn rejection(profile: &StudentProfile) -> String {
        match profile.validate() {
            Err(AppError::InvalidInput(msg)) => msg,
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_sample_profile_is_valid() {
        assert!(sample_profile().validate().is_ok());
    }

    #[test]
    fn test_deserialize_request_body() {
        let body = r#"{
            "age": 20, "cgpa": 8.5, "hours_of_sleep": 7, "study_hours_per_day": 4,
            "social_activity_hours": 2, "screen_time": 5, "family_income": 50000,
            "gender": "Female", "academic_year": "2024-2025", "physical_activity": "moderate",
            "part_time_job": false, "relationship_status": "single", "academic_pressure": "low",
            "sleep_quality": "good", "mental_health_support": true
        }"#;
        let profile: StudentProfile = serde_json::from_str(body).unwrap();
        assert_eq!(profile, sample_profile());
    }

    #[test]
    fn test_cgpa_out_of_range_rejected() {
        let mut profile = sample_profile();
        profile.cgpa = 15.0;
        assert!(rejection(&profile).starts_with("cgpa must be between 0 and 10"));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let mut profile = sample_profile();
        profile.age = 15.0;
        profile.cgpa = 10.0;
        profile.hours_of_sleep = 24.0;
        profile.screen_time = 0.0;
        profile.family_income = 0.0;
        assert!(profile.validate().is_ok());

        profile.age = 14.9;
        assert!(rejection(&profile).starts_with("age"));
    }

    #[test]
    fn test_negative_income_rejected() {
        let mut profile = sample_profile();
        profile.family_income = -1.0;
        assert_eq!(rejection(&profile), "family_income must be at least 0, got -1");
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut profile = sample_profile();
        profile.study_hours_per_day = f64::NAN;
        assert_eq!(rejection(&profile), "study_hours_per_day must be a finite number");
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut profile = sample_profile();
        profile.gender = "Agender".to_string();
        assert!(rejection(&profile).starts_with("gender must be one of"));

        let mut profile = sample_profile();
        profile.sleep_quality = "Good".to_string();
        assert!(rejection(&profile).starts_with("sleep_quality"));
    }

    #[test]
    fn test_reference_levels_accepted() {
        let mut profile = sample_profile();
        profile.physical_activity = "active".to_string();
        profile.academic_pressure = "high".to_string();
        profile.sleep_quality = "average".to_string();
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_string_label_mapping() {
        assert_eq!(StressCategory::from_label("low"), StressCategory::Low);
        assert_eq!(StressCategory::from_label("LOW"), StressCategory::Low);
        assert_eq!(StressCategory::from_label("medium"), StressCategory::Moderate);
        assert_eq!(StressCategory::from_label("High"), StressCategory::High);
        assert_eq!(StressCategory::from_label("moderate"), StressCategory::Moderate);
        assert_eq!(StressCategory::from_label("extreme"), StressCategory::Moderate);
        assert_eq!(StressCategory::from_label(""), StressCategory::Moderate);
        assert_eq!(StressCategory::from_label(" low "), StressCategory::Moderate);
        assert_eq!(StressCategory::from_label("low\n"), StressCategory::Moderate);
        assert_eq!(StressCategory::from_label("high\t"), StressCategory::Moderate);
    }

    #[test]
    fn test_class_index_mapping() {
        assert_eq!(StressCategory::from_class_index(0), StressCategory::Low);
        assert_eq!(StressCategory::from_class_index(1), StressCategory::Moderate);
        assert_eq!(StressCategory::from_class_index(2), StressCategory::High);
        assert_eq!(StressCategory::from_class_index(3), StressCategory::Low);
        assert_eq!(StressCategory::from_class_index(-1), StressCategory::Low);
    }

    #[test]
    fn test_category_serializes_as_display_name() {
        let json = serde_json::to_string(&StressCategory::Moderate).unwrap();
        assert_eq!(json, "\"Moderate\"");
        assert_eq!(StressCategory::High.to_string(), "High");
    }
}
