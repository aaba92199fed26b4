use tracing::trace;

use crate::types::StudentProfile;

pub const FEATURE_COUNT: usize = 27;

/// Column names in vector order. A loaded model must agree with this layout.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "cgpa",
    "hours_of_sleep",
    "study_hours_per_day",
    "social_activity_hours",
    "screen_time",
    "family_income",
    "gender_Bigender",
    "gender_Female",
    "gender_Genderfluid",
    "gender_Genderqueer",
    "gender_Male",
    "gender_Non-binary",
    "gender_Polygender",
    "academic_year_2023-2024",
    "academic_year_2024-2025",
    "academic_year_2025-2026",
    "physical_activity_moderate",
    "physical_activity_sedentary",
    "part_time_job",
    "relationship_status_in a relationship",
    "relationship_status_single",
    "academic_pressure_low",
    "academic_pressure_medium",
    "sleep_quality_good",
    "sleep_quality_poor",
    "mental_health_support",
];

const PART_TIME_JOB: usize = 19;
const MENTAL_HEALTH_SUPPORT: usize = 26;

/// A contiguous block of one-hot columns for one categorical field.
#[derive(Debug, Clone, Copy)]
pub struct OneHotGroup {
    pub field: &'static str,
    pub slots: &'static [(&'static str, usize)],
}

impl OneHotGroup {
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().map(|(_, index)| *index)
    }

    fn slot_for(&self, value: &str) -> Option<usize> {
        self.slots
            .iter()
            .find(|(category, _)| *category == value)
            .map(|(_, index)| *index)
    }
}

pub const GENDER: OneHotGroup = OneHotGroup {
    field: "gender",
    slots: &[
        ("Bigender", 7),
        ("Female", 8),
        ("Genderfluid", 9),
        ("Genderqueer", 10),
        ("Male", 11),
        ("Non-binary", 12),
        ("Polygender", 13),
    ],
};

pub const ACADEMIC_YEAR: OneHotGroup = OneHotGroup {
    field: "academic_year",
    slots: &[("2023-2024", 14), ("2024-2025", 15), ("2025-2026", 16)],
};

pub const PHYSICAL_ACTIVITY: OneHotGroup = OneHotGroup {
    field: "physical_activity",
    slots: &[("moderate", 17), ("sedentary", 18)],
};

pub const RELATIONSHIP_STATUS: OneHotGroup = OneHotGroup {
    field: "relationship_status",
    slots: &[("in a relationship", 20), ("single", 21)],
};

pub const ACADEMIC_PRESSURE: OneHotGroup = OneHotGroup {
    field: "academic_pressure",
    slots: &[("low", 22), ("medium", 23)],
};

pub const SLEEP_QUALITY: OneHotGroup = OneHotGroup {
    field: "sleep_quality",
    slots: &[("good", 24), ("poor", 25)],
};

pub const ONE_HOT_GROUPS: [OneHotGroup; 6] = [
    GENDER,
    ACADEMIC_YEAR,
    PHYSICAL_ACTIVITY,
    RELATIONSHIP_STATUS,
    ACADEMIC_PRESSURE,
    SLEEP_QUALITY,
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

/// Builds the model input for a profile.
///
/// Numeric fields are copied as-is into slots 0-6. A categorical value with
/// no column (the reference level, or anything unrecognised) leaves its whole
/// group at zero rather than failing.
pub fn encode(profile: &StudentProfile) -> FeatureVector {
    let mut values = [0.0f64; FEATURE_COUNT];

    values[0] = profile.age;
    values[1] = profile.cgpa;
    values[2] = profile.hours_of_sleep;
    values[3] = profile.study_hours_per_day;
    values[4] = profile.social_activity_hours;
    values[5] = profile.screen_time;
    values[6] = profile.family_income;

    // Same order as ONE_HOT_GROUPS
    let categories = [
        &profile.gender,
        &profile.academic_year,
        &profile.physical_activity,
        &profile.relationship_status,
        &profile.academic_pressure,
        &profile.sleep_quality,
    ];
    for (group, value) in ONE_HOT_GROUPS.iter().zip(categories) {
        set_one_hot(&mut values, group, value);
    }

    values[PART_TIME_JOB] = flag(profile.part_time_job);
    values[MENTAL_HEALTH_SUPPORT] = flag(profile.mental_health_support);

    FeatureVector(values)
}

fn set_one_hot(values: &mut [f64; FEATURE_COUNT], group: &OneHotGroup, value: &str) {
    match group.slot_for(value) {
        Some(index) => values[index] = 1.0,
        None => trace!("{} value {:?} has no column", group.field, value),
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
