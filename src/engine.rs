use tracing::{debug, info};

use crate::{
    features::encode,
    model::{Classifier, InferenceError, ModelInfo, StressLabel},
    types::{PredictResponse, StudentProfile},
};

const LOW_RECOMMENDATIONS: &[&str] = &[
    "Maintain your current routine",
    "Continue with your healthy habits",
    "Regular check-ins with yourself to monitor stress levels",
];

const MODERATE_RECOMMENDATIONS: &[&str] = &[
    "Consider implementing structured study breaks",
    "Try some light exercise or meditation",
    "Ensure you're maintaining a balanced diet",
    "Talk to friends or family about your concerns",
];

const HIGH_RECOMMENDATIONS: &[&str] = &[
    "Speak with a counselor or advisor",
    "Prioritize mental health and self-care",
    "Consider reducing commitments where possible",
    "Practice stress-reduction techniques daily",
    "Ensure adequate sleep and nutrition",
];

const FALLBACK_RECOMMENDATIONS: &[&str] = &["Consult with a wellness professional"];

pub fn recommendations_for(category: &str) -> &'static [&'static str] {
    match category {
        "Low" => LOW_RECOMMENDATIONS,
        "Moderate" => MODERATE_RECOMMENDATIONS,
        "High" => HIGH_RECOMMENDATIONS,
        _ => FALLBACK_RECOMMENDATIONS,
    }
}

/// Owns the classifier for the lifetime of the process. Every method takes
/// `&self`, so a single instance is shared across request handlers.
pub struct PredictionService<C: Classifier> {
    classifier: C,
    info: ModelInfo,
}

impl<C: Classifier> PredictionService<C> {
    pub fn new(classifier: C) -> Self {
        let info = classifier.info();
        Self { classifier, info }
    }

    pub fn model_info(&self) -> &ModelInfo {
        &self.info
    }

    /// Runs one prediction for an already validated profile.
    pub fn predict(&self, profile: &StudentProfile) -> Result<PredictResponse, InferenceError> {
        let features = encode(profile);
        debug!("Encoded features: {:?}", features.named().collect::<Vec<_>>());

        let label = self.classifier.predict(&features)?;
        let proba = self.classifier.predict_proba(&features)?;
        let confidence = max_probability(&proba)?;

        info!("Prediction made: {} with confidence {:.4}", label, confidence);

        let stress_level = label.to_category();
        let recommendations = recommendations_for(stress_level.as_str())
            .iter()
            .map(|r| r.to_string())
            .collect();

        Ok(PredictResponse {
            stress_level,
            confidence,
            recommendations,
        })
    }
}

fn max_probability(proba: &[f64]) -> Result<f64, InferenceError> {
    if proba.is_empty() {
        return Err(InferenceError::EmptyDistribution);
    }

    let mut max = f64::NEG_INFINITY;
    for &p in proba {
        if !p.is_finite() {
            return Err(InferenceError::NonFinite);
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(InferenceError::OutOfRange(p));
        }
        max = max.max(p);
    }
    Ok(max)
}
