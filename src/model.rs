use chrono::{DateTime, Utc};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
    features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES},
    types::StressCategory,
};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Model file not found at {}. Please ensure the trained model is in the models folder.", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model artifact does not match the feature layout: {0}")]
    Shape(String),
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("classifier returned an empty probability distribution")]
    EmptyDistribution,

    #[error("classifier returned a non-finite probability")]
    NonFinite,

    #[error("probability {0} is outside [0, 1]")]
    OutOfRange(f64),

    #[cfg(test)]
    #[error("{0}")]
    Backend(String),
}

/// A raw class emitted by a classifier that can be shown to users.
pub trait StressLabel: fmt::Display {
    fn to_category(&self) -> StressCategory;
}

impl StressLabel for String {
    fn to_category(&self) -> StressCategory {
        StressCategory::from_label(self)
    }
}

impl StressLabel for i64 {
    fn to_category(&self) -> StressCategory {
        StressCategory::from_class_index(*self)
    }
}

/// Inference capability consumed by the prediction service.
///
/// Each implementation commits to one label contract through `Label`; string
/// and integer class labels are never mixed in a single model.
pub trait Classifier: Send + Sync + 'static {
    type Label: StressLabel;

    fn predict(&self, features: &FeatureVector) -> Result<Self::Label, InferenceError>;

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError>;

    fn info(&self) -> ModelInfo;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub version: String,
    pub classes: Vec<String>,
    pub feature_count: usize,
    pub sha256: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// On-disk layout of `models/stress_level_model.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_version")]
    pub version: String,
    pub classes: Vec<String>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

/// Multinomial logistic regression over the 27-column layout.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    classes: Vec<String>,
    coefficients: DMatrix<f64>,
    intercepts: DVector<f64>,
    version: String,
    sha256: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
}

impl LogisticModel {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(|source| {
            let err = if source.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound { path: path.to_path_buf() }
            } else {
                LoadError::Io { path: path.to_path_buf(), source }
            };
            error!("{}", err);
            err
        })?;

        let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
        let mut model = Self::from_artifact(artifact)?;
        model.sha256 = Some(hex::encode(Sha256::digest(&bytes)));
        model.loaded_at = Some(Utc::now());

        info!(
            "Model loaded successfully from {} (version {}, classes {:?})",
            path.display(),
            model.version,
            model.classes
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, LoadError> {
        let n_classes = artifact.classes.len();
        if n_classes < 2 {
            return Err(LoadError::Shape(format!(
                "expected at least 2 classes, got {}",
                n_classes
            )));
        }
        if artifact.coefficients.len() != n_classes {
            return Err(LoadError::Shape(format!(
                "{} coefficient rows for {} classes",
                artifact.coefficients.len(),
                n_classes
            )));
        }
        if artifact.intercepts.len() != n_classes {
            return Err(LoadError::Shape(format!(
                "{} intercepts for {} classes",
                artifact.intercepts.len(),
                n_classes
            )));
        }
        for (class, row) in artifact.classes.iter().zip(&artifact.coefficients) {
            if row.len() != FEATURE_COUNT {
                return Err(LoadError::Shape(format!(
                    "class {:?} has {} coefficients, expected {}",
                    class,
                    row.len(),
                    FEATURE_COUNT
                )));
            }
        }
        if let Some(names) = &artifact.feature_names {
            if names.len() != FEATURE_COUNT || names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b) {
                return Err(LoadError::Shape(
                    "feature_names differ from the encoder column order".to_string(),
                ));
            }
        }
        let all_finite = artifact
            .coefficients
            .iter()
            .flatten()
            .chain(&artifact.intercepts)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(LoadError::Shape("non-finite weight".to_string()));
        }

        let flat: Vec<f64> = artifact.coefficients.into_iter().flatten().collect();
        let coefficients = DMatrix::from_row_slice(n_classes, FEATURE_COUNT, &flat);
        let intercepts = DVector::from_vec(artifact.intercepts);

        debug!("Built logistic model with {} classes", n_classes);

        Ok(Self {
            classes: artifact.classes,
            coefficients,
            intercepts,
            version: artifact.version,
            sha256: None,
            loaded_at: None,
        })
    }

    fn probabilities(&self, features: &FeatureVector) -> Result<DVector<f64>, InferenceError> {
        let x = DVector::from_vec(features.as_slice().to_vec());
        let logits = &self.coefficients * x + &self.intercepts;

        // Shift by the max logit so exp() cannot overflow.
        let max = logits.max();
        let exp = logits.map(|z| (z - max).exp());
        let total = exp.sum();
        let proba = exp / total;

        if proba.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::NonFinite);
        }
        Ok(proba)
    }
}

impl Classifier for LogisticModel {
    type Label = String;

    fn predict(&self, features: &FeatureVector) -> Result<String, InferenceError> {
        let proba = self.probabilities(features)?;
        // First maximum wins on ties.
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(self.classes[best].clone())
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        Ok(self.probabilities(features)?.iter().copied().collect())
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            version: self.version.clone(),
            classes: self.classes.clone(),
            feature_count: FEATURE_COUNT,
            sha256: self.sha256.clone(),
            loaded_at: self.loaded_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::artifact;
    use super::*;
    use crate::features::encode;
    use crate::types::fixtures::sample_profile;
    use std::io::Write;

    fn write_artifact(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_artifact() {
        let file = write_artifact(&serde_json::to_string(&artifact()).unwrap());
        let model = LogisticModel::load(file.path()).unwrap();

        let info = model.info();
        assert_eq!(info.version, "test-1");
        assert_eq!(info.classes, vec!["high", "low", "medium"]);
        assert_eq!(info.feature_count, 27);
        assert_eq!(info.sha256.as_deref().map(str::len), Some(64));
        assert!(info.loaded_at.is_some());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("stress_level_model.json");
        match LogisticModel::load(&path) {
            Err(LoadError::NotFound { path: reported }) => assert_eq!(reported, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_artifact_rejected() {
        let file = write_artifact("{\"classes\": [\"low\"");
        assert!(matches!(LogisticModel::load(file.path()), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_row_width_must_match_layout() {
        let mut bad = artifact();
        bad.coefficients[2].push(0.0);
        let err = LogisticModel::from_artifact(bad).unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
        assert!(err.to_string().contains("28 coefficients, expected 27"));
    }

    #[test]
    fn test_class_and_intercept_counts_checked() {
        let mut bad = artifact();
        bad.intercepts.pop();
        assert!(matches!(LogisticModel::from_artifact(bad), Err(LoadError::Shape(_))));

        let mut bad = artifact();
        bad.classes.truncate(1);
        bad.coefficients.truncate(1);
        bad.intercepts.truncate(1);
        assert!(matches!(LogisticModel::from_artifact(bad), Err(LoadError::Shape(_))));
    }

    #[test]
    fn test_feature_names_must_match_encoder() {
        let mut bad = artifact();
        if let Some(names) = bad.feature_names.as_mut() {
            names.swap(0, 1);
        }
        assert!(matches!(LogisticModel::from_artifact(bad), Err(LoadError::Shape(_))));

        let mut unnamed = artifact();
        unnamed.feature_names = None;
        assert!(LogisticModel::from_artifact(unnamed).is_ok());
    }

    #[test]
    fn test_probabilities_form_distribution() {
        let model = LogisticModel::from_artifact(artifact()).unwrap();
        let proba = model.predict_proba(&encode(&sample_profile())).unwrap();
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_predict_follows_highest_probability() {
        let model = LogisticModel::from_artifact(artifact()).unwrap();

        // cgpa 8.5: logits high=-8.5, low=3.5, medium=0
        let good = encode(&sample_profile());
        assert_eq!(model.predict(&good).unwrap(), "low");

        let mut struggling = sample_profile();
        struggling.cgpa = 0.0;
        // logits high=0, low=-5, medium=0: tie resolves to the first class
        assert_eq!(model.predict(&encode(&struggling)).unwrap(), "high");
    }

    #[test]
    fn test_label_contracts_stay_separate() {
        assert_eq!("medium".to_string().to_category(), StressCategory::Moderate);
        assert_eq!(1i64.to_category(), StressCategory::Moderate);
        assert_eq!("7".to_string().to_category(), StressCategory::Moderate);
        assert_eq!(7i64.to_category(), StressCategory::Low);
    }
}
