//! Employment predictor: feature selection, seeded split, forest fit, single-profile inference.

use std::fmt;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::PredictorConfig;
use crate::dataset::{PreparedRecord, PreparedTable};
use crate::error::{InsightsError, Result};
use crate::training::{train_test_split, RandomForest};

/// Model inputs, in column order.
pub const FEATURES: [&str; 8] = [
    "age",
    "has_internship_experience",
    "felt_prepared",
    "completed_training_program",
    "professional_contacts",
    "freelance_jobs",
    "feedback_received",
    "has_extra_courses",
];

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;

const FLAG_FEATURES: [&str; 4] = [
    "has_internship_experience",
    "felt_prepared",
    "completed_training_program",
    "has_extra_courses",
];

/// One simulated candidate, validated against the training domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateProfile {
    pub age: u32,
    pub has_internship_experience: u8,
    pub felt_prepared: u8,
    pub completed_training_program: u8,
    pub professional_contacts: u32,
    pub freelance_jobs: u32,
    pub feedback_received: u32,
    pub has_extra_courses: u8,
}

impl CandidateProfile {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(InsightsError::invalid_profile(
                "age",
                format!("must lie in [{}, {}], got {}", MIN_AGE, MAX_AGE, self.age),
            ));
        }
        let flags = [
            self.has_internship_experience,
            self.felt_prepared,
            self.completed_training_program,
            self.has_extra_courses,
        ];
        for (name, value) in FLAG_FEATURES.iter().zip(flags) {
            if value > 1 {
                return Err(InsightsError::invalid_profile(
                    name,
                    format!("must be 0 or 1, got {}", value),
                ));
            }
        }
        Ok(())
    }

    /// Builds a profile from an untyped object holding exactly the eight features.
    pub fn from_json(value: &Value) -> Result<CandidateProfile> {
        let map = value.as_object().ok_or_else(|| {
            InsightsError::invalid_profile("<profile>", "must be a JSON object")
        })?;
        Self::from_map(map)
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<CandidateProfile> {
        if let Some(unknown) = map.keys().find(|k| !FEATURES.contains(&k.as_str())) {
            return Err(InsightsError::invalid_profile(unknown, "is not a model feature"));
        }

        let int = |name: &str| -> Result<u64> {
            let value = map
                .get(name)
                .ok_or_else(|| InsightsError::invalid_profile(name, "is missing"))?;
            value.as_u64().ok_or_else(|| {
                InsightsError::invalid_profile(
                    name,
                    format!("must be a non-negative integer, got {}", value),
                )
            })
        };
        let count = |name: &str| -> Result<u32> {
            u32::try_from(int(name)?)
                .map_err(|_| InsightsError::invalid_profile(name, "is too large"))
        };
        let flag = |name: &str| -> Result<u8> {
            match int(name)? {
                v @ (0 | 1) => Ok(v as u8),
                v => Err(InsightsError::invalid_profile(
                    name,
                    format!("must be 0 or 1, got {}", v),
                )),
            }
        };

        let profile = CandidateProfile {
            age: count("age")?,
            has_internship_experience: flag("has_internship_experience")?,
            felt_prepared: flag("felt_prepared")?,
            completed_training_program: flag("completed_training_program")?,
            professional_contacts: count("professional_contacts")?,
            freelance_jobs: count("freelance_jobs")?,
            feedback_received: count("feedback_received")?,
            has_extra_courses: flag("has_extra_courses")?,
        };
        profile.validate()?;
        Ok(profile)
    }

    fn to_features(self) -> Array1<f64> {
        Array1::from_vec(vec![
            f64::from(self.age),
            f64::from(self.has_internship_experience),
            f64::from(self.felt_prepared),
            f64::from(self.completed_training_program),
            f64::from(self.professional_contacts),
            f64::from(self.freelance_jobs),
            f64::from(self.feedback_received),
            f64::from(self.has_extra_courses),
        ])
    }
}

/// Feature vector and label, or `None` when any of them is missing.
fn complete_row(row: &PreparedRecord) -> Option<([f64; 8], usize)> {
    let features = [
        row.age? as f64,
        f64::from(row.has_internship_experience?),
        f64::from(row.felt_prepared?),
        f64::from(row.completed_training_program?),
        f64::from(row.professional_contacts?),
        f64::from(row.freelance_jobs?),
        f64::from(row.feedback_received?),
        f64::from(row.has_extra_courses),
    ];
    Some((features, usize::from(row.got_job?)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    NotEmployed,
    Employed,
}

impl Outcome {
    fn from_class(class: usize) -> Outcome {
        if class == 1 {
            Outcome::Employed
        } else {
            Outcome::NotEmployed
        }
    }

    pub fn as_label(&self) -> u8 {
        match self {
            Outcome::NotEmployed => 0,
            Outcome::Employed => 1,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Employed => write!(f, "Likely to find a job!"),
            Outcome::NotEmployed => write!(f, "May struggle to find a job."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub outcome: Outcome,
    /// Fraction of trees that voted [`Outcome::Employed`].
    pub vote_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub total_rows: usize,
    pub excluded_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub accuracy: f64,
    pub feature_importances: Vec<(String, f64)>,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainedModel {
    forest: RandomForest,
    report: FitReport,
}

impl TrainedModel {
    pub fn report(&self) -> &FitReport {
        &self.report
    }
}

/// Smallest row count for which both partitions are non-empty.
///
/// A training row survives once `n * (1 - test_ratio) >= 1`; the scan starts just
/// below that bound and only steps over rounding in `ceil(n * test_ratio)`.
fn min_rows_for(test_ratio: f64) -> usize {
    let leaves_train_row = |n: usize| ((n as f64 * test_ratio).ceil() as usize) < n;
    let start = ((1.0 / (1.0 - test_ratio)).floor() as usize)
        .saturating_sub(1)
        .max(2);
    (start..).find(|&n| leaves_train_row(n)).unwrap_or(start)
}

/// Trains on the complete rows of `table` and scores the held-out partition.
pub fn fit(table: &PreparedTable, config: &PredictorConfig) -> Result<(TrainedModel, f64)> {
    config.validate()?;

    let complete: Vec<([f64; 8], usize)> = table.rows().iter().filter_map(complete_row).collect();
    let excluded_rows = table.len() - complete.len();
    let needed = min_rows_for(config.test_ratio);
    if complete.len() < needed {
        return Err(InsightsError::InsufficientData {
            needed,
            got: complete.len(),
        });
    }

    let split = train_test_split(complete.len(), config.test_ratio, config.seed);
    tracing::debug!(
        "Split {} complete rows into {} train / {} test (seed {})",
        complete.len(),
        split.train.len(),
        split.test.len(),
        config.seed
    );

    let matrix = |indices: &[usize]| -> (Array2<f64>, Vec<usize>) {
        let mut x = Array2::zeros((indices.len(), FEATURES.len()));
        let mut y = Vec::with_capacity(indices.len());
        for (row, &i) in indices.iter().enumerate() {
            let (features, label) = &complete[i];
            for (col, value) in features.iter().enumerate() {
                x[[row, col]] = *value;
            }
            y.push(*label);
        }
        (x, y)
    };
    let (x_train, y_train) = matrix(&split.train);
    let (x_test, y_test) = matrix(&split.test);

    let mut forest = RandomForest::new_classifier(config.n_trees)
        .with_max_depth(config.max_depth)
        .with_random_state(config.seed);
    forest.fit(&x_train, &y_train)?;

    let predictions = forest.predict(&x_test)?;
    let correct = predictions
        .iter()
        .zip(&y_test)
        .filter(|(p, a)| p == a)
        .count();
    let accuracy = correct as f64 / y_test.len() as f64;

    let report = FitReport {
        total_rows: table.len(),
        excluded_rows,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        accuracy,
        feature_importances: FEATURES
            .iter()
            .map(|name| name.to_string())
            .zip(forest.feature_importances().iter().copied())
            .collect(),
        trained_at: Utc::now(),
    };

    tracing::info!(
        "Trained {} trees on {} rows ({} excluded as incomplete); held-out accuracy {:.2}",
        forest.n_trees(),
        report.train_rows,
        excluded_rows,
        accuracy
    );

    Ok((TrainedModel { forest, report }, accuracy))
}

pub fn infer(model: &TrainedModel, profile: &CandidateProfile) -> Result<Prediction> {
    profile.validate()?;
    let features = profile.to_features();
    let class = model.forest.predict_one(features.view())?;
    let proba = model.forest.predict_proba_one(features.view())?;
    Ok(Prediction {
        outcome: Outcome::from_class(class),
        vote_share: proba.get(1).copied().unwrap_or(0.0),
    })
}

/// `Untrained` until [`Predictor::fit`] succeeds; every fit replaces the previous model.
#[derive(Debug, Clone, Default)]
pub enum Predictor {
    #[default]
    Untrained,
    Trained(TrainedModel),
}

impl Predictor {
    pub fn new() -> Self {
        Predictor::Untrained
    }

    pub fn fit(&mut self, table: &PreparedTable, config: &PredictorConfig) -> Result<FitReport> {
        let (model, _) = fit(table, config)?;
        let report = model.report().clone();
        *self = Predictor::Trained(model);
        Ok(report)
    }

    pub fn infer(&self, profile: &CandidateProfile) -> Result<Prediction> {
        match self {
            Predictor::Untrained => Err(InsightsError::ModelNotTrained),
            Predictor::Trained(model) => infer(model, profile),
        }
    }

    /// Validates an untyped profile before it reaches the model.
    pub fn infer_json(&self, profile: &Value) -> Result<Prediction> {
        if let Predictor::Untrained = self {
            return Err(InsightsError::ModelNotTrained);
        }
        self.infer(&CandidateProfile::from_json(profile)?)
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, Predictor::Trained(_))
    }

    pub fn report(&self) -> Option<&FitReport> {
        match self {
            Predictor::Trained(model) => Some(model.report()),
            Predictor::Untrained => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_profile() -> CandidateProfile {
        CandidateProfile {
            age: 25,
            has_internship_experience: 1,
            felt_prepared: 1,
            completed_training_program: 0,
            professional_contacts: 5,
            freelance_jobs: 2,
            feedback_received: 3,
            has_extra_courses: 0,
        }
    }

    #[test]
    fn json_profile_round_trips_to_struct() {
        let profile = CandidateProfile::from_json(&json!({
            "age": 25,
            "has_internship_experience": 1,
            "felt_prepared": 1,
            "completed_training_program": 0,
            "professional_contacts": 5,
            "freelance_jobs": 2,
            "feedback_received": 3,
            "has_extra_courses": 0
        }))
        .unwrap();
        assert_eq!(profile, sample_profile());
    }

    #[test]
    fn missing_age_is_invalid() {
        let err = CandidateProfile::from_json(&json!({
            "has_internship_experience": 1,
            "felt_prepared": 1,
            "completed_training_program": 0,
            "professional_contacts": 5,
            "freelance_jobs": 2,
            "feedback_received": 3,
            "has_extra_courses": 0
        }))
        .unwrap_err();
        assert!(matches!(err, InsightsError::InvalidProfile { ref feature, .. } if feature == "age"));
    }

    #[test]
    fn wrong_types_and_ranges_are_invalid() {
        let base = json!({
            "age": 25,
            "has_internship_experience": 1,
            "felt_prepared": 1,
            "completed_training_program": 0,
            "professional_contacts": 5,
            "freelance_jobs": 2,
            "feedback_received": 3,
            "has_extra_courses": 0
        });
        let cases = [
            ("age", json!("25")),
            ("age", json!(17)),
            ("age", json!(25.5)),
            ("felt_prepared", json!(2)),
            ("professional_contacts", json!(-1)),
            ("freelance_jobs", json!(null)),
        ];
        for (feature, value) in cases {
            let mut profile = base.clone();
            profile[feature] = value.clone();
            let err = CandidateProfile::from_json(&profile).unwrap_err();
            assert!(
                matches!(err, InsightsError::InvalidProfile { feature: ref f, .. } if f == feature),
                "{} = {} should be rejected, got {:?}",
                feature,
                value,
                err
            );
        }

        let mut extra = base;
        extra["salary"] = json!(1000);
        assert!(matches!(
            CandidateProfile::from_json(&extra),
            Err(InsightsError::InvalidProfile { .. })
        ));
    }

    #[test]
    fn infer_before_fit_is_rejected() {
        let predictor = Predictor::new();
        assert!(!predictor.is_trained());
        assert!(matches!(
            predictor.infer(&sample_profile()),
            Err(InsightsError::ModelNotTrained)
        ));
        assert!(matches!(
            predictor.infer_json(&json!({})),
            Err(InsightsError::ModelNotTrained)
        ));
    }

    #[test]
    fn struct_profile_is_validated() {
        let mut profile = sample_profile();
        profile.has_extra_courses = 3;
        assert!(matches!(
            profile.validate(),
            Err(InsightsError::InvalidProfile { ref feature, .. }) if feature == "has_extra_courses"
        ));
    }

    #[test]
    fn min_rows_depend_on_ratio() {
        assert_eq!(min_rows_for(0.2), 2);
        assert_eq!(min_rows_for(0.5), 2);
        assert_eq!(min_rows_for(0.75), 4);
        assert_eq!(min_rows_for(0.9), 10);
    }

    #[test]
    fn min_rows_near_one_is_closed_form() {
        let needed = min_rows_for(0.9999999999);
        assert!(needed > 1_000_000_000, "got {}", needed);
        let n_test = (needed as f64 * 0.9999999999).ceil() as usize;
        assert!(n_test < needed);
    }
}
