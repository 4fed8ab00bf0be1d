//! Survey dashboard core: load and prepare the job-seeker dataset, compute
//! the descriptive views, and train a forest that predicts employment.

pub mod cache;
pub mod config;
pub mod csv_reader;
pub mod dataset;
pub mod error;
pub mod form;
pub mod insights;
pub mod logging;
pub mod predictor;
pub mod training;

pub use cache::DatasetCache;
pub use config::{Config, PredictorConfig};
pub use dataset::{prepare, AgeBracket, PreparedRecord, PreparedTable};
pub use error::{InsightsError, Result};
pub use insights::{Chart, ChartKind, Insight};
pub use predictor::{fit, infer, CandidateProfile, FitReport, Outcome, Prediction, Predictor};
