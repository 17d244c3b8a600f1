use ort::Error as OrtError;
use std::fmt;

use super::RunMode;
use crate::model_manager::ModelError;

/// Represents the different types of errors the classification engine can report.
#[derive(Debug)]
pub enum EngineError {
    /// Error occurred while resolving, downloading or loading the model asset
    ModelError(String),
    /// Error occurred while building the classifier
    BuildError(String),
    /// Error occurred while running a classification
    ClassificationError(String),
    /// Error occurred due to invalid input parameters
    InvalidInput(String),
    /// The call does not match the run mode the handle was created for
    RunMode { expected: RunMode, actual: RunMode },
    /// The handle has already been closed
    Disposed,
    /// A newer load request replaced this one before it finished
    Superseded,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::ClassificationError(msg) => write!(f, "Classification error: {}", msg),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::RunMode { expected, actual } => write!(
                f,
                "Run mode mismatch: classifier runs in {} mode, call requires {}",
                expected, actual
            ),
            Self::Disposed => write!(f, "Classifier has been closed"),
            Self::Superseded => write!(f, "Load superseded by a newer request"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<OrtError> for EngineError {
    fn from(err: OrtError) -> Self {
        EngineError::BuildError(err.to_string())
    }
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        EngineError::ModelError(err.to_string())
    }
}
