use std::fmt;
use std::future::Future;
use std::pin::Pin;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

mod error;
pub mod onnx;
mod preprocess;
mod utils;

pub use error::EngineError;
pub use onnx::OnnxEngine;
pub use preprocess::image_to_tensor;
pub use utils::{softmax, top_categories};

use crate::catalog::ModelDescriptor;

/// Boxed future returned by the asynchronous engine and camera calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether a classifier processes discrete images or a continuous sequence of frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    Image,
    Video,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "IMAGE"),
            Self::Video => write!(f, "VIDEO"),
        }
    }
}

/// Options shared by both classifiers built for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOptions {
    /// Minimum score a category must reach to be reported
    pub score_threshold: f32,
    /// Maximum number of categories reported per call
    pub max_results: usize,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            score_threshold: 0.1,
            max_results: 5,
        }
    }
}

/// A single predicted category
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Index of the category in the model output
    pub index: usize,
    /// Confidence in `[0, 1]`
    pub score: f32,
    /// Raw label as reported by the model
    pub category_name: String,
}

impl Category {
    pub fn new(index: usize, category_name: impl Into<String>, score: f32) -> Self {
        Self {
            index,
            score,
            category_name: category_name.into(),
        }
    }
}

/// Ranked output of one classify call. Consumed for rendering and then dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationResult {
    /// Categories ordered by descending score, possibly empty
    pub categories: Vec<Category>,
    /// Timestamp of the frame for VIDEO mode results
    pub timestamp_ms: Option<u64>,
}

impl ClassificationResult {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// A loaded, ready-to-use classifier instance.
///
/// A handle is bound to one run mode: IMAGE handles only accept [`classify`],
/// VIDEO handles only accept [`classify_for_video`]. After [`close`] every call
/// fails with [`EngineError::Disposed`].
///
/// [`classify`]: ClassifierHandle::classify
/// [`classify_for_video`]: ClassifierHandle::classify_for_video
/// [`close`]: ClassifierHandle::close
pub trait ClassifierHandle: Send + Sync {
    fn mode(&self) -> RunMode;

    fn options(&self) -> &ClassifierOptions;

    /// Classifies a single, fully decoded image
    fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult, EngineError>;

    /// Classifies one video frame. Timestamps must strictly increase.
    fn classify_for_video(
        &mut self,
        frame: &DynamicImage,
        timestamp_ms: u64,
    ) -> Result<ClassificationResult, EngineError>;

    /// Releases the underlying engine resources. Calling it twice is harmless.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// The external capability that turns a model asset into classifier handles
pub trait ClassificationEngine: Send + Sync {
    fn create_classifier<'a>(
        &'a self,
        descriptor: &'a ModelDescriptor,
        mode: RunMode,
        options: ClassifierOptions,
    ) -> BoxFuture<'a, Result<Box<dyn ClassifierHandle>, EngineError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ClassifierOptions::default();
        assert_eq!(options.score_threshold, 0.1);
        assert_eq!(options.max_results, 5);
    }

    #[test]
    fn test_run_mode_display() {
        assert_eq!(RunMode::Image.to_string(), "IMAGE");
        assert_eq!(RunMode::Video.to_string(), "VIDEO");
    }
}
