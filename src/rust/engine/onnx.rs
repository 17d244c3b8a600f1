use std::collections::HashMap;
use std::path::Path;

use image::DynamicImage;
use log::{debug, error, info};
use ort::session::Session;
use ort::value::Tensor;

use super::preprocess::image_to_tensor;
use super::utils::{softmax, top_categories};
use super::{
    BoxFuture, ClassificationEngine, ClassificationResult, ClassifierHandle, ClassifierOptions,
    EngineError, RunMode,
};
use crate::catalog::{parse_labels, InputSpec, ModelDescriptor};
use crate::model_manager::ModelManager;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Classification engine backed by ONNX Runtime.
///
/// Model and label assets are resolved through the [`ModelManager`], so
/// descriptors may point at local files or remote URLs.
#[derive(Debug, Clone)]
pub struct OnnxEngine {
    runtime_config: RuntimeConfig,
    manager: ModelManager,
}

impl OnnxEngine {
    pub fn new(runtime_config: RuntimeConfig, manager: ModelManager) -> Self {
        Self {
            runtime_config,
            manager,
        }
    }

    async fn build(
        &self,
        descriptor: &ModelDescriptor,
        mode: RunMode,
        options: ClassifierOptions,
    ) -> Result<Box<dyn ClassifierHandle>, EngineError> {
        info!("Creating {} classifier for '{}'", mode, descriptor.name);
        let model_path = self.manager.resolve(&descriptor.path, descriptor.sha256.as_deref()).await?;

        let labels = match &descriptor.labels {
            Some(labels) => {
                let labels_path = self.manager.resolve(labels, None).await?;
                let contents = tokio::fs::read_to_string(&labels_path)
                    .await
                    .map_err(|e| EngineError::ModelError(format!("Failed to read labels: {}", e)))?;
                parse_labels(&contents)
            }
            None => Vec::new(),
        };
        info!("Loaded {} labels", labels.len());

        let session = self.load_session(&model_path)?;
        Ok(Box::new(OnnxClassifier {
            session: Some(session),
            labels,
            input: descriptor.input.clone(),
            mode,
            options,
            last_timestamp_ms: None,
        }))
    }

    fn load_session(&self, model_path: &Path) -> Result<Session, EngineError> {
        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)
            .map_err(|e| {
                error!("Failed to load model {:?}: {}", model_path, e);
                EngineError::BuildError(format!("Failed to load model: {}", e))
            })?;

        Self::validate_model(&session)?;
        info!("Model structure validated successfully");
        Ok(session)
    }

    /// Validates that the model has at least one image input and one score output
    fn validate_model(session: &Session) -> Result<(), EngineError> {
        if session.inputs.is_empty() {
            return Err(EngineError::ModelError(
                "Model must have at least 1 input for the image tensor".to_string(),
            ));
        }
        if session.outputs.is_empty() {
            return Err(EngineError::ModelError(
                "Model must have at least 1 output for class scores".to_string(),
            ));
        }
        Ok(())
    }
}

impl ClassificationEngine for OnnxEngine {
    fn create_classifier<'a>(
        &'a self,
        descriptor: &'a ModelDescriptor,
        mode: RunMode,
        options: ClassifierOptions,
    ) -> BoxFuture<'a, Result<Box<dyn ClassifierHandle>, EngineError>> {
        Box::pin(self.build(descriptor, mode, options))
    }
}

/// A classifier handle owning one ONNX Runtime session
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Option<Session>,
    labels: Vec<String>,
    input: InputSpec,
    mode: RunMode,
    options: ClassifierOptions,
    last_timestamp_ms: Option<u64>,
}

impl OnnxClassifier {
    fn check_mode(&self, required: RunMode) -> Result<&Session, EngineError> {
        let session = self.session.as_ref().ok_or(EngineError::Disposed)?;
        if self.mode != required {
            return Err(EngineError::RunMode {
                expected: self.mode,
                actual: required,
            });
        }
        Ok(session)
    }

    fn run(&self, session: &Session, image: &DynamicImage) -> Result<Vec<f32>, EngineError> {
        let input = image_to_tensor(image, &self.input);
        let input_name = session.inputs[0].name.as_str();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            input_name,
            Tensor::from_array(input).map_err(|e| {
                EngineError::ClassificationError(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = session
            .run(input_tensors)
            .map_err(|e| EngineError::ClassificationError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            EngineError::ClassificationError(format!("Failed to extract output tensor: {}", e))
        })?;

        Ok(output_tensor.iter().copied().collect())
    }

    fn classify_with(
        &self,
        session: &Session,
        image: &DynamicImage,
    ) -> Result<ClassificationResult, EngineError> {
        let scores = self.run(session, image)?;
        let probabilities = softmax(&scores);
        let categories = top_categories(&probabilities, &self.labels, &self.options);
        debug!("{} classifier produced {} categories", self.mode, categories.len());
        Ok(ClassificationResult {
            categories,
            timestamp_ms: None,
        })
    }
}

impl ClassifierHandle for OnnxClassifier {
    fn mode(&self) -> RunMode {
        self.mode
    }

    fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult, EngineError> {
        let session = self.check_mode(RunMode::Image)?;
        self.classify_with(session, image)
    }

    fn classify_for_video(
        &mut self,
        frame: &DynamicImage,
        timestamp_ms: u64,
    ) -> Result<ClassificationResult, EngineError> {
        let session = self.check_mode(RunMode::Video)?;
        if let Some(last) = self.last_timestamp_ms {
            if timestamp_ms <= last {
                return Err(EngineError::InvalidInput(format!(
                    "Frame timestamp {} ms must be greater than the previous {} ms",
                    timestamp_ms, last
                )));
            }
        }
        let mut result = self.classify_with(session, frame)?;
        self.last_timestamp_ms = Some(timestamp_ms);
        result.timestamp_ms = Some(timestamp_ms);
        Ok(result)
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            info!("{} classifier closed", self.mode);
        }
    }

    fn is_closed(&self) -> bool {
        self.session.is_none()
    }
}
