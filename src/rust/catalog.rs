use serde::{Deserialize, Serialize};

/// Input layout expected by an image classification model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    /// Per-channel mean subtracted after scaling pixels to `[0, 1]`
    pub mean: [f32; 3],
    /// Per-channel standard deviation
    pub std: [f32; 3],
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

/// An entry of the model catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Name shown in the model selector
    pub name: String,
    /// Local relative path or remote URL of the model asset
    pub path: String,
    /// Optional label list, one label per line
    #[serde(default)]
    pub labels: Option<String>,
    /// Expected SHA-256 hex digest of the model asset
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub input: InputSpec,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            labels: None,
            sha256: None,
            input: InputSpec::default(),
        }
    }

    pub fn with_labels(mut self, labels: impl Into<String>) -> Self {
        self.labels = Some(labels.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Last path segment of the asset, e.g. `X-Ray_0.2.onnx`
    pub fn file_name(&self) -> &str {
        asset_file_name(&self.path)
    }

    pub fn is_remote(&self) -> bool {
        is_remote(&self.path)
    }
}

pub fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

pub fn asset_file_name(path: &str) -> &str {
    let trimmed = path.split(['?', '#']).next().unwrap_or(path);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

/// The catalog shipped with the demo. The first entry is the default selection.
pub fn default_catalog() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("X-Ray (肺炎)", "models/X-Ray_0.2.onnx")
            .with_labels("models/X-Ray_0.2.labels.txt"),
        ModelDescriptor::new("Flower_tw6 (花卉)", "models/Flower_tw6.onnx")
            .with_labels("models/Flower_tw6.labels.txt"),
        ModelDescriptor::new(
            "MobileNetV2 (ONNX Model Zoo)",
            "https://github.com/onnx/models/raw/main/validated/vision/classification/mobilenet/model/mobilenetv2-12.onnx",
        )
        .with_labels("https://raw.githubusercontent.com/onnx/models/main/validated/vision/classification/synset.txt"),
    ]
}

/// Parses a label list: one label per line, blank lines skipped. A leading
/// WordNet synset id (`n01440764 tench, Tinca tinca`) is dropped.
pub fn parse_labels(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(' ') {
            Some((id, rest)) if is_synset_id(id) => rest.trim().to_string(),
            _ => line.to_string(),
        })
        .collect()
}

fn is_synset_id(token: &str) -> bool {
    token.len() == 9
        && token.starts_with('n')
        && token[1..].chars().all(|c| c.is_ascii_digit())
}
