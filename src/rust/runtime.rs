use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use serde::{Deserialize, Serialize};
use std::sync::Once;

static INIT: Once = Once::new();

/// ONNX Runtime execution settings applied to every classifier session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    /// Graph optimization level, 0 (disabled) to 3 (all optimizations)
    pub optimization_level: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: 3,
        }
    }
}

impl RuntimeConfig {
    pub fn graph_optimization_level(&self) -> GraphOptimizationLevel {
        match self.optimization_level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        }
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("lensclass")
        .commit()?;
    Ok(())
}

pub fn ensure_initialized() -> OrtResult<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = init_onnx_environment();
    });
    result
}

pub fn create_session_builder(config: &RuntimeConfig) -> OrtResult<SessionBuilder> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(config.graph_optimization_level())?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_initialization() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok()); // Second call should be fine
    }

    #[test]
    fn test_optimization_level_mapping() {
        let mut config = RuntimeConfig::default();
        assert!(matches!(config.graph_optimization_level(), GraphOptimizationLevel::Level3));
        config.optimization_level = 0;
        assert!(matches!(config.graph_optimization_level(), GraphOptimizationLevel::Disable));
        config.optimization_level = 9;
        assert!(matches!(config.graph_optimization_level(), GraphOptimizationLevel::Level3));
    }

    #[test]
    fn test_session_builder_config() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: 1,
        };
        let builder = create_session_builder(&config);
        assert!(builder.is_ok());
    }
}
