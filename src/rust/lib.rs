//! On-device image classification for still images and live camera streams.
//!
//! The crate wires user actions to an image classification engine: it loads
//! and hot-swaps a pair of classifiers (one for single images, one for video
//! frames), classifies uploaded or pasted images, pumps camera frames through
//! the video classifier, and renders translated labels with confidence scores.
//!
//! # Basic Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use lensclass::{App, AppConfig, AppEvent, ModelManager, NoCamera, OnnxEngine};
//!
//! let config = AppConfig::default();
//! let engine = Arc::new(OnnxEngine::new(config.runtime.clone(), ModelManager::new_default()?));
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let mut app = App::new(&config, engine, Arc::new(NoCamera), tx);
//! app.start();
//!
//! // Wait for the first model to load, then classify a file
//! if let Some(event) = rx.recv().await {
//!     app.dispatch(event).await;
//! }
//! app.dispatch(AppEvent::OpenFile(Some("chest.png".into()))).await;
//! println!("{}", app.ui().render());
//! # Ok(())
//! # }
//! ```
//!
//! # Pure formatting
//!
//! ```rust
//! use lensclass::{render_categories, Category, Translations};
//!
//! let categories = vec![Category::new(0, "Normal", 0.92), Category::new(1, "Pneumonia", 0.05)];
//! assert_eq!(render_categories(&categories, 0.1, &Translations::default()), "正常: 92%");
//! ```

pub mod app;
pub mod camera;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod model_manager;
pub mod presentation;
mod runtime;
pub mod static_flow;
pub mod ui;
pub mod webcam;

pub use app::{App, AppEvent};
pub use camera::{CameraDevice, CameraError, FrameDirectoryCamera, MediaStream, NoCamera};
pub use catalog::{default_catalog, InputSpec, ModelDescriptor};
pub use config::{AppConfig, ConfigError};
pub use engine::{
    BoxFuture, Category, ClassificationEngine, ClassificationResult, ClassifierHandle,
    ClassifierOptions, EngineError, OnnxEngine, RunMode,
};
pub use lifecycle::{
    ClassifierLifecycle, ClassifierPair, CommitOutcome, LoadGate, LoadPermit, LoadTicket,
};
pub use model_manager::{ModelError, ModelManager};
pub use presentation::{format_category, render_categories, Translations};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use static_flow::{mime_for_path, ClipboardItem, StaticImageFlow};
pub use ui::{CameraButton, UiState};
pub use webcam::{PumpStep, WebcamFlow, WebcamStatus};

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
