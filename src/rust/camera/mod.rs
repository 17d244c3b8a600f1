use image::DynamicImage;

use crate::engine::BoxFuture;

mod frame_directory;

pub use frame_directory::{FrameDirectoryCamera, FrameDirectoryStream};

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Camera capture is not supported on this device")]
    Unsupported,
    #[error("No camera device found: {0}")]
    NotFound(String),
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("Failed to decode frame {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Camera IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A live video-only media stream
pub trait MediaStream: Send {
    /// Stops every track, releasing the device
    fn stop(&mut self);

    fn is_live(&self) -> bool;

    fn track_count(&self) -> usize;

    /// True once the first frame can be read
    fn has_frame(&self) -> bool;

    /// Playback position in seconds. Only changes when a new frame is available.
    fn current_time(&self) -> f64;

    fn current_frame(&self) -> Option<DynamicImage>;
}

/// Source of camera streams
pub trait CameraDevice: Send + Sync {
    fn is_supported(&self) -> bool;

    fn acquire(&self) -> BoxFuture<'_, Result<Box<dyn MediaStream>, CameraError>>;
}

/// Device used when no camera is configured
#[derive(Debug, Default, Clone)]
pub struct NoCamera;

impl CameraDevice for NoCamera {
    fn is_supported(&self) -> bool {
        false
    }

    fn acquire(&self) -> BoxFuture<'_, Result<Box<dyn MediaStream>, CameraError>> {
        Box::pin(async { Err(CameraError::Unsupported) })
    }
}
