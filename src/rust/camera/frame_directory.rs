use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use log::{info, warn};
use tokio::time::Instant;

use super::{CameraDevice, CameraError, MediaStream};
use crate::engine::BoxFuture;

/// A camera that replays the still images of a directory as a looping video
/// stream at a fixed frame rate
#[derive(Debug, Clone)]
pub struct FrameDirectoryCamera {
    dir: PathBuf,
    fps: f64,
}

impl FrameDirectoryCamera {
    pub fn new<P: AsRef<Path>>(dir: P, fps: f64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            fps: if fps > 0.0 { fps } else { 15.0 },
        }
    }

    async fn open(&self) -> Result<Box<dyn MediaStream>, CameraError> {
        if !self.dir.is_dir() {
            return Err(CameraError::NotFound(self.dir.to_string_lossy().to_string()));
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if ImageFormat::from_path(&path).is_ok() {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(CameraError::NotFound(format!(
                "{} contains no frames",
                self.dir.to_string_lossy()
            )));
        }

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let bytes = tokio::fs::read(path).await?;
            let frame = image::load_from_memory(&bytes).map_err(|e| CameraError::Decode {
                path: path.to_string_lossy().to_string(),
                message: e.to_string(),
            })?;
            frames.push(frame);
        }

        info!("Camera stream started with {} frames at {} fps", frames.len(), self.fps);
        Ok(Box::new(FrameDirectoryStream::new(frames, self.fps)))
    }
}

impl CameraDevice for FrameDirectoryCamera {
    fn is_supported(&self) -> bool {
        true
    }

    fn acquire(&self) -> BoxFuture<'_, Result<Box<dyn MediaStream>, CameraError>> {
        Box::pin(self.open())
    }
}

/// Stream over decoded frames. The playback position advances one frame
/// every `1 / fps` seconds and wraps around at the end.
#[derive(Debug)]
pub struct FrameDirectoryStream {
    frames: Vec<DynamicImage>,
    fps: f64,
    started: Instant,
    live: bool,
}

impl FrameDirectoryStream {
    pub fn new(frames: Vec<DynamicImage>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            started: Instant::now(),
            live: true,
        }
    }

    fn frame_number(&self) -> u64 {
        (self.started.elapsed().as_secs_f64() * self.fps).floor() as u64
    }
}

impl MediaStream for FrameDirectoryStream {
    fn stop(&mut self) {
        if self.live {
            info!("Camera track stopped");
        }
        self.live = false;
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn track_count(&self) -> usize {
        1
    }

    fn has_frame(&self) -> bool {
        self.live && !self.frames.is_empty()
    }

    fn current_time(&self) -> f64 {
        if !self.live {
            return 0.0;
        }
        self.frame_number() as f64 / self.fps
    }

    fn current_frame(&self) -> Option<DynamicImage> {
        if !self.has_frame() {
            return None;
        }
        let index = (self.frame_number() % self.frames.len() as u64) as usize;
        match self.frames.get(index) {
            Some(frame) => Some(frame.clone()),
            None => {
                warn!("Frame {} out of range", index);
                None
            }
        }
    }
}
