#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lensclass::{
    App, AppConfig, AppEvent, BoxFuture, CameraDevice, CameraError, Category, ClassificationEngine,
    ClassificationResult, ClassifierHandle, ClassifierOptions, EngineError, MediaStream,
    ModelDescriptor, RunMode,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Shared, ordered record of everything the fakes did
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn last_position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().rposition(|e| e == entry)
    }
}

#[derive(Clone)]
pub struct FakeEngine {
    pub log: EventLog,
    pub result: Arc<Mutex<Result<Vec<(String, f32)>, String>>>,
    pub classify_calls: Arc<AtomicUsize>,
    pub video_calls: Arc<AtomicUsize>,
    pub live_handles: Arc<AtomicUsize>,
    /// Highest number of handles ever open at the same time
    pub peak_handles: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            result: Arc::new(Mutex::new(Ok(vec![
                ("Normal".to_string(), 0.92),
                ("Pneumonia".to_string(), 0.05),
            ]))),
            classify_calls: Arc::new(AtomicUsize::new(0)),
            video_calls: Arc::new(AtomicUsize::new(0)),
            live_handles: Arc::new(AtomicUsize::new(0)),
            peak_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_result(&self, categories: &[(&str, f32)]) {
        *self.result.lock().unwrap() =
            Ok(categories.iter().map(|(l, s)| (l.to_string(), *s)).collect());
    }

    pub fn set_failure(&self, message: &str) {
        *self.result.lock().unwrap() = Err(message.to_string());
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }

    pub fn peak_handles(&self) -> usize {
        self.peak_handles.load(Ordering::SeqCst)
    }
}

impl ClassificationEngine for FakeEngine {
    fn create_classifier<'a>(
        &'a self,
        descriptor: &'a ModelDescriptor,
        mode: RunMode,
        options: ClassifierOptions,
    ) -> BoxFuture<'a, Result<Box<dyn ClassifierHandle>, EngineError>> {
        Box::pin(async move {
            if descriptor.path.contains("broken") {
                return Err(EngineError::ModelError(format!(
                    "Model asset not found: {}",
                    descriptor.path
                )));
            }
            self.log.push(format!("create {} {}", mode, descriptor.name));
            let live = self.live_handles.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_handles.fetch_max(live, Ordering::SeqCst);
            // Give other tasks a chance to run while this handle is open
            tokio::task::yield_now().await;
            Ok(Box::new(FakeHandle {
                name: descriptor.name.clone(),
                mode,
                options,
                closed: false,
                engine: self.clone(),
            }) as Box<dyn ClassifierHandle>)
        })
    }
}

pub struct FakeHandle {
    name: String,
    mode: RunMode,
    options: ClassifierOptions,
    closed: bool,
    engine: FakeEngine,
}

impl FakeHandle {
    fn result(&self) -> Result<ClassificationResult, EngineError> {
        if self.closed {
            return Err(EngineError::Disposed);
        }
        match &*self.engine.result.lock().unwrap() {
            Ok(categories) => Ok(ClassificationResult {
                categories: categories
                    .iter()
                    .enumerate()
                    .map(|(i, (label, score))| Category::new(i, label.clone(), *score))
                    .collect(),
                timestamp_ms: None,
            }),
            Err(message) => Err(EngineError::ClassificationError(message.clone())),
        }
    }
}

impl ClassifierHandle for FakeHandle {
    fn mode(&self) -> RunMode {
        self.mode
    }

    fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult, EngineError> {
        self.engine.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.result()
    }

    fn classify_for_video(
        &mut self,
        _frame: &DynamicImage,
        timestamp_ms: u64,
    ) -> Result<ClassificationResult, EngineError> {
        self.engine.video_calls.fetch_add(1, Ordering::SeqCst);
        let mut result = self.result()?;
        result.timestamp_ms = Some(timestamp_ms);
        Ok(result)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.engine.live_handles.fetch_sub(1, Ordering::SeqCst);
            self.engine.log.push(format!("close {} {}", self.mode, self.name));
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Camera whose playback time is set by the test
#[derive(Clone)]
pub struct FakeCamera {
    pub log: EventLog,
    pub fail: bool,
    pub time: Arc<Mutex<f64>>,
    pub stopped: Arc<AtomicBool>,
}

impl FakeCamera {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail: false,
            time: Arc::new(Mutex::new(0.0)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing(log: EventLog) -> Self {
        Self {
            fail: true,
            ..Self::new(log)
        }
    }

    pub fn set_time(&self, seconds: f64) {
        *self.time.lock().unwrap() = seconds;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl CameraDevice for FakeCamera {
    fn is_supported(&self) -> bool {
        true
    }

    fn acquire(&self) -> BoxFuture<'_, Result<Box<dyn MediaStream>, CameraError>> {
        Box::pin(async move {
            if self.fail {
                return Err(CameraError::PermissionDenied("user denied access".into()));
            }
            self.log.push("stream start");
            self.stopped.store(false, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                log: self.log.clone(),
                time: Arc::clone(&self.time),
                stopped: Arc::clone(&self.stopped),
            }) as Box<dyn MediaStream>)
        })
    }
}

pub struct FakeStream {
    log: EventLog,
    time: Arc<Mutex<f64>>,
    stopped: Arc<AtomicBool>,
}

impl MediaStream for FakeStream {
    fn stop(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.log.push("stream stop");
        }
    }

    fn is_live(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    fn track_count(&self) -> usize {
        1
    }

    fn has_frame(&self) -> bool {
        self.is_live()
    }

    fn current_time(&self) -> f64 {
        *self.time.lock().unwrap()
    }

    fn current_frame(&self) -> Option<DynamicImage> {
        Some(DynamicImage::new_rgb8(4, 4))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        models: vec![
            ModelDescriptor::new("X-Ray", "models/xray.onnx"),
            ModelDescriptor::new("Flowers", "models/flowers.onnx"),
            ModelDescriptor::new("Broken", "models/broken.onnx"),
        ],
        ..AppConfig::default()
    }
}

pub fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 200, 200])));
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png).unwrap();
    cursor.into_inner()
}

/// Builds an app, runs startup and delivers the first model load
pub async fn started_app(
    config: &AppConfig,
    engine: &FakeEngine,
    camera: &FakeCamera,
) -> (App, UnboundedReceiver<AppEvent>) {
    let (tx, mut rx) = unbounded_channel();
    let mut app = App::new(config, Arc::new(engine.clone()), Arc::new(camera.clone()), tx);
    app.start();
    let event = rx.recv().await.expect("model load event");
    app.dispatch(event).await;
    (app, rx)
}

/// Delivers the next completion posted by a spawned task
pub async fn pump_event(app: &mut App, rx: &mut UnboundedReceiver<AppEvent>) {
    let event = rx.recv().await.expect("pending event");
    app.dispatch(event).await;
}
