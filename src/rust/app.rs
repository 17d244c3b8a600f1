use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::camera::{CameraDevice, CameraError, MediaStream};
use crate::catalog::ModelDescriptor;
use crate::config::AppConfig;
use crate::engine::{ClassificationEngine, ClassifierOptions, EngineError};
use crate::lifecycle::{
    build_current_pair, ClassifierLifecycle, ClassifierPair, CommitOutcome, LoadPermit, LoadTicket,
};
use crate::presentation::Translations;
use crate::static_flow::{ClipboardItem, StaticImageFlow};
use crate::ui::{UiState, MODEL_LOADING, MODEL_READY, NO_MODEL_SELECTED, WEBCAM_UNSUPPORTED};
use crate::webcam::{AcquireTicket, PumpStep, WebcamFlow};

/// Everything that can happen to the application: user actions and the
/// completions of the work they started.
pub enum AppEvent {
    SelectModel(usize),
    /// A load finished. The permit blocks the next build until this result
    /// has been committed or closed.
    ModelLoaded {
        ticket: LoadTicket,
        descriptor: ModelDescriptor,
        result: Result<ClassifierPair, EngineError>,
        permit: LoadPermit,
    },
    /// A file was picked, or the selection was cleared
    OpenFile(Option<PathBuf>),
    Paste(Vec<ClipboardItem>),
    ClickImage,
    EnableCamera,
    DisableCamera,
    CameraAcquired {
        ticket: AcquireTicket,
        result: Result<Box<dyn MediaStream>, CameraError>,
    },
    /// Display refresh callback carrying a monotonic timestamp in milliseconds
    AnimationFrame(u64),
}

impl fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectModel(index) => write!(f, "SelectModel({})", index),
            Self::ModelLoaded { ticket, descriptor, result, .. } => write!(
                f,
                "ModelLoaded(generation {}, '{}', ok: {})",
                ticket.generation,
                descriptor.name,
                result.is_ok()
            ),
            Self::OpenFile(path) => write!(f, "OpenFile({:?})", path),
            Self::Paste(items) => write!(f, "Paste({} items)", items.len()),
            Self::ClickImage => write!(f, "ClickImage"),
            Self::EnableCamera => write!(f, "EnableCamera"),
            Self::DisableCamera => write!(f, "DisableCamera"),
            Self::CameraAcquired { ticket, result } => {
                write!(f, "CameraAcquired({}, ok: {})", ticket.0, result.is_ok())
            }
            Self::AnimationFrame(now_ms) => write!(f, "AnimationFrame({})", now_ms),
        }
    }
}

/// The single owning context: engine, camera, classifier handles, both flows
/// and the UI state. Every mutation goes through [`App::dispatch`].
pub struct App {
    catalog: Vec<ModelDescriptor>,
    options: ClassifierOptions,
    translations: Translations,
    engine: Arc<dyn ClassificationEngine>,
    camera: Arc<dyn CameraDevice>,
    events: UnboundedSender<AppEvent>,
    lifecycle: ClassifierLifecycle,
    static_flow: StaticImageFlow,
    webcam: WebcamFlow,
    ui: UiState,
    last_frame_ms: Option<u64>,
}

impl App {
    pub fn new(
        config: &AppConfig,
        engine: Arc<dyn ClassificationEngine>,
        camera: Arc<dyn CameraDevice>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            catalog: config.models.clone(),
            options: config.classifier_options(),
            translations: config.translations(),
            engine,
            camera,
            events,
            lifecycle: ClassifierLifecycle::new(),
            static_flow: StaticImageFlow::new(),
            webcam: WebcamFlow::new(),
            ui: UiState::default(),
            last_frame_ms: None,
        }
    }

    /// Fills the selector detail, checks camera support and loads the first model
    pub fn start(&mut self) {
        if let Some(first) = self.catalog.first() {
            self.ui.model_status_detail = format!("當前模型: {} ({})", first.name, first.file_name());
        }
        if !self.camera.is_supported() {
            warn!("Camera capture is not supported, live classification disabled");
            self.ui.webcam_button_label = WEBCAM_UNSUPPORTED.to_string();
            self.ui.webcam_button_enabled = false;
        }
        self.select_model(0);
    }

    pub async fn dispatch(&mut self, event: AppEvent) {
        match event {
            AppEvent::SelectModel(index) => self.select_model(index),
            AppEvent::ModelLoaded { ticket, descriptor, result, permit } => {
                self.on_model_loaded(ticket, descriptor, result);
                drop(permit);
            }
            AppEvent::OpenFile(Some(path)) => {
                self.static_flow
                    .open_file(&path, self.lifecycle.image_handle(), &mut self.ui, &self.translations)
                    .await;
            }
            AppEvent::OpenFile(None) => self.static_flow.clear_selection(&mut self.ui),
            AppEvent::Paste(items) => {
                self.static_flow
                    .paste(&items, self.lifecycle.image_handle(), &mut self.ui, &self.translations);
            }
            AppEvent::ClickImage => {
                self.static_flow
                    .classify_displayed(self.lifecycle.image_handle(), &mut self.ui, &self.translations);
            }
            AppEvent::EnableCamera => self.enable_camera(),
            AppEvent::DisableCamera => self.webcam.disable(&mut self.ui),
            AppEvent::CameraAcquired { ticket, result } => {
                self.webcam.complete_acquire(ticket, result, &mut self.ui)
            }
            AppEvent::AnimationFrame(now_ms) => self.animation_frame(now_ms),
        }
    }

    fn select_model(&mut self, index: usize) {
        let Some(descriptor) = self.catalog.get(index).cloned() else {
            self.ui.model_status = NO_MODEL_SELECTED.to_string();
            return;
        };

        // The camera must be released before the handles it feeds are disposed
        self.webcam.disable(&mut self.ui);

        self.ui.model_status = MODEL_LOADING.to_string();
        self.ui.demos_visible = false;
        let ticket = self.lifecycle.begin_load();
        self.ui.set_dependent_controls(false, self.camera.is_supported());

        info!("Loading model '{}' from {}", descriptor.name, descriptor.path);
        let engine = Arc::clone(&self.engine);
        let events = self.events.clone();
        let options = self.options.clone();
        let gate = self.lifecycle.gate();
        tokio::spawn(async move {
            let (result, permit) =
                build_current_pair(engine.as_ref(), &descriptor, options, ticket, &gate).await;
            let event = AppEvent::ModelLoaded { ticket, descriptor, result, permit };
            if let Err(unsent) = events.send(event) {
                warn!("Event loop closed before model load finished");
                if let AppEvent::ModelLoaded { result: Ok(mut pair), .. } = unsent.0 {
                    pair.close();
                }
            }
        });
    }

    fn on_model_loaded(
        &mut self,
        ticket: LoadTicket,
        descriptor: ModelDescriptor,
        result: Result<ClassifierPair, EngineError>,
    ) {
        match result {
            Ok(pair) => {
                let file_name = descriptor.file_name().to_string();
                if self.lifecycle.commit(ticket, descriptor, pair) == CommitOutcome::Stale {
                    return;
                }
                self.ui.demos_visible = true;
                self.ui.model_status = MODEL_READY.to_string();
                self.ui.set_dependent_controls(true, self.camera.is_supported());
                self.ui.model_status_detail = format!("當前模型: ({})", file_name);
                self.static_flow.reset(&mut self.ui);
            }
            Err(e) => {
                if !self.lifecycle.fail(ticket) {
                    return;
                }
                error!("Model '{}' failed to load: {}", descriptor.name, e);
                self.ui.model_status = format!("❌ 模型載入失敗: {}。請檢查模型路徑。", e);
                self.ui.set_dependent_controls(false, self.camera.is_supported());
            }
        }
    }

    fn enable_camera(&mut self) {
        if !self.camera.is_supported() {
            self.ui.notify(WEBCAM_UNSUPPORTED);
            return;
        }
        let video_ready = self.lifecycle.video_handle().is_some();
        let Some(ticket) = self.webcam.begin_enable(video_ready, &mut self.ui) else {
            return;
        };

        let camera = Arc::clone(&self.camera);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = camera.acquire().await;
            if events.send(AppEvent::CameraAcquired { ticket, result }).is_err() {
                warn!("Event loop closed before camera acquisition finished");
            }
        });
    }

    fn animation_frame(&mut self, now_ms: u64) {
        // VIDEO handles need strictly increasing timestamps
        let now_ms = match self.last_frame_ms {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        self.last_frame_ms = Some(now_ms);

        let step = self.webcam.on_animation_frame(
            self.lifecycle.video_handle_mut(),
            now_ms,
            &mut self.ui,
            &self.translations,
        );
        if step == PumpStep::Stop {
            info!("Frame pump finished");
        }
    }

    /// Releases the camera and the classifier handles
    pub fn shutdown(&mut self) {
        self.webcam.disable(&mut self.ui);
        self.lifecycle.dispose();
    }

    pub fn wants_animation_frame(&self) -> bool {
        self.webcam.wants_frames()
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    pub fn catalog(&self) -> &[ModelDescriptor] {
        &self.catalog
    }

    pub fn lifecycle(&self) -> &ClassifierLifecycle {
        &self.lifecycle
    }

    pub fn static_flow(&self) -> &StaticImageFlow {
        &self.static_flow
    }

    pub fn webcam(&self) -> &WebcamFlow {
        &self.webcam
    }
}
