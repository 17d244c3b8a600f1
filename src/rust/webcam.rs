use log::{debug, error, info, warn};

use crate::camera::{CameraError, MediaStream};
use crate::engine::ClassifierHandle;
use crate::presentation::{render_live, Translations};
use crate::ui::{CameraButton, UiState, WEBCAM_IDLE};

pub const VIDEO_CLASSIFIER_NOT_READY: &str = "視訊分類器尚未載入完成，請稍候。";
pub const ACQUIRE_FAILED: &str = "無法取得視訊鏡頭串流。請檢查權限或您的裝置。";

/// Ticket tying a camera acquisition to the `enable` call that started it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Stream is live but has not produced its first frame yet
    WaitingForFrame,
    Running,
    Stopped,
}

/// Result of one frame pump tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStep {
    Reschedule,
    Stop,
}

pub struct WebcamSession {
    stream: Box<dyn MediaStream>,
    last_video_time: Option<f64>,
    pump: PumpState,
}

impl WebcamSession {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream,
            last_video_time: None,
            pump: PumpState::WaitingForFrame,
        }
    }

    pub fn pump(&self) -> PumpState {
        self.pump
    }

    pub fn last_video_time(&self) -> Option<f64> {
        self.last_video_time
    }
}

pub enum WebcamState {
    Idle,
    Acquiring(AcquireTicket),
    Streaming(WebcamSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebcamStatus {
    Idle,
    Acquiring,
    Streaming,
}

/// Camera lifecycle and the frame pump feeding the VIDEO-mode handle.
///
/// `Idle -> Acquiring -> Streaming -> Idle`. The pump runs only in
/// `Streaming`, until it is marked stopped or the VIDEO handle goes away.
pub struct WebcamFlow {
    state: WebcamState,
    next_ticket: u64,
}

impl Default for WebcamFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl WebcamFlow {
    pub fn new() -> Self {
        Self {
            state: WebcamState::Idle,
            next_ticket: 0,
        }
    }

    pub fn status(&self) -> WebcamStatus {
        match self.state {
            WebcamState::Idle => WebcamStatus::Idle,
            WebcamState::Acquiring(_) => WebcamStatus::Acquiring,
            WebcamState::Streaming(_) => WebcamStatus::Streaming,
        }
    }

    pub fn session(&self) -> Option<&WebcamSession> {
        match &self.state {
            WebcamState::Streaming(session) => Some(session),
            _ => None,
        }
    }

    /// Starts enabling the camera. The buttons swap before the acquisition
    /// resolves; the caller runs the acquisition and reports back through
    /// [`complete_acquire`](Self::complete_acquire).
    pub fn begin_enable(&mut self, video_ready: bool, ui: &mut UiState) -> Option<AcquireTicket> {
        if !video_ready {
            ui.notify(VIDEO_CLASSIFIER_NOT_READY);
            return None;
        }
        if !matches!(self.state, WebcamState::Idle) {
            debug!("Camera already {:?}, ignoring enable", self.status());
            return None;
        }

        self.next_ticket += 1;
        let ticket = AcquireTicket(self.next_ticket);
        ui.camera_button = CameraButton::Disable;
        self.state = WebcamState::Acquiring(ticket);
        info!("Requesting camera stream");
        Some(ticket)
    }

    pub fn complete_acquire(
        &mut self,
        ticket: AcquireTicket,
        result: Result<Box<dyn MediaStream>, CameraError>,
        ui: &mut UiState,
    ) {
        let current = matches!(self.state, WebcamState::Acquiring(t) if t == ticket);
        match (current, result) {
            (true, Ok(stream)) => {
                info!("Camera stream acquired with {} track(s)", stream.track_count());
                self.state = WebcamState::Streaming(WebcamSession::new(stream));
            }
            (true, Err(e)) => {
                error!("Failed to acquire camera stream: {}", e);
                self.state = WebcamState::Idle;
                ui.camera_button = CameraButton::Enable;
                ui.notify(format!("{}({})", ACQUIRE_FAILED, e));
            }
            (false, Ok(mut stream)) => {
                warn!("Camera stream arrived after the camera was disabled, stopping it");
                stream.stop();
            }
            (false, Err(e)) => {
                debug!("Ignoring failure of superseded camera request: {}", e);
            }
        }
    }

    /// Stops the camera. Safe to call in any state.
    pub fn disable(&mut self, ui: &mut UiState) {
        if let WebcamState::Streaming(session) = &mut self.state {
            session.stream.stop();
            session.pump = PumpState::Stopped;
        }
        self.state = WebcamState::Idle;
        ui.camera_button = CameraButton::Enable;
        ui.live_result = WEBCAM_IDLE.to_string();
        info!("Camera disabled");
    }

    /// Whether the event loop should keep delivering animation frames
    pub fn wants_frames(&self) -> bool {
        match &self.state {
            WebcamState::Streaming(session) => session.pump != PumpState::Stopped,
            _ => false,
        }
    }

    /// One frame pump tick.
    ///
    /// Terminates once the pump is marked stopped, the session is gone or
    /// the VIDEO handle is missing. Frames whose playback time has not moved
    /// since the last tick are skipped.
    pub fn on_animation_frame(
        &mut self,
        handle: Option<&mut dyn ClassifierHandle>,
        now_ms: u64,
        ui: &mut UiState,
        translations: &Translations,
    ) -> PumpStep {
        let WebcamState::Streaming(session) = &mut self.state else {
            return PumpStep::Stop;
        };

        if session.pump == PumpState::WaitingForFrame {
            if !session.stream.has_frame() {
                return PumpStep::Reschedule;
            }
            info!("First camera frame ready, starting frame pump");
            session.pump = PumpState::Running;
        }
        if session.pump == PumpState::Stopped {
            return PumpStep::Stop;
        }

        let handle = match handle {
            Some(handle) if !handle.is_closed() && session.stream.is_live() => handle,
            _ => {
                info!("Frame pump stopped");
                session.pump = PumpState::Stopped;
                return PumpStep::Stop;
            }
        };

        let video_time = session.stream.current_time();
        if session.last_video_time == Some(video_time) {
            return PumpStep::Reschedule;
        }
        session.last_video_time = Some(video_time);

        let Some(frame) = session.stream.current_frame() else {
            return PumpStep::Reschedule;
        };

        match handle.classify_for_video(&frame, now_ms) {
            Ok(result) => {
                debug!("Frame at {:.3}s classified: {} categories", video_time, result.categories.len());
                ui.live_result = render_live(&result.categories, handle.options().score_threshold, translations);
            }
            Err(e) => {
                error!("Video frame classification failed: {}", e);
                ui.live_result = format!("❌ 分類失敗: {}", e);
            }
        }
        PumpStep::Reschedule
    }
}
