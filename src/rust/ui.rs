use std::fmt::Write;

pub const MODEL_LOADING: &str = "正在載入模型...";
pub const MODEL_READY: &str = "✅ 模型載入完成。";
pub const NO_MODEL_SELECTED: &str = "❌ 請先選擇一個模型。";
pub const UPLOAD_PROMPT: &str = "請上傳圖片";
pub const WEBCAM_IDLE: &str = "等待啟用視訊鏡頭...";
pub const WEBCAM_UNSUPPORTED: &str = "瀏覽器不支持視訊鏡頭";
pub const ENABLE_WEBCAM_LABEL: &str = "啟用視訊鏡頭";

/// Which of the two camera buttons is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraButton {
    Enable,
    Disable,
}

/// Everything the front-end shows. Flows write to it; the terminal front-end
/// renders it after each event.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub model_status: String,
    pub model_status_detail: String,
    pub demos_visible: bool,
    pub webcam_button_enabled: bool,
    pub webcam_button_label: String,
    pub file_input_enabled: bool,
    pub camera_button: CameraButton,
    pub upload_status: String,
    pub file_name: String,
    pub image_visible: bool,
    /// Result paragraph under the uploaded image
    pub info: Option<String>,
    pub live_result: String,
    /// Last modal notice
    pub notice: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            model_status: String::new(),
            model_status_detail: String::new(),
            demos_visible: false,
            webcam_button_enabled: false,
            webcam_button_label: ENABLE_WEBCAM_LABEL.to_string(),
            file_input_enabled: false,
            camera_button: CameraButton::Enable,
            upload_status: String::new(),
            file_name: String::new(),
            image_visible: false,
            info: None,
            live_result: WEBCAM_IDLE.to_string(),
            notice: None,
        }
    }
}

impl UiState {
    /// Enables or disables the controls that need a loaded model
    pub fn set_dependent_controls(&mut self, enabled: bool, camera_supported: bool) {
        self.webcam_button_enabled = enabled && camera_supported;
        self.file_input_enabled = enabled;
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ==", self.model_status);
        if !self.model_status_detail.is_empty() {
            let _ = writeln!(out, "   {}", self.model_status_detail);
        }
        if !self.demos_visible {
            return out;
        }

        let mark = |enabled: bool| if enabled { "" } else { " (disabled)" };
        let _ = writeln!(out, "-- Image --{}", mark(self.file_input_enabled));
        if !self.file_name.is_empty() {
            let _ = writeln!(out, "   file: {}", self.file_name);
        }
        let _ = writeln!(out, "   {}", self.upload_status);
        if let Some(info) = &self.info {
            let _ = writeln!(out, "   > {}", info);
        }

        let button = match self.camera_button {
            CameraButton::Enable => format!("[{}]{}", self.webcam_button_label, mark(self.webcam_button_enabled)),
            CameraButton::Disable => "[關閉視訊鏡頭]".to_string(),
        };
        let _ = writeln!(out, "-- Camera -- {}", button);
        let _ = writeln!(out, "   {}", self.live_result);
        out
    }
}
