use std::path::Path;

use image::{DynamicImage, ImageFormat};
use log::{error, info};

use crate::engine::{ClassificationResult, ClassifierHandle};
use crate::presentation::{render_categories, Translations, NO_VALID_CATEGORY};
use crate::ui::{UiState, UPLOAD_PROMPT};

pub const INVALID_IMAGE: &str = "請選擇或貼上有效的圖片檔案。";
pub const NO_CLIPBOARD_IMAGE: &str = "未從剪貼簿中找到圖片。";
pub const SELECTION_CLEARED: &str = "請選擇一張圖片進行分類。";
pub const IMAGE_LOADING: &str = "圖片載入中...";
pub const CLASSIFIER_NOT_READY: &str = "圖片分類器尚未載入，請稍候。";
pub const CLASSIFYING: &str = "正在判定中...";
pub const NO_IMAGE: &str = "❌ 請先選擇或貼上一張圖片。";
pub const CLASSIFY_DONE: &str = "✅ 判定完成。點擊圖片可再次判定。";

/// One item of a clipboard paste
#[derive(Debug, Clone)]
pub struct ClipboardItem {
    pub mime: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ClipboardItem {
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// MIME type guessed from a file extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path).ok().map(|format| format.to_mime_type())
}

/// A fully decoded image ready for classification
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub name: String,
    pub image: DynamicImage,
}

/// Classifies user-supplied still images against the IMAGE-mode handle
#[derive(Debug, Default)]
pub struct StaticImageFlow {
    displayed: Option<LoadedImage>,
}

impl StaticImageFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displayed(&self) -> Option<&LoadedImage> {
        self.displayed.as_ref()
    }

    /// Clears the result after a model switch
    pub fn reset(&mut self, ui: &mut UiState) {
        ui.upload_status = UPLOAD_PROMPT.to_string();
        ui.info = None;
    }

    /// The file picker was emptied
    pub fn clear_selection(&mut self, ui: &mut UiState) {
        self.displayed = None;
        ui.image_visible = false;
        ui.info = None;
        ui.upload_status = SELECTION_CLEARED.to_string();
    }

    /// Loads an image file picked by the user and classifies it once decoded
    pub async fn open_file(
        &mut self,
        path: &Path,
        handle: Option<&dyn ClassifierHandle>,
        ui: &mut UiState,
        translations: &Translations,
    ) -> Option<ClassificationResult> {
        let is_image = mime_for_path(path).map_or(false, |mime| mime.starts_with("image/"));
        if !is_image {
            ui.upload_status = INVALID_IMAGE.to_string();
            ui.file_name.clear();
            return None;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        self.begin_loading(&name, ui);

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read {:?}: {}", path, e);
                ui.upload_status = format!("❌ 圖片載入失敗: {}", e);
                return None;
            }
        };
        self.finish_loading(name, &bytes, handle, ui, translations)
    }

    /// Handles a clipboard paste. The first image item wins.
    pub fn paste(
        &mut self,
        items: &[ClipboardItem],
        handle: Option<&dyn ClassifierHandle>,
        ui: &mut UiState,
        translations: &Translations,
    ) -> Option<ClassificationResult> {
        let Some(item) = items.iter().find(|item| item.is_image()) else {
            ui.upload_status = NO_CLIPBOARD_IMAGE.to_string();
            return None;
        };

        self.begin_loading(&item.name, ui);
        self.finish_loading(item.name.clone(), &item.bytes, handle, ui, translations)
    }

    fn begin_loading(&mut self, name: &str, ui: &mut UiState) {
        ui.info = None;
        ui.file_name = name.to_string();
        ui.upload_status = IMAGE_LOADING.to_string();
    }

    fn finish_loading(
        &mut self,
        name: String,
        bytes: &[u8],
        handle: Option<&dyn ClassifierHandle>,
        ui: &mut UiState,
        translations: &Translations,
    ) -> Option<ClassificationResult> {
        // Classification only ever sees a fully decoded image
        let image = match image::load_from_memory(bytes) {
            Ok(image) => image,
            Err(e) => {
                error!("Failed to decode {}: {}", name, e);
                ui.upload_status = format!("❌ 圖片載入失敗: {}", e);
                return None;
            }
        };
        info!("Loaded image {} ({}x{})", name, image.width(), image.height());
        self.displayed = Some(LoadedImage { name, image });
        ui.image_visible = true;
        self.classify_displayed(handle, ui, translations)
    }

    /// Classifies the displayed image. Also bound to clicks on the image, so
    /// it can be re-run without uploading again.
    pub fn classify_displayed(
        &self,
        handle: Option<&dyn ClassifierHandle>,
        ui: &mut UiState,
        translations: &Translations,
    ) -> Option<ClassificationResult> {
        let Some(handle) = handle else {
            ui.upload_status = CLASSIFIER_NOT_READY.to_string();
            return None;
        };

        ui.upload_status = CLASSIFYING.to_string();

        let loaded = match &self.displayed {
            Some(loaded) if ui.image_visible => loaded,
            _ => {
                ui.upload_status = NO_IMAGE.to_string();
                return None;
            }
        };

        match handle.classify(&loaded.image) {
            Ok(result) => {
                ui.info = Some(render_static(&result, handle.options().score_threshold, translations));
                ui.upload_status = CLASSIFY_DONE.to_string();
                Some(result)
            }
            Err(e) => {
                error!("Static image classification failed: {}", e);
                ui.upload_status = format!("❌ 分類失敗: {}", e);
                None
            }
        }
    }
}

/// Text of the result paragraph for one still-image result
pub fn render_static(result: &ClassificationResult, threshold: f32, translations: &Translations) -> String {
    if result.is_empty() {
        return NO_VALID_CATEGORY.to_string();
    }
    render_categories(&result.categories, threshold, translations)
}
