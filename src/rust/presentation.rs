//! Label translation and result formatting.
//!
//! Everything here is pure: the same categories, threshold and translation
//! table always render to the same text.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;

use crate::engine::Category;

/// Threshold used when a classifier reports no usable threshold of its own
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;

/// Separator between rendered categories
pub const SEPARATOR: &str = " | ";

/// Prefix of the live camera classification line
pub const LIVE_PREFIX: &str = "分類結果: ";

pub const NO_VALID_CATEGORY: &str = "未檢測到有效分類。";
pub const NO_VALID_CATEGORY_LIVE: &str = "未檢測到有效分類...";

lazy_static! {
    static ref DEFAULT_TRANSLATIONS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("normal", "正常");
        m.insert("pneumonia", "肺炎");
        m.insert("tuberculosis", "結核病");
        m
    };
}

/// Maps lowercase canonical labels to localized display labels
#[derive(Debug, Clone, PartialEq)]
pub struct Translations {
    table: HashMap<String, String>,
}

impl Default for Translations {
    fn default() -> Self {
        Self {
            table: DEFAULT_TRANSLATIONS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Translations {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Builds a table from configured entries. Keys are lowercased.
    pub fn from_map(entries: &BTreeMap<String, String>) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        }
    }

    /// Looks up a label case-insensitively. Unknown labels come back unchanged.
    pub fn translate<'a>(&'a self, label: &'a str) -> &'a str {
        self.table
            .get(&label.to_lowercase())
            .map(String::as_str)
            .unwrap_or(label)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Rounds a `[0, 1]` score to an integer percentage
pub fn percent(score: f32) -> i64 {
    (score as f64 * 100.0).round() as i64
}

/// Zero or negative thresholds count as unset
pub fn effective_threshold(threshold: f32) -> f32 {
    if threshold > 0.0 {
        threshold
    } else {
        DEFAULT_SCORE_THRESHOLD
    }
}

/// `"translated-label: NN%"`
pub fn format_category(label: &str, score: f32, translations: &Translations) -> String {
    format!("{}: {}%", translations.translate(label), percent(score))
}

pub fn below_threshold_message(threshold: f32) -> String {
    format!("未檢測到高於 {}% 準確率的分類結果。", percent(threshold))
}

/// Renders the categories that reach the threshold, or the below-threshold
/// message when none do.
pub fn render_categories(
    categories: &[Category],
    threshold: f32,
    translations: &Translations,
) -> String {
    let threshold = effective_threshold(threshold);
    let kept: Vec<String> = categories
        .iter()
        .filter(|c| c.score >= threshold)
        .map(|c| format_category(&c.category_name, c.score, translations))
        .collect();

    if kept.is_empty() {
        below_threshold_message(threshold)
    } else {
        kept.join(SEPARATOR)
    }
}

/// Renders one live frame result for the camera line
pub fn render_live(categories: &[Category], threshold: f32, translations: &Translations) -> String {
    if categories.is_empty() {
        return NO_VALID_CATEGORY_LIVE.to_string();
    }
    let threshold = effective_threshold(threshold);
    if categories.iter().all(|c| c.score < threshold) {
        return below_threshold_message(threshold);
    }
    format!("{}{}", LIVE_PREFIX, render_categories(categories, threshold, translations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(entries: &[(&str, f32)]) -> Vec<Category> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (label, score))| Category::new(i, *label, *score))
            .collect()
    }

    #[test]
    fn test_translated_filtered_rounded() {
        let result = categories(&[("Normal", 0.92), ("Pneumonia", 0.05)]);
        let text = render_categories(&result, 0.1, &Translations::default());
        assert_eq!(text, "正常: 92%");
    }

    #[test]
    fn test_below_threshold_message() {
        let result = categories(&[("Pneumonia", 0.05)]);
        let text = render_categories(&result, 0.5, &Translations::default());
        assert!(text.contains("50%"));
        assert_eq!(text, "未檢測到高於 50% 準確率的分類結果。");
    }

    #[test]
    fn test_unknown_label_passes_through() {
        let translations = Translations::default();
        assert_eq!(translations.translate("Daisy"), "Daisy");
        assert_eq!(translations.translate("TUBERCULOSIS"), "結核病");
        assert_eq!(format_category("Daisy", 0.456, &translations), "Daisy: 46%");
    }

    #[test]
    fn test_multiple_entries_joined() {
        let result = categories(&[("normal", 0.6), ("pneumonia", 0.3), ("rose", 0.05)]);
        let text = render_categories(&result, 0.1, &Translations::default());
        assert_eq!(text, "正常: 60% | 肺炎: 30%");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let result = categories(&[("rose", 0.5)]);
        assert_eq!(render_categories(&result, 0.5, &Translations::empty()), "rose: 50%");
    }

    #[test]
    fn test_unset_threshold_falls_back() {
        let result = categories(&[("rose", 0.05)]);
        let text = render_categories(&result, 0.0, &Translations::empty());
        assert_eq!(text, "未檢測到高於 10% 準確率的分類結果。");
    }

    #[test]
    fn test_render_live() {
        let translations = Translations::default();
        assert_eq!(render_live(&[], 0.1, &translations), NO_VALID_CATEGORY_LIVE);
        assert_eq!(
            render_live(&categories(&[("normal", 0.8)]), 0.1, &translations),
            "分類結果: 正常: 80%"
        );
        assert!(render_live(&categories(&[("normal", 0.02)]), 0.1, &translations).contains("10%"));
    }

    #[test]
    fn test_configured_translations() {
        let mut entries = BTreeMap::new();
        entries.insert("Rose".to_string(), "玫瑰".to_string());
        let translations = Translations::from_map(&entries);
        assert_eq!(translations.translate("rose"), "玫瑰");
        assert_eq!(translations.translate("normal"), "normal");
    }
}
