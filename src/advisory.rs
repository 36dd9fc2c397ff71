//! Tips shown to the user after a prompt was translated.

use crate::models::{Advisory, LanguageCode};
use std::collections::HashMap;

pub const ENGLISH: &str = include_str!("../data/advisories/en.txt");
pub const JAPANESE: &str = include_str!("../data/advisories/jp.txt");
pub const KOREAN: &str = include_str!("../data/advisories/kor.txt");

/// Language code whose tip is used when a detected language has no entry.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Maps a detected source language to the tip shown after translation.
#[derive(Debug, Clone)]
pub struct AdvisoryTable {
    tips: HashMap<String, String>,
}

impl Default for AdvisoryTable {
    fn default() -> Self {
        Self::new()
            .with_tip("en", ENGLISH)
            .with_tip("jp", JAPANESE)
            .with_tip("kor", KOREAN)
    }
}

impl AdvisoryTable {
    pub fn new() -> Self {
        Self {
            tips: HashMap::new(),
        }
    }

    pub fn with_tip(mut self, code: &str, text: &str) -> Self {
        self.tips.insert(code.to_string(), text.trim().to_string());
        self
    }

    /// Tip for `language`, falling back to the English entry.
    pub fn advisory_for(&self, language: &LanguageCode) -> Advisory {
        let text = self
            .tips
            .get(language.as_str())
            .or_else(|| self.tips.get(FALLBACK_LANGUAGE))
            .cloned()
            .unwrap_or_default();
        Advisory::Shown(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_to_their_tip() {
        let table = AdvisoryTable::default();
        assert_eq!(
            table.advisory_for(&LanguageCode::new("jp")).text(),
            Some("ヒント: 元のテキストは日本語で、中国語に翻訳されます")
        );
        assert_eq!(
            table.advisory_for(&LanguageCode::new("kor")).text(),
            Some("힌트: 원본 텍스트는 한국어이며 중국어로 번역됩니다")
        );
    }

    #[test]
    fn test_unknown_code_falls_back_to_english() {
        let table = AdvisoryTable::default();
        let advisory = table.advisory_for(&LanguageCode::new("fr"));
        assert!(advisory.is_visible());
        assert_eq!(
            advisory.text(),
            Some("Tips: The original text is English. It will be translated into Chinese")
        );
    }

    #[test]
    fn test_tips_are_non_empty() {
        assert!(!ENGLISH.trim().is_empty());
        assert!(!JAPANESE.trim().is_empty());
        assert!(!KOREAN.trim().is_empty());
    }
}
