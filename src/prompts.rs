//! Prompts for vision-based page transcription.
//!
//! Callers can override the default via
//! [`crate::config::HybridConfig::system_prompt`]; a language hint from
//! [`crate::config::OcrOptions::language`] is appended either way.

/// Default prompt for transcribing a page image to plain text.
pub const DEFAULT_OCR_PROMPT: &str = r#"You are an OCR engine. Transcribe ALL text visible in this page image.

Rules:
1. Output plain text only. No Markdown, no HTML, no code fences.
2. Preserve the reading order a human would follow, including multi-column layouts.
3. Keep line breaks between paragraphs, list items and table rows.
4. For tables, put one row per line and separate cells with two spaces.
5. Keep every diacritic and special character exactly as printed.
6. Do not translate, summarise, correct or explain anything.
7. If the page contains no text, output nothing."#;

/// Build the prompt for one run.
pub fn ocr_prompt(custom: Option<&str>, language: Option<&str>) -> String {
    let base = custom.unwrap_or(DEFAULT_OCR_PROMPT);
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => format!(
            "{base}\n\nThe document is written in {lang}. Transcribe it in {lang}, keeping its alphabet and diacritics."
        ),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_without_language() {
        assert_eq!(ocr_prompt(None, None), DEFAULT_OCR_PROMPT);
        assert_eq!(ocr_prompt(None, Some("  ")), DEFAULT_OCR_PROMPT);
    }

    #[test]
    fn language_hint_is_appended() {
        let p = ocr_prompt(None, Some("Vietnamese"));
        assert!(p.starts_with(DEFAULT_OCR_PROMPT));
        assert!(p.contains("written in Vietnamese"));
    }

    #[test]
    fn custom_prompt_replaces_default() {
        let p = ocr_prompt(Some("Read the page."), Some("fr"));
        assert!(p.starts_with("Read the page."));
        assert!(!p.contains("OCR engine"));
        assert!(p.contains("fr"));
    }
}
