//! Post-processing: deterministic cleanup of OCR output.
//!
//! Vision models are asked for plain text but still wrap it in code fences,
//! open with a chatty preamble, or emit Windows line endings and zero-width
//! characters. These rules fix that without touching content.
//!
//! The fence and preamble regexes accept `\r?\n`, so they run before line
//! endings are normalised. Whitespace rules run last and see the final lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw OCR text.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence (```` ``` ````, ```` ```text ````, ...)
/// 2. Drop a leading "Here is the text..." preamble line
/// 3. Normalise line endings (CRLF / CR → LF)
/// 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 5. Trim trailing whitespace per line
/// 6. Collapse 3+ consecutive newlines to one blank line
/// 7. Trim leading and trailing blank lines
pub fn clean_ocr_text(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = strip_preamble(&s);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Outer fence ──────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n```\s*$").expect("valid fence regex")
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Preamble ─────────────────────────────────────────────────────

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:sure[,!.]?\s*)?here(?: is|'s| are) (?:the )?(?:transcribed |extracted |ocr )?(?:text|transcription)[^\n]*:\s*\r?\n",
    )
    .expect("valid preamble regex")
});

fn strip_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input, "").into_owned()
}

// ── Rule 3: Line endings ─────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 4: Invisible characters ─────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            )
        })
        .collect()
}

// ── Rule 5: Trailing whitespace ──────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Blank lines ──────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank-line regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        assert_eq!(clean_ocr_text("```text\nInvoice 42\nTotal 10\n```"), "Invoice 42\nTotal 10");
        assert_eq!(clean_ocr_text("```\nplain\n```\n"), "plain");
    }

    #[test]
    fn inner_fences_are_kept() {
        let input = "before\n```\ncode\n```\nafter";
        assert_eq!(clean_ocr_text(input), input);
    }

    #[test]
    fn strips_preamble() {
        assert_eq!(
            clean_ocr_text("Here is the transcribed text:\nChapter 1\nIt begins."),
            "Chapter 1\nIt begins."
        );
        assert_eq!(clean_ocr_text("Sure! Here's the text from the image:\nHello"), "Hello");
    }

    #[test]
    fn body_mentioning_text_is_kept() {
        let input = "The text below is binding.\nHere is the text: none.";
        assert_eq!(clean_ocr_text(input), input);
    }

    #[test]
    fn normalises_whitespace() {
        assert_eq!(
            clean_ocr_text("\r\n\r\nline one   \r\n\r\n\r\n\r\nline two\t\r\n\n"),
            "line one\n\nline two"
        );
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(clean_ocr_text("\u{FEFF}co\u{200B}de\u{00AD}x"), "codex");
    }

    #[test]
    fn preserves_diacritics_and_columns() {
        let input = "Hợp đồng  số 12\nBên A    Bên B";
        assert_eq!(clean_ocr_text(input), input);
    }
}
