//! Pipeline stages and the collaborators the orchestrator drives.
//!
//! ## Data Flow
//!
//! ```text
//!                  ┌──▶ extract (native text layer) ───────────────────────┐
//! input ──▶ bytes ─┤                                                       ├──▶ consolidate
//! (path/URL)       └──▶ render ──▶ preprocess ──▶ ocr ──▶ postprocess ─────┘
//!                      (pdfium)    (grayscale,    (retry,   (fence/whitespace
//!                                   resize)        batches)  cleanup)
//! ```
//!
//! 1. [`input`]  : read a path or URL into memory, check size and `%PDF`
//! 2. [`extract`]: native text via pdfium, falling back to lopdf
//! 3. [`render`] : rasterise one page; `spawn_blocking` because pdfium is
//!    not async-safe
//! 4. [`preprocess`]: grayscale, resize, contrast and sharpen before upload
//! 5. [`ocr`]    : vision OCR with per-call timeout, [`retry`] and [`batch`]
//!    pacing; [`llm`] is the default service
//! 6. [`postprocess`]: deterministic cleanup of model output
//!
//! [`encode`] and [`pdfium`] are shared helpers for image bytes and library
//! binding.

pub mod batch;
pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pdfium;
pub mod postprocess;
pub mod preprocess;
pub mod render;
pub mod retry;
