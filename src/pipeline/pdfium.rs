//! Binding to the pdfium shared library.
//!
//! Resolution order:
//! 1. `PDFIUM_LIB_PATH`: an explicit library file, or a directory holding
//!    the platform library (`libpdfium.so`, `libpdfium.dylib`, `pdfium.dll`).
//! 2. The current working directory.
//! 3. The system loader search path.
//!
//! Bindings are created per call, inside the blocking task that uses them.

use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an existing pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium, returning a human-readable reason on failure.
pub fn bind_pdfium() -> Result<Pdfium, String> {
    if let Ok(raw) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !raw.trim().is_empty() {
            let path = library_file(Path::new(raw.trim()));
            return Pdfium::bind_to_library(&path)
                .map(Pdfium::new)
                .map_err(|e| format!("{}={}: {e}", PDFIUM_LIB_PATH_ENV, path.display()));
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    if let Ok(bindings) = Pdfium::bind_to_library(&local) {
        debug!("Bound pdfium from working directory");
        return Ok(Pdfium::new(bindings));
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| format!("system library: {e}"))
}

/// Accept either the library file itself or its directory.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

/// Render a pdfium load error, flagging encrypted documents explicitly.
pub fn describe_load_error(e: &PdfiumError) -> String {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        format!("document is encrypted: {msg}")
    } else {
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_resolves_to_platform_library_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = library_file(dir.path());
        assert!(file.starts_with(dir.path()));
        assert!(file.to_string_lossy().contains("pdfium"));
    }

    #[test]
    fn file_path_is_kept() {
        let p = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(library_file(p), p.to_path_buf());
    }
}
