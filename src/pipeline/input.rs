//! Input resolution: read a user-supplied path or URL into memory.
//!
//! Every backend works from a byte buffer, so nothing is written to disk.
//! The size cap is enforced before the bytes are held in full: local files
//! by their metadata, downloads by `Content-Length` and then chunk by chunk.
//! The `%PDF` magic is checked last, so callers get a clear error instead of
//! a backend parse failure.

use crate::config::HybridConfig;
use crate::error::Pdf2TextError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF";

/// A document ready for the pipeline.
#[derive(Clone)]
pub struct LoadedInput {
    /// File name or URL, for logs and error messages.
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl std::fmt::Debug for LoadedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedInput")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read `input` (a local path or an HTTP(S) URL) into memory.
pub async fn load_input(input: &str, config: &HybridConfig) -> Result<LoadedInput, Pdf2TextError> {
    let bytes = if is_url(input) {
        download_url(input, config.download_timeout_secs, config.max_file_size).await?
    } else {
        read_local(input, config.max_file_size).await?
    };

    check_pdf_bytes(input, &bytes, config.max_file_size)?;
    Ok(LoadedInput {
        name: input.to_string(),
        bytes: Arc::from(bytes),
    })
}

/// Enforce the size cap and the `%PDF` magic on an in-memory document.
pub fn check_pdf_bytes(source_name: &str, bytes: &[u8], max_size: u64) -> Result<(), Pdf2TextError> {
    let size = bytes.len() as u64;
    if size > max_size {
        return Err(Pdf2TextError::FileTooLarge {
            source_name: source_name.to_string(),
            size,
            limit: max_size,
        });
    }

    // Some generators put a few bytes of junk before the header.
    let head = &bytes[..bytes.len().min(1024)];
    if !head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Err(Pdf2TextError::NotAPdf {
            source_name: source_name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

async fn read_local(path_str: &str, max_size: u64) -> Result<Vec<u8>, Pdf2TextError> {
    let path = PathBuf::from(path_str);
    let io_error = |e: std::io::Error, path: PathBuf| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2TextError::PermissionDenied { path },
        std::io::ErrorKind::NotFound => Pdf2TextError::FileNotFound { path },
        _ => Pdf2TextError::Internal(format!("reading {}: {e}", path.display())),
    };

    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| io_error(e, path.clone()))?;
    if !meta.is_file() {
        return Err(Pdf2TextError::FileNotFound { path });
    }
    if meta.len() > max_size {
        return Err(Pdf2TextError::FileTooLarge {
            source_name: path_str.to_string(),
            size: meta.len(),
            limit: max_size,
        });
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| io_error(e, path.clone()))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

async fn download_url(url: &str, timeout_secs: u64, max_size: u64) -> Result<Vec<u8>, Pdf2TextError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2TextError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let from_reqwest = |e: reqwest::Error| {
        if e.is_timeout() {
            Pdf2TextError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().await.map_err(from_reqwest)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let too_large = |size: u64| Pdf2TextError::FileTooLarge {
        source_name: url.to_string(),
        size,
        limit: max_size,
    };
    if let Some(len) = response.content_length() {
        if len > max_size {
            return Err(too_large(len));
        }
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(from_reqwest)? {
        bytes.extend_from_slice(&chunk);
        if bytes.len() as u64 > max_size {
            return Err(too_large(bytes.len() as u64));
        }
    }

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(max_file_size: u64) -> HybridConfig {
        HybridConfig::builder()
            .max_file_size(max_file_size)
            .build()
            .unwrap()
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_may_follow_leading_junk() {
        assert!(check_pdf_bytes("a", b"\n\n%PDF-1.4 ...", 1024).is_ok());
    }

    #[test]
    fn rejects_non_pdf() {
        let err = check_pdf_bytes("a.png", b"\x89PNG\r\n", 1024).unwrap_err();
        match err {
            Pdf2TextError::NotAPdf { magic, .. } => assert_eq!(magic, b"\x89PNG".to_vec()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_oversized() {
        let err = check_pdf_bytes("big.pdf", b"%PDF-1.7 0123456789", 8).unwrap_err();
        assert!(matches!(
            err,
            Pdf2TextError::FileTooLarge { size: 19, limit: 8, .. }
        ));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_input("/definitely/not/here.pdf", &config(1024))
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2TextError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn loads_local_pdf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.7\n%%EOF\n").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let loaded = load_input(&path, &config(1024)).await.unwrap();
        assert_eq!(&loaded.bytes[..4], b"%PDF");
        assert_eq!(loaded.name, path);
    }

    #[tokio::test]
    async fn local_size_cap_uses_metadata() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'x'; 64]).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let err = load_input(&path, &config(16)).await.unwrap_err();
        assert!(matches!(err, Pdf2TextError::FileTooLarge { size: 64, .. }));
    }
}
