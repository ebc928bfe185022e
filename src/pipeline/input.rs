//! Input: the raw bytes of one uploaded document plus the name it came with.
//!
//! Upload collaborators hand over bytes they have already validated, so
//! [`SourceDocument::new`] checks nothing. [`SourceDocument::from_path`] is
//! for callers holding a file instead; it applies the same limits an upload
//! would (20 MiB, `%PDF` magic) so a bad file fails here with a clear error
//! rather than deep inside the engine.

use crate::error::ConvertError;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Largest document accepted from disk, matching the upload limit.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A document to convert.
///
/// The bytes are reference-counted so a conversion can move them onto a
/// blocking thread without copying.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    /// Wrap already-validated bytes. `name` is used to derive artifact names.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read and validate a PDF from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_to_input_error(path, e))?;
        if !meta.is_file() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if meta.len() > MAX_UPLOAD_BYTES {
            return Err(ConvertError::TooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| io_to_input_error(path, e))?;

        if !bytes.starts_with(PDF_MAGIC) {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(ConvertError::NotAPdf {
                path: path.to_path_buf(),
                magic,
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn io_to_input_error(path: &Path, e: std::io::Error) -> ConvertError {
    match e.kind() {
        ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
            path: path.to_path_buf(),
        },
        ErrorKind::NotFound => ConvertError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ConvertError::Internal(format!("reading '{}': {e}", path.display())),
    }
}
