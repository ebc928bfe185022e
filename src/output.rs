//! Conversion result values.
//!
//! A conversion never fails with `Err`; every outcome, good or bad, is a
//! [`ConversionResult`]. The enum makes "exactly one of artifact or error"
//! structural instead of a field convention.

use crate::pipeline::encode::EncodedImage;
use serde::Serialize;

/// Outcome of converting one page (or of a call that failed before any page).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    Success {
        /// Addressable reference to `file` (a `data:` URL).
        #[serde(skip_serializing)]
        image_url: String,
        file: EncodedImage,
    },
    Failure {
        message: String,
    },
}

/// Results of a range conversion, in ascending page order.
pub type ConversionResultList = Vec<ConversionResult>;

impl ConversionResult {
    /// Wrap an encoded artifact together with its addressable reference.
    pub fn success(file: EncodedImage) -> Self {
        Self::Success {
            image_url: file.data_url(),
            file,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The addressable reference, or `""` for a failure.
    pub fn image_url(&self) -> &str {
        match self {
            Self::Success { image_url, .. } => image_url,
            Self::Failure { .. } => "",
        }
    }

    pub fn file(&self) -> Option<&EncodedImage> {
        match self {
            Self::Success { file, .. } => Some(file),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message } => Some(message),
        }
    }

    pub fn into_file(self) -> Option<EncodedImage> {
        match self {
            Self::Success { file, .. } => Some(file),
            Self::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> EncodedImage {
        EncodedImage {
            name: "doc_page_1.png".into(),
            mime_type: "image/png".into(),
            page_number: 1,
            width: 2,
            height: 2,
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn success_carries_reference_and_artifact() {
        let r = ConversionResult::success(image());
        assert!(r.is_success());
        assert!(r.image_url().starts_with("data:image/png;base64,"));
        assert_eq!(r.file().map(|f| f.name.as_str()), Some("doc_page_1.png"));
        assert_eq!(r.error(), None);
    }

    #[test]
    fn failure_has_empty_reference_and_no_file() {
        let r = ConversionResult::failure("Invalid page number: 5. Document has 2 pages.");
        assert!(!r.is_success());
        assert_eq!(r.image_url(), "");
        assert!(r.file().is_none());
        assert_eq!(r.error(), Some("Invalid page number: 5. Document has 2 pages."));
        assert!(r.into_file().is_none());
    }

    #[test]
    fn serialises_with_status_tag() {
        let ok = serde_json::to_value(ConversionResult::success(image())).unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["file"]["name"], "doc_page_1.png");
        assert!(ok.get("image_url").is_none());
        assert!(ok["file"].get("bytes").is_none());

        let err = serde_json::to_value(ConversionResult::failure("boom")).unwrap();
        assert_eq!(err["status"], "failure");
        assert_eq!(err["message"], "boom");
    }
}
