use image::ImageFormat;
use reqwest::Client;
use std::time::Duration;

use crate::services::backend::BackendError;

/// Marker shown in place of an evidence image that failed to load.
pub const LOAD_FAILED_MARKER: &str = "⚠ Load failed";

/// Marker shown when a record has no evidence image at all.
pub const NO_EVIDENCE_MARKER: &str = "-";

/// Outcome of loading one evidence image. Failures are cosmetic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    Image {
        url: String,
        format: ImageFormat,
        bytes: Vec<u8>,
    },
    Unavailable {
        url: String,
        reason: String,
    },
    Missing,
}

impl Evidence {
    /// Inspect downloaded bytes and accept them only if they are a known image format.
    pub fn from_bytes(url: &str, bytes: Vec<u8>) -> Self {
        match image::guess_format(&bytes) {
            Ok(format) => Evidence::Image {
                url: url.to_string(),
                format,
                bytes,
            },
            Err(e) => Evidence::Unavailable {
                url: url.to_string(),
                reason: EvidenceError::UnrecognizedFormat(e.to_string()).to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Evidence::Image { .. })
    }

    /// Text to render instead of the image, if any.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Evidence::Image { .. } => None,
            Evidence::Unavailable { .. } => Some(LOAD_FAILED_MARKER),
            Evidence::Missing => Some(NO_EVIDENCE_MARKER),
        }
    }
}

/// Downloads evidence images referenced by report rows.
pub struct EvidenceLoader {
    http: Client,
}

impl EvidenceLoader {
    pub fn new(timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Load a resolved evidence URL. Never fails; broken images become placeholders.
    pub async fn load(&self, url: Option<&str>) -> Evidence {
        let Some(url) = url else {
            return Evidence::Missing;
        };

        let evidence = match self.fetch(url).await {
            Ok(bytes) => Evidence::from_bytes(url, bytes),
            Err(e) => Evidence::Unavailable {
                url: url.to_string(),
                reason: e.to_string(),
            },
        };

        if let Evidence::Unavailable { reason, .. } = &evidence {
            tracing::warn!(url, reason = %reason, "Evidence image failed to load");
        }
        evidence
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, EvidenceError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("Image request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not a recognised image: {0}")]
    UnrecognizedFormat(String),
}
