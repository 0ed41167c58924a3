use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A decoded, non-empty RGB bitmap ready to be classified.
#[derive(Clone)]
pub struct DecodedImage {
    name: String,
    pixels: RgbImage,
}

impl DecodedImage {
    pub fn from_rgb(name: impl Into<String>, pixels: RgbImage) -> Result<Self> {
        let name = name.into();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(Error::InvalidImage(format!("{} has no pixels", name)));
        }
        Ok(Self { name, pixels })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(Error::InvalidImage(format!("{} is empty", name)));
        }
        if !Self::is_image(bytes) {
            return Err(Error::UnsupportedImage(format!("{} is not a known image format", name)));
        }
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::InvalidImage(format!("{}: {}", name, e)))?;
        Self::from_rgb(name, decoded.to_rgb8())
    }

    /// Read and decode a file; decoding runs on the blocking pool.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!("Decoding {} ({} bytes)", name, bytes.len());
        tokio::task::spawn_blocking(move || Self::from_bytes(name, &bytes))
            .await
            .map_err(|e| Error::External(e.into()))?
    }

    /// Cheap sniff of the leading bytes, no decoding.
    pub fn is_image(bytes: &[u8]) -> bool {
        image::guess_format(bytes).is_ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("name", &self.name)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// The ranked output of one prediction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub source: String,
    pub predictions: Vec<Prediction>,
    pub total_ms: u64,
    pub inference_ms: u64,
    pub classified_at: DateTime<Utc>,
}

impl Classification {
    pub fn top(&self) -> Option<&Prediction> {
        self.predictions.first()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.predictions.iter().map(|p| p.label.as_str()).collect()
    }
}
