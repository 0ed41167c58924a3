use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::ModelSpec;
use crate::{Error, Result};

/// Model artifact shipped next to the binary.
pub const MODEL_PATH: &str = "models/mobilenet_v2.onnx";
/// Class names for [`MODEL_PATH`], one per line.
pub const LABELS_PATH: &str = "models/imagenet_labels.txt";
/// Image classified as soon as the model is ready.
pub const PRELOADED_IMAGE: &str = "assets/cat.jpg";
/// Square input edge the model expects.
pub const IMAGE_SIZE: u32 = 224;
pub const TOPK_PREDICTIONS: usize = 10;

/// Where a model artifact (or its labels) lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Remote(Url),
    Local(PathBuf),
}

impl FromStr for ArtifactLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUrl("empty artifact location".to_string()));
        }

        match Url::parse(trimmed) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::Local)
                    .map_err(|_| Error::InvalidUrl(format!("not a file path: {}", trimmed))),
                // `C:\models\net.onnx` parses with a one-letter scheme
                scheme if scheme.len() == 1 => Ok(Self::Local(PathBuf::from(trimmed))),
                scheme => Err(Error::InvalidUrl(format!(
                    "unsupported scheme '{}' in {}",
                    scheme, trimmed
                ))),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::Local(PathBuf::from(trimmed))),
            Err(e) => Err(Error::InvalidUrl(format!("{}: {}", trimmed, e))),
        }
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{}", url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Memory layout of the model's image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    /// `1 x S x S x 3`, channels last.
    #[default]
    Nhwc,
    /// `1 x 3 x S x S`, channels first.
    Nchw,
}

impl InputLayout {
    pub fn channel_axis(self) -> usize {
        match self {
            Self::Nhwc => 3,
            Self::Nchw => 1,
        }
    }

    pub fn input_shape(self, size: u32) -> [usize; 4] {
        let s = size as usize;
        match self {
            Self::Nhwc => [1, s, s, 3],
            Self::Nchw => [1, 3, s, s],
        }
    }
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub model: ArtifactLocation,
    pub labels: Option<ArtifactLocation>,
    pub image_size: u32,
    pub top_k: usize,
    pub layout: InputLayout,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            model: ArtifactLocation::Local(PathBuf::from(MODEL_PATH)),
            labels: Some(ArtifactLocation::Local(PathBuf::from(LABELS_PATH))),
            image_size: IMAGE_SIZE,
            top_k: TOPK_PREDICTIONS,
            layout: InputLayout::default(),
        }
    }
}

impl DemoConfig {
    pub fn model_spec(&self) -> ModelSpec {
        ModelSpec {
            location: self.model.clone(),
            labels: self.labels.clone(),
            image_size: self.image_size,
            layout: self.layout,
        }
    }
}
