use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Model is not ready yet")]
    NotReady,

    #[error("Controller was already initialized")]
    AlreadyInitialized,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Rewraps any error raised while fetching or building a model as a load failure.
    pub fn into_model_load(self) -> Self {
        match self {
            Error::ModelLoad(_) => self,
            other => Error::ModelLoad(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
