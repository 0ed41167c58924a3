pub mod config;
pub mod error;
pub mod models;
pub mod types;

pub use config::{ArtifactLocation, DemoConfig, InputLayout};
pub use error::Error;
pub use models::{InferenceBackend, ModelHandle, ModelSpec};
pub use types::{Classification, DecodedImage, Prediction};

pub type Result<T> = std::result::Result<T, Error>;
