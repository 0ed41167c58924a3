use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::ArrayD;

use crate::config::{ArtifactLocation, InputLayout};
use crate::Result;

/// Everything a backend needs to turn an artifact into a runnable model.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub location: ArtifactLocation,
    pub labels: Option<ArtifactLocation>,
    pub image_size: u32,
    pub layout: InputLayout,
}

impl ModelSpec {
    pub fn input_shape(&self) -> [usize; 4] {
        self.layout.input_shape(self.image_size)
    }
}

#[async_trait]
pub trait InferenceBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Fetch and deserialize the artifact described by `spec`.
    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelHandle>>;
}

/// A loaded model. Read-only once built.
pub trait ModelHandle: Send + Sync + fmt::Debug {
    /// Class names shipped with the artifact, indexed like the model output.
    fn class_names(&self) -> &[String];

    /// Run a forward pass on a tensor shaped like [`ModelSpec::input_shape`].
    fn predict(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>>;
}
