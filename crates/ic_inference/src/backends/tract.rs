use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use ic_core::{Error, InferenceBackend, ModelHandle, ModelSpec, Result};
use ndarray::{ArrayD, IxDyn};
use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::{artifact, labels};

/// Runs ONNX artifacts on tract's pure-Rust CPU engine.
#[derive(Debug, Default)]
pub struct TractBackend;

impl TractBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl InferenceBackend for TractBackend {
    fn name(&self) -> &str {
        "tract"
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelHandle>> {
        let bytes = artifact::fetch(&spec.location)
            .await
            .map_err(Error::into_model_load)?;
        let class_names = match &spec.labels {
            Some(location) => labels::load(location).await.map_err(Error::into_model_load)?,
            None => Vec::new(),
        };

        let shape = spec.input_shape();
        let plan = tokio::task::spawn_blocking(move || build_plan(&bytes, shape))
            .await
            .map_err(|e| Error::ModelLoad(format!("model build task failed: {}", e)))??;

        info!(
            "📦 Built tract plan for {} (input {:?}, {} labels)",
            spec.location,
            shape,
            class_names.len()
        );
        Ok(Arc::new(TractModel { plan, class_names }))
    }
}

fn build_plan(bytes: &[u8], shape: [usize; 4]) -> Result<TypedRunnableModel<TypedModel>> {
    tract_onnx::onnx()
        .model_for_read(&mut Cursor::new(bytes))
        .and_then(|model| {
            model.with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(shape[0], shape[1], shape[2], shape[3])),
            )
        })
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|e| Error::ModelLoad(format!("{:#}", e)))
}

pub struct TractModel {
    plan: TypedRunnableModel<TypedModel>,
    class_names: Vec<String>,
}

impl fmt::Debug for TractModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TractModel")
            .field("plan", &"<tract::SimplePlan>")
            .field("class_names", &self.class_names.len())
            .finish()
    }
}

impl ModelHandle for TractModel {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn predict(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(input.shape(), &data)
            .map_err(|e| Error::Inference(format!("{:#}", e)))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| Error::Inference(format!("{:#}", e)))?;
        let first = outputs
            .first()
            .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| Error::Inference(format!("{:#}", e)))?;
        debug!("tract output shape {:?}", view.shape());

        ArrayD::from_shape_vec(IxDyn(view.shape()), view.iter().copied().collect())
            .map_err(|e| Error::Inference(e.to_string()))
    }
}
