use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ic_core::{Error, InferenceBackend, InputLayout, ModelHandle, ModelSpec, Result};
use ndarray::{ArrayD, Axis, IxDyn};
use tokio::sync::{oneshot, Mutex};

pub const DUMMY_CLASSES: [&str; 3] = ["red", "green", "blue"];

const SHARPNESS: f32 = 4.0;

/// A colour classifier that needs no artifact: it scores each class by the
/// mean of the matching input channel.
pub struct DummyBackend {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    load_failure: Option<String>,
    predict_failure: Option<(usize, String)>,
    loads: AtomicUsize,
    predictions: Arc<AtomicUsize>,
}

impl fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyBackend")
            .field("load_failure", &self.load_failure)
            .field("predict_failure", &self.predict_failure)
            .finish()
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    pub fn new() -> Self {
        Self {
            gate: Mutex::new(None),
            load_failure: None,
            predict_failure: None,
            loads: AtomicUsize::new(0),
            predictions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every load fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            load_failure: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Loads succeed, every forward pass fails with `reason`.
    pub fn failing_predictions(reason: impl Into<String>) -> Self {
        Self::failing_predictions_after(0, reason)
    }

    /// The first `healthy` forward passes succeed, later ones fail with `reason`.
    pub fn failing_predictions_after(healthy: usize, reason: impl Into<String>) -> Self {
        Self {
            predict_failure: Some((healthy, reason.into())),
            ..Self::new()
        }
    }

    /// The first load waits until the returned sender fires.
    pub fn gated() -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let backend = Self {
            gate: Mutex::new(Some(rx)),
            ..Self::new()
        };
        (backend, tx)
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Forward passes run by every model this backend loaded, warmups included.
    pub fn prediction_count(&self) -> usize {
        self.predictions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl InferenceBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelHandle>> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| Error::ModelLoad("load was abandoned".to_string()))?;
        }

        if let Some(reason) = &self.load_failure {
            return Err(Error::ModelLoad(reason.clone()));
        }

        Ok(Arc::new(DummyModel {
            input_shape: spec.input_shape().to_vec(),
            layout: spec.layout,
            class_names: DUMMY_CLASSES.iter().map(|c| c.to_string()).collect(),
            predict_failure: self.predict_failure.clone(),
            predictions: Arc::clone(&self.predictions),
        }))
    }
}

#[derive(Debug)]
pub struct DummyModel {
    input_shape: Vec<usize>,
    layout: InputLayout,
    class_names: Vec<String>,
    predict_failure: Option<(usize, String)>,
    predictions: Arc<AtomicUsize>,
}

impl ModelHandle for DummyModel {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn predict(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let previous = self.predictions.fetch_add(1, Ordering::SeqCst);

        if let Some((healthy, reason)) = &self.predict_failure {
            if previous >= *healthy {
                return Err(Error::Inference(reason.clone()));
            }
        }
        if input.shape() != self.input_shape.as_slice() {
            return Err(Error::Inference(format!(
                "expected input shape {:?}, got {:?}",
                self.input_shape,
                input.shape()
            )));
        }

        let axis = Axis(self.layout.channel_axis());
        let logits: Vec<f32> = (0..DUMMY_CLASSES.len())
            .map(|c| input.index_axis(axis, c).mean().unwrap_or(0.0) * SHARPNESS)
            .collect();

        ArrayD::from_shape_vec(IxDyn(&[1, logits.len()]), softmax(&logits))
            .map_err(|e| Error::Inference(e.to_string()))
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ic_core::{ArtifactLocation, DemoConfig};

    fn spec(size: u32, layout: InputLayout) -> ModelSpec {
        ModelSpec {
            location: ArtifactLocation::Local("dummy".into()),
            labels: None,
            image_size: size,
            layout,
        }
    }

    #[tokio::test]
    async fn test_dummy_model() {
        let backend = DummyBackend::new();
        let model = backend.load(&spec(4, InputLayout::Nhwc)).await.unwrap();
        assert_eq!(model.class_names(), &["red", "green", "blue"]);

        // Pure green after normalization: R = -1, G = 1, B = -1
        let mut input = ArrayD::from_elem(IxDyn(&[1, 4, 4, 3]), -1.0f32);
        input.index_axis_mut(Axis(3), 1).fill(1.0);

        let output = model.predict(&input).unwrap();
        assert_eq!(output.shape(), &[1, 3]);
        assert!(output[[0, 1]] > 0.99);
        assert!((output.sum() - 1.0).abs() < 1e-5);
        assert_eq!(backend.load_count(), 1);
        assert_eq!(backend.prediction_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_input_is_uniform() {
        let backend = DummyBackend::new();
        let config = DemoConfig { image_size: 8, layout: InputLayout::Nchw, ..DemoConfig::default() };
        let model = backend.load(&config.model_spec()).await.unwrap();

        let output = model.predict(&ArrayD::zeros(IxDyn(&[1, 3, 8, 8]))).unwrap();
        for p in output.iter() {
            assert!((p - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_rejects_wrong_shape() {
        let model = DummyBackend::new().load(&spec(4, InputLayout::Nhwc)).await.unwrap();
        let result = model.predict(&ArrayD::zeros(IxDyn(&[1, 8, 8, 3])));
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let result = DummyBackend::failing("unreachable").load(&spec(4, InputLayout::Nhwc)).await;
        assert_eq!(result.unwrap_err().to_string(), "Failed to load model: unreachable");

        let backend = DummyBackend::failing_predictions("out of memory");
        let model = backend.load(&spec(4, InputLayout::Nhwc)).await.unwrap();
        assert!(model.predict(&ArrayD::zeros(IxDyn(&[1, 4, 4, 3]))).is_err());
    }

    #[tokio::test]
    async fn test_gated_load_waits_for_release() {
        let (backend, release) = DummyBackend::gated();
        let backend = Arc::new(backend);

        let loading = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move { backend.load(&spec(4, InputLayout::Nhwc)).await })
        };
        tokio::task::yield_now().await;
        assert!(!loading.is_finished());

        release.send(()).unwrap();
        assert!(loading.await.unwrap().is_ok());
    }
}
