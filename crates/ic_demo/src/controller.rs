use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use ic_core::{
    Classification, DecodedImage, DemoConfig, Error, InferenceBackend, InputLayout, ModelHandle, Result,
};
use ic_inference::{preprocess, topk, TensorLedger};
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::preloaded::PreloadedImage;
use crate::readiness::{Phase, Readiness};
use crate::ui::Ui;

/// Outcome of classifying the preloaded image during [`DemoController::initialize`].
#[derive(Debug)]
pub enum PreloadedPrediction {
    /// The image was already decoded and was classified inline.
    Completed(Result<Classification>),
    /// Classification runs once the image finishes decoding.
    Deferred(JoinHandle<Result<Classification>>),
}

impl PreloadedPrediction {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub async fn wait(self) -> Result<Classification> {
        match self {
            Self::Completed(result) => result,
            Self::Deferred(handle) => handle.await.map_err(|e| Error::External(e.into()))?,
        }
    }
}

/// Owns the model for the session and gates predictions on its readiness.
pub struct DemoController {
    config: DemoConfig,
    backend: Arc<dyn InferenceBackend>,
    model: OnceCell<Arc<dyn ModelHandle>>,
    readiness: Readiness,
    started: AtomicBool,
    ledger: TensorLedger,
    ui: Ui,
}

impl DemoController {
    pub fn new(config: DemoConfig, backend: Arc<dyn InferenceBackend>, ui: Ui) -> Self {
        Self {
            config,
            backend,
            model: OnceCell::new(),
            readiness: Readiness::new(),
            started: AtomicBool::new(false),
            ledger: TensorLedger::new(),
            ui,
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.readiness.phase()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.readiness.subscribe()
    }

    pub fn ledger(&self) -> &TensorLedger {
        &self.ledger
    }

    /// Load and warm the model up, classify the preloaded image, then expose uploads.
    ///
    /// On failure the phase becomes [`Phase::Failed`], the status shows the
    /// reason and the upload control stays hidden.
    pub async fn initialize(self: &Arc<Self>, preloaded: PreloadedImage) -> Result<PreloadedPrediction> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        info!(
            "🧠 Loading model from {} (using {})",
            self.config.model,
            self.backend.name()
        );
        self.ui.status.set_status("Loading model...").await;

        let model = match self.load_and_warm_up().await {
            Ok(model) => model,
            Err(e) => {
                self.readiness.mark_failed();
                error!("💥 {}", e);
                self.ui.status.set_status(&e.to_string()).await;
                return Err(e);
            }
        };

        self.ui.status.set_status("").await;
        self.model.set(model).map_err(|_| Error::AlreadyInitialized)?;
        self.readiness.mark_ready();
        info!("✨ Model ready");

        let preloaded = if preloaded.is_complete() {
            PreloadedPrediction::Completed(self.predict_preloaded(preloaded).await)
        } else {
            debug!("Preloaded image still decoding, deferring its prediction");
            let controller = Arc::clone(self);
            PreloadedPrediction::Deferred(tokio::spawn(async move {
                controller.predict_preloaded(preloaded).await
            }))
        };

        self.ui.upload.reveal().await;
        Ok(preloaded)
    }

    /// Classify a decoded image and render the result.
    pub async fn predict(&self, image: &DecodedImage) -> Result<Classification> {
        self.predict_shared(Arc::new(image.clone())).await
    }

    /// Classify an uploaded file. Files that are not images are skipped.
    pub async fn predict_upload(&self, name: &str, bytes: &[u8]) -> Result<Option<Classification>> {
        self.readiness.ensure_ready()?;
        if !DecodedImage::is_image(bytes) {
            warn!("Skipping {}: not an image", name);
            return Ok(None);
        }

        let (name, bytes) = (name.to_string(), bytes.to_vec());
        let image = tokio::task::spawn_blocking(move || DecodedImage::from_bytes(name, &bytes))
            .await
            .map_err(|e| Error::External(e.into()))??;
        self.predict_shared(Arc::new(image)).await.map(Some)
    }

    async fn predict_shared(&self, image: Arc<DecodedImage>) -> Result<Classification> {
        let model = self.model()?;
        self.ui.status.set_status("Predicting...").await;

        let job = self.job();
        let name = image.name().to_string();
        let outcome = tokio::task::spawn_blocking(move || job.run(model.as_ref(), &image))
            .await
            .map_err(|e| Error::External(e.into()))
            .and_then(|result| result);

        match outcome {
            Ok(classification) => {
                self.ui
                    .status
                    .set_status(&format!(
                        "Done in {} ms (not including preprocessing: {} ms)",
                        classification.total_ms, classification.inference_ms
                    ))
                    .await;
                self.ui.results.show(&classification).await;
                info!(
                    "🏷️ {} -> {}",
                    classification.source,
                    classification.top().map(|p| p.label.as_str()).unwrap_or("nothing")
                );
                Ok(classification)
            }
            Err(e) => {
                warn!("Prediction on {} failed: {}", name, e);
                self.ui
                    .status
                    .set_status(&format!("Prediction failed: {}", e))
                    .await;
                Err(e)
            }
        }
    }

    fn model(&self) -> Result<Arc<dyn ModelHandle>> {
        self.readiness.ensure_ready()?;
        self.model.get().cloned().ok_or(Error::NotReady)
    }

    async fn load_and_warm_up(&self) -> Result<Arc<dyn ModelHandle>> {
        let model = self
            .backend
            .load(&self.config.model_spec())
            .await
            .map_err(Error::into_model_load)?;

        let started = Instant::now();
        let job = self.job();
        let warm = Arc::clone(&model);
        tokio::task::spawn_blocking(move || job.warm_up(warm.as_ref()))
            .await
            .map_err(|e| Error::External(e.into()))
            .and_then(|result| result)
            .map_err(|e| Error::ModelLoad(format!("warmup failed: {}", e)))?;
        debug!("🔥 Warmup took {} ms", started.elapsed().as_millis());
        Ok(model)
    }

    fn job(&self) -> ClassifyJob {
        ClassifyJob {
            ledger: self.ledger.clone(),
            image_size: self.config.image_size,
            layout: self.config.layout,
            top_k: self.config.top_k,
        }
    }

    async fn predict_preloaded(&self, preloaded: PreloadedImage) -> Result<Classification> {
        match preloaded.wait_decoded().await {
            Ok(image) => self.predict_shared(image).await,
            Err(e) => {
                warn!("Preloaded image could not be decoded: {}", e);
                self.ui
                    .status
                    .set_status(&format!("Prediction failed: {}", e))
                    .await;
                Err(e)
            }
        }
    }
}

/// Preprocessing, forward pass and ranking for one image, run off the async workers.
struct ClassifyJob {
    ledger: TensorLedger,
    image_size: u32,
    layout: InputLayout,
    top_k: usize,
}

impl ClassifyJob {
    /// Push a zeros tensor through the model and throw the output away.
    fn warm_up(&self, model: &dyn ModelHandle) -> Result<()> {
        let zeros = self.ledger.track(preprocess::zeros(self.image_size, self.layout));
        let _discarded = self.ledger.track(model.predict(&zeros)?);
        Ok(())
    }

    fn run(&self, model: &dyn ModelHandle, image: &DecodedImage) -> Result<Classification> {
        let started = Instant::now();
        let input = self
            .ledger
            .track(preprocess::image_to_tensor(image, self.image_size, self.layout)?);

        let inference_started = Instant::now();
        let output = self.ledger.track(model.predict(&input)?);
        let predictions = topk::top_k(&output, model.class_names(), self.top_k)?;

        Ok(Classification {
            source: image.name().to_string(),
            predictions,
            total_ms: started.elapsed().as_millis() as u64,
            inference_ms: inference_started.elapsed().as_millis() as u64,
            classified_at: Utc::now(),
        })
    }
}
