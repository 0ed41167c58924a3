use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ic_core::{Classification, DemoConfig, InferenceBackend};
use ic_demo::{DemoController, Phase, PreloadedImage, ResultsSink, StatusSink, Ui, UploadControl};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const MAX_RESULTS: usize = 20;

/// What the browser page currently shows.
#[derive(Debug, Default)]
pub struct PageView {
    status: RwLock<String>,
    results: RwLock<VecDeque<Classification>>,
    upload_visible: AtomicBool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub phase: Phase,
    pub status: String,
    pub upload_visible: bool,
    /// Newest first.
    pub results: Vec<Classification>,
}

impl PageView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self, phase: Phase) -> PageSnapshot {
        PageSnapshot {
            phase,
            status: self.status.read().await.clone(),
            upload_visible: self.upload_visible.load(Ordering::SeqCst),
            results: self.results.read().await.iter().cloned().collect(),
        }
    }
}

#[async_trait]
impl StatusSink for PageView {
    async fn set_status(&self, text: &str) {
        *self.status.write().await = text.to_string();
    }
}

#[async_trait]
impl ResultsSink for PageView {
    async fn show(&self, classification: &Classification) {
        let mut results = self.results.write().await;
        results.push_front(classification.clone());
        results.truncate(MAX_RESULTS);
    }
}

#[async_trait]
impl UploadControl for PageView {
    async fn reveal(&self) {
        self.upload_visible.store(true, Ordering::SeqCst);
    }
}

pub struct AppState {
    pub controller: Arc<DemoController>,
    pub page: Arc<PageView>,
    pub preloaded: PathBuf,
}

impl AppState {
    pub fn new(config: DemoConfig, backend: Arc<dyn InferenceBackend>, preloaded: impl Into<PathBuf>) -> Self {
        let page = Arc::new(PageView::new());
        let controller = DemoController::new(config, backend, Ui::from_shared(page.clone()));
        Self {
            controller: Arc::new(controller),
            page,
            preloaded: preloaded.into(),
        }
    }

    /// Start the controller while the page is already being served.
    pub fn initialize_in_background(&self) -> JoinHandle<()> {
        let controller = Arc::clone(&self.controller);
        let preloaded = PreloadedImage::load(self.preloaded.clone());
        tokio::spawn(async move {
            match controller.initialize(preloaded).await {
                Ok(outcome) => match outcome.wait().await {
                    Ok(classification) => info!("🐱 Preloaded image classified as {:?}", classification.top()),
                    Err(e) => warn!("Preloaded image was not classified: {}", e),
                },
                Err(e) => error!("💥 Demo failed to start: {}", e),
            }
        })
    }

    pub async fn snapshot(&self) -> PageSnapshot {
        self.page.snapshot(self.controller.phase()).await
    }
}
