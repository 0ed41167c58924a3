//! Sinks that remember what the controller told the UI.

use async_trait::async_trait;
use ic_core::Classification;
use tokio::sync::Mutex;

use crate::ui::{ResultsSink, StatusSink, UploadControl};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Status(String),
    /// Source name and ranked labels of a rendered classification.
    Results { source: String, labels: Vec<String> },
    UploadRevealed,
}

#[derive(Debug, Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<UiEvent> {
        self.events.lock().await.clone()
    }

    pub async fn statuses(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                UiEvent::Status(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn last_status(&self) -> Option<String> {
        self.statuses().await.pop()
    }

    pub async fn results(&self) -> Vec<(String, Vec<String>)> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                UiEvent::Results { source, labels } => Some((source.clone(), labels.clone())),
                _ => None,
            })
            .collect()
    }

    pub async fn upload_revealed(&self) -> bool {
        self.events.lock().await.contains(&UiEvent::UploadRevealed)
    }
}

#[async_trait]
impl StatusSink for RecordingUi {
    async fn set_status(&self, text: &str) {
        self.events.lock().await.push(UiEvent::Status(text.to_string()));
    }
}

#[async_trait]
impl ResultsSink for RecordingUi {
    async fn show(&self, classification: &Classification) {
        self.events.lock().await.push(UiEvent::Results {
            source: classification.source.clone(),
            labels: classification.predictions.iter().map(|p| p.label.clone()).collect(),
        });
    }
}

#[async_trait]
impl UploadControl for RecordingUi {
    async fn reveal(&self) {
        self.events.lock().await.push(UiEvent::UploadRevealed);
    }
}
