use std::sync::Arc;

use async_trait::async_trait;
use ic_core::Classification;

use crate::logging::Logger;

#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_status(&self, text: &str);
}

#[async_trait]
pub trait ResultsSink: Send + Sync {
    async fn show(&self, classification: &Classification);
}

/// The file picker; hidden until the model is ready.
#[async_trait]
pub trait UploadControl: Send + Sync {
    async fn reveal(&self);
}

/// The three collaborators a controller talks to.
#[derive(Clone)]
pub struct Ui {
    pub status: Arc<dyn StatusSink>,
    pub results: Arc<dyn ResultsSink>,
    pub upload: Arc<dyn UploadControl>,
}

impl Ui {
    /// Use one object for every sink.
    pub fn from_shared<T>(sink: Arc<T>) -> Self
    where
        T: StatusSink + ResultsSink + UploadControl + 'static,
    {
        Self {
            status: sink.clone(),
            results: sink.clone(),
            upload: sink,
        }
    }
}

/// Terminal rendering: status through tracing, results on stdout.
#[derive(Debug, Clone)]
pub struct ConsoleUi {
    logger: Logger,
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self {
            logger: Logger::new().with_prefix("📟"),
        }
    }

    pub fn render(classification: &Classification) -> String {
        let mut out = format!(
            "{} ({} ms)\n",
            classification.source, classification.total_ms
        );
        for prediction in &classification.predictions {
            out.push_str(&format!("  {:>6.2}%  {}\n", prediction.confidence * 100.0, prediction.label));
        }
        out
    }
}

#[async_trait]
impl StatusSink for ConsoleUi {
    async fn set_status(&self, text: &str) {
        if !text.is_empty() {
            self.logger.info(text);
        }
    }
}

#[async_trait]
impl ResultsSink for ConsoleUi {
    async fn show(&self, classification: &Classification) {
        print!("{}", Self::render(classification));
    }
}

#[async_trait]
impl UploadControl for ConsoleUi {
    async fn reveal(&self) {
        self.logger.debug("Ready for files");
    }
}
