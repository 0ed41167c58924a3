use std::fmt;
use std::sync::Arc;

use ic_core::InferenceBackend;

pub mod dummy;
pub mod tract;

pub use dummy::DummyBackend;
pub use tract::TractBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendKind {
    /// ONNX artifacts through tract
    #[default]
    Tract,
    /// Built-in three-colour classifier, no artifact needed
    Dummy,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tract => write!(f, "tract"),
            Self::Dummy => write!(f, "dummy"),
        }
    }
}

pub fn create_backend(kind: BackendKind) -> Arc<dyn InferenceBackend> {
    match kind {
        BackendKind::Tract => Arc::new(TractBackend::new()),
        BackendKind::Dummy => Arc::new(DummyBackend::new()),
    }
}
