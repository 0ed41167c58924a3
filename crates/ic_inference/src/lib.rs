pub mod artifact;
pub mod backends;
pub mod labels;
pub mod preprocess;
pub mod tensor;
pub mod topk;

pub use backends::{create_backend, BackendKind, DummyBackend, TractBackend};
pub use tensor::{TensorLedger, TrackedTensor};

pub mod prelude {
    pub use super::backends::{create_backend, BackendKind};
    pub use super::tensor::{TensorLedger, TrackedTensor};
    pub use ic_core::{InferenceBackend, ModelHandle, ModelSpec, Result, Error};
}
