use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, PageSnapshot, PageView};

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        .route("/api/preloaded", get(handlers::preloaded_image))
        .route("/api/predict", post(handlers::predict))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

pub mod prelude {
    pub use ic_core::{Classification, Error, Result};
    pub use crate::{create_app, AppState};
}
