use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse},
    Json,
};
use ic_core::{Classification, Error};

use crate::error::ApiError;
use crate::state::{AppState, PageSnapshot};

const INDEX_HTML: &str = include_str!("../static/index.html");
pub const FILE_NAME_HEADER: &str = "x-file-name";

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<PageSnapshot> {
    Json(state.snapshot().await)
}

pub async fn preloaded_image(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let bytes = tokio::fs::read(&state.preloaded).await?;
    Ok(([(header::CONTENT_TYPE, content_type(&state.preloaded))], bytes))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Classification>, ApiError> {
    let name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("upload");

    match state.controller.predict_upload(name, &body).await? {
        Some(classification) => Ok(Json(classification)),
        None => Err(Error::UnsupportedImage(format!("{} is not an image", name)).into()),
    }
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
