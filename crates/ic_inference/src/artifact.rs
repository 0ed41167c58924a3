use ic_core::{ArtifactLocation, Error, Result};
use tracing::debug;

/// Read the raw bytes behind `location`, over HTTP or from disk.
pub async fn fetch(location: &ArtifactLocation) -> Result<Vec<u8>> {
    let bytes = match location {
        ArtifactLocation::Remote(url) => {
            debug!("🌐 Fetching {}", url);
            let response = reqwest::get(url.clone()).await?.error_for_status()?;
            response.bytes().await?.to_vec()
        }
        ArtifactLocation::Local(path) => {
            debug!("📂 Reading {}", path.display());
            tokio::fs::read(path).await?
        }
    };

    if bytes.is_empty() {
        return Err(Error::ModelLoad(format!("{} is empty", location)));
    }
    debug!("Fetched {} bytes from {}", bytes.len(), location);
    Ok(bytes)
}
