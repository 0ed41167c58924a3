use std::path::PathBuf;
use std::sync::Arc;

use ic_core::{DecodedImage, Error, Result};
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Decoded(Arc<DecodedImage>),
    Failed(String),
}

/// An image that may still be decoding when the controller wants it.
#[derive(Debug, Clone)]
pub struct PreloadedImage {
    rx: watch::Receiver<Slot>,
}

/// Completes a pending [`PreloadedImage`].
#[derive(Debug)]
pub struct DecodeNotifier {
    tx: watch::Sender<Slot>,
}

impl PreloadedImage {
    pub fn decoded(image: DecodedImage) -> Self {
        let (_tx, rx) = watch::channel(Slot::Decoded(Arc::new(image)));
        Self { rx }
    }

    pub fn pending() -> (Self, DecodeNotifier) {
        let (tx, rx) = watch::channel(Slot::Pending);
        (Self { rx }, DecodeNotifier { tx })
    }

    /// Start reading and decoding `path` in the background.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (image, notifier) = Self::pending();
        tokio::spawn(async move {
            match DecodedImage::open(&path).await {
                Ok(decoded) => {
                    debug!("🖼️ Decoded {} ({}x{})", decoded.name(), decoded.width(), decoded.height());
                    notifier.decoded(decoded);
                }
                Err(e) => {
                    warn!("Could not decode {}: {}", path.display(), e);
                    notifier.failed(e.to_string());
                }
            }
        });
        image
    }

    /// Decoded with pixels available right now.
    pub fn is_complete(&self) -> bool {
        matches!(&*self.rx.borrow(), Slot::Decoded(_))
    }

    /// Resolve once decoding has finished.
    pub async fn wait_decoded(mut self) -> Result<Arc<DecodedImage>> {
        let slot = {
            let slot = self
                .rx
                .wait_for(|slot| !matches!(slot, Slot::Pending))
                .await
                .map_err(|_| Error::InvalidImage("image source went away before decoding".to_string()))?;
            slot.clone()
        };

        match slot {
            Slot::Decoded(image) => Ok(image),
            Slot::Failed(reason) => Err(Error::InvalidImage(reason)),
            Slot::Pending => unreachable!("wait_for skips pending"),
        }
    }
}

impl DecodeNotifier {
    pub fn decoded(self, image: DecodedImage) {
        self.tx.send_replace(Slot::Decoded(Arc::new(image)));
    }

    pub fn failed(self, reason: impl Into<String>) {
        self.tx.send_replace(Slot::Failed(reason.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn swatch() -> DecodedImage {
        DecodedImage::from_rgb("swatch", RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))).unwrap()
    }

    #[tokio::test]
    async fn test_already_decoded() {
        let image = PreloadedImage::decoded(swatch());
        assert!(image.is_complete());
        assert_eq!(image.wait_decoded().await.unwrap().name(), "swatch");
    }

    #[tokio::test]
    async fn test_pending_until_notified() {
        let (image, notifier) = PreloadedImage::pending();
        assert!(!image.is_complete());

        let waiter = tokio::spawn(image.clone().wait_decoded());
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        notifier.decoded(swatch());
        assert!(waiter.await.unwrap().is_ok());
        assert!(image.is_complete());
    }

    #[tokio::test]
    async fn test_failed_and_abandoned_decodes() {
        let (image, notifier) = PreloadedImage::pending();
        notifier.failed("corrupt jpeg");
        assert!(!image.is_complete());
        assert!(matches!(image.wait_decoded().await, Err(Error::InvalidImage(msg)) if msg == "corrupt jpeg"));

        let (image, notifier) = PreloadedImage::pending();
        drop(notifier);
        assert!(matches!(image.wait_decoded().await, Err(Error::InvalidImage(_))));
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let image = PreloadedImage::load("/definitely/not/here/cat.jpg");
        assert!(image.wait_decoded().await.is_err());
    }
}
