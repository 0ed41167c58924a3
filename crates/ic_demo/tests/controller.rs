use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ic_core::{DecodedImage, DemoConfig, Error};
use ic_demo::test_utils::{RecordingUi, UiEvent};
use ic_demo::{DemoController, Phase, PreloadedImage, Ui};
use ic_inference::DummyBackend;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

fn config() -> DemoConfig {
    DemoConfig {
        image_size: 16,
        labels: None,
        ..DemoConfig::default()
    }
}

fn solid(name: &str, rgb: [u8; 3]) -> DecodedImage {
    DecodedImage::from_rgb(name, RgbImage::from_pixel(24, 20, Rgb(rgb))).unwrap()
}

fn png(rgb: [u8; 3]) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb(rgb)))
        .write_to(&mut bytes, ImageOutputFormat::Png)
        .unwrap();
    bytes.into_inner()
}

fn setup(backend: Arc<DummyBackend>) -> (Arc<DemoController>, Arc<RecordingUi>) {
    let ui = Arc::new(RecordingUi::new());
    let controller = DemoController::new(config(), backend, Ui::from_shared(ui.clone()));
    (Arc::new(controller), ui)
}

#[tokio::test]
async fn test_ready_only_after_load_resolves() {
    let (backend, release) = DummyBackend::gated();
    let (controller, ui) = setup(Arc::new(backend));
    let mut phases = controller.subscribe();

    let init = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .initialize(PreloadedImage::decoded(solid("cat.jpg", [200, 40, 40])))
                .await
        })
    };
    tokio::task::yield_now().await;

    assert_eq!(controller.phase(), Phase::Loading);
    assert!(!init.is_finished());
    assert!(!ui.upload_revealed().await);
    assert_eq!(ui.statuses().await, vec!["Loading model..."]);

    release.send(()).unwrap();
    let preloaded = init.await.unwrap().unwrap();
    assert!(!preloaded.is_deferred());
    assert_eq!(controller.phase(), Phase::Ready);

    phases.changed().await.unwrap();
    assert_eq!(*phases.borrow_and_update(), Phase::Ready);
    assert!(!phases.has_changed().unwrap());

    // A second startup is rejected and leaves the session as it was.
    let again = controller.initialize(PreloadedImage::decoded(solid("cat.jpg", [0, 0, 0]))).await;
    assert!(matches!(again, Err(Error::AlreadyInitialized)));
    assert_eq!(controller.phase(), Phase::Ready);
    assert!(!phases.has_changed().unwrap());
}

#[tokio::test]
async fn test_predict_before_ready_is_rejected() {
    let (backend, release) = DummyBackend::gated();
    let backend = Arc::new(backend);
    let (controller, ui) = setup(backend.clone());

    let result = controller.predict(&solid("early.png", [1, 2, 3])).await;
    assert!(matches!(result, Err(Error::NotReady)));
    let upload = controller.predict_upload("early.png", &png([1, 2, 3])).await;
    assert!(matches!(upload, Err(Error::NotReady)));

    assert!(ui.events().await.is_empty());
    assert_eq!(backend.prediction_count(), 0);
    assert_eq!(controller.ledger().allocated(), 0);
    drop(release);
}

#[tokio::test]
async fn test_load_failure_keeps_upload_hidden() {
    let backend = Arc::new(DummyBackend::failing("artifact unreachable"));
    let (controller, ui) = setup(backend);

    let (preloaded, _notifier) = PreloadedImage::pending();
    let result = controller.initialize(preloaded).await;

    assert!(matches!(result, Err(Error::ModelLoad(_))));
    assert_eq!(controller.phase(), Phase::Failed);
    assert_eq!(
        ui.last_status().await.as_deref(),
        Some("Failed to load model: artifact unreachable")
    );
    assert!(!ui.upload_revealed().await);
    assert!(matches!(
        controller.predict(&solid("late.png", [0, 0, 0])).await,
        Err(Error::NotReady)
    ));
}

#[tokio::test]
async fn test_warmup_failure_is_load_failure() {
    let backend = Arc::new(DummyBackend::failing_predictions("kernel missing"));
    let (controller, ui) = setup(backend.clone());

    let result = controller.initialize(PreloadedImage::decoded(solid("cat.jpg", [0, 0, 0]))).await;
    match result {
        Err(Error::ModelLoad(reason)) => assert!(reason.contains("warmup failed")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(controller.phase(), Phase::Failed);
    assert!(!ui.upload_revealed().await);
    assert_eq!(controller.ledger().live(), 0);
}

#[tokio::test]
async fn test_warmup_result_is_not_rendered() {
    let backend = Arc::new(DummyBackend::new());
    let (controller, ui) = setup(backend.clone());

    let (preloaded, _notifier) = PreloadedImage::pending();
    controller.initialize(preloaded).await.unwrap();

    assert_eq!(backend.load_count(), 1);
    assert_eq!(backend.prediction_count(), 1);
    assert!(ui.results().await.is_empty());
    assert_eq!(ui.statuses().await, vec!["Loading model...", ""]);
    assert!(ui.upload_revealed().await);
    assert_eq!(controller.ledger().allocated(), 2);
    assert_eq!(controller.ledger().live(), 0);
}

#[tokio::test]
async fn test_golden_prediction() {
    let (controller, ui) = setup(Arc::new(DummyBackend::new()));
    let (preloaded, _notifier) = PreloadedImage::pending();
    controller.initialize(preloaded).await.unwrap();

    let red = solid("red.png", [255, 0, 0]);
    let first = controller.predict(&red).await.unwrap();
    let second = controller.predict(&red).await.unwrap();

    assert_eq!(first.labels(), vec!["red", "green", "blue"]);
    assert_eq!(first.labels(), second.labels());
    assert!(first.top().unwrap().confidence > 0.99);
    assert_eq!(first.source, "red.png");

    let status = ui.last_status().await.unwrap();
    assert!(status.starts_with("Done in "));
    assert!(status.contains("not including preprocessing"));
    assert_eq!(ui.results().await.len(), 2);
}

#[tokio::test]
async fn test_predictions_release_tensors() {
    let (controller, _ui) = setup(Arc::new(DummyBackend::new()));
    let (preloaded, _notifier) = PreloadedImage::pending();
    controller.initialize(preloaded).await.unwrap();

    let ledger = controller.ledger();
    let live_before = ledger.live();
    let allocated_before = ledger.allocated();

    controller.predict(&solid("a.png", [0, 255, 0])).await.unwrap();
    controller.predict(&solid("b.png", [0, 0, 255])).await.unwrap();

    assert_eq!(ledger.live(), live_before);
    assert_eq!(ledger.allocated(), allocated_before + 4);
    assert!(ledger.peak() >= 2);
}

#[tokio::test]
async fn test_failed_prediction_releases_tensors() {
    let backend = Arc::new(DummyBackend::failing_predictions_after(1, "device lost"));
    let (controller, ui) = setup(backend);
    let (preloaded, _notifier) = PreloadedImage::pending();
    controller.initialize(preloaded).await.unwrap();

    let result = controller.predict(&solid("a.png", [9, 9, 9])).await;
    assert!(matches!(result, Err(Error::Inference(_))));
    assert_eq!(controller.ledger().live(), 0);
    assert_eq!(
        ui.last_status().await.as_deref(),
        Some("Prediction failed: Inference error: device lost")
    );
    assert!(ui.results().await.is_empty());
}

#[tokio::test]
async fn test_decoded_preloaded_image_predicts_inline() {
    let (controller, ui) = setup(Arc::new(DummyBackend::new()));

    let preloaded = controller
        .initialize(PreloadedImage::decoded(solid("cat.jpg", [0, 0, 255])))
        .await
        .unwrap();
    assert!(!preloaded.is_deferred());

    // Rendered before the upload control appears.
    let events = ui.events().await;
    let results_at = events
        .iter()
        .position(|e| matches!(e, UiEvent::Results { .. }))
        .unwrap();
    let revealed_at = events.iter().position(|e| *e == UiEvent::UploadRevealed).unwrap();
    assert!(results_at < revealed_at);

    let classification = preloaded.wait().await.unwrap();
    assert_eq!(classification.top().unwrap().label, "blue");
}

#[tokio::test]
async fn test_pending_preloaded_image_waits_for_decode() {
    let backend = Arc::new(DummyBackend::new());
    let (controller, ui) = setup(backend.clone());

    let (preloaded, notifier) = PreloadedImage::pending();
    let outcome = controller.initialize(preloaded).await.unwrap();
    assert!(outcome.is_deferred());
    assert!(ui.upload_revealed().await);

    tokio::task::yield_now().await;
    assert!(ui.results().await.is_empty());
    assert_eq!(backend.prediction_count(), 1);

    notifier.decoded(solid("cat.jpg", [0, 255, 0]));
    let classification = outcome.wait().await.unwrap();
    assert_eq!(classification.top().unwrap().label, "green");
    assert_eq!(
        ui.results().await,
        vec![("cat.jpg".to_string(), vec!["green".to_string(), "red".to_string(), "blue".to_string()])]
    );
}

#[tokio::test]
async fn test_pending_preloaded_image_decode_failure() {
    let (controller, ui) = setup(Arc::new(DummyBackend::new()));

    let (preloaded, notifier) = PreloadedImage::pending();
    let outcome = controller.initialize(preloaded).await.unwrap();
    notifier.failed("corrupt jpeg");

    assert!(matches!(outcome.wait().await, Err(Error::InvalidImage(_))));
    assert!(ui.results().await.is_empty());
    assert!(controller.is_ready());
    let status = ui.last_status().await.unwrap_or_default();
    assert!(status.starts_with("Prediction failed: "), "{}", status);
}

#[tokio::test]
async fn test_uploads() {
    let (controller, ui) = setup(Arc::new(DummyBackend::new()));
    let (preloaded, _notifier) = PreloadedImage::pending();
    controller.initialize(preloaded).await.unwrap();

    let skipped = controller.predict_upload("notes.txt", b"not an image").await.unwrap();
    assert!(skipped.is_none());

    let uploaded = controller
        .predict_upload("upload.png", &png([255, 0, 0]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(uploaded.labels(), vec!["red", "green", "blue"]);
    assert_eq!(ui.results().await.len(), 1);
}

#[tokio::test]
async fn test_upload_decodes_off_the_runtime() {
    let (controller, _ui) = setup(Arc::new(DummyBackend::new()));
    let (preloaded, _notifier) = PreloadedImage::pending();
    controller.initialize(preloaded).await.unwrap();

    let noisy = RgbImage::from_fn(1500, 1500, |x, y| Rgb([(x * 7) as u8, (y * 13) as u8, (x ^ y) as u8]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(noisy)
        .write_to(&mut bytes, ImageOutputFormat::Png)
        .unwrap();
    let bytes = bytes.into_inner();

    let ran = Arc::new(AtomicBool::new(false));
    let neighbour = {
        let ran = ran.clone();
        tokio::spawn(async move { ran.store(true, Ordering::SeqCst) })
    };

    let classified = controller.predict_upload("big.png", &bytes).await.unwrap();
    assert!(classified.is_some());
    assert!(ran.load(Ordering::SeqCst), "runtime was blocked during the upload");
    neighbour.await.unwrap();
}
