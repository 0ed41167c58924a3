pub mod controller;
pub mod logging;
pub mod preloaded;
pub mod readiness;
pub mod test_utils;
pub mod ui;

pub use controller::{DemoController, PreloadedPrediction};
pub use logging::{init_logging, Logger};
pub use preloaded::{DecodeNotifier, PreloadedImage};
pub use readiness::Phase;
pub use ui::{ConsoleUi, ResultsSink, StatusSink, Ui, UploadControl};

pub mod prelude {
    pub use super::controller::{DemoController, PreloadedPrediction};
    pub use super::preloaded::PreloadedImage;
    pub use super::readiness::Phase;
    pub use super::ui::Ui;
    pub use ic_core::{Classification, DecodedImage, DemoConfig, Error, Result};
}
