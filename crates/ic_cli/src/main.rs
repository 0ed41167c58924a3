use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ic_core::config::{IMAGE_SIZE, LABELS_PATH, MODEL_PATH, PRELOADED_IMAGE, TOPK_PREDICTIONS};
use ic_core::{ArtifactLocation, DemoConfig, InferenceBackend, InputLayout};
use ic_demo::{init_logging, ConsoleUi, DemoController, PreloadedImage, Ui};
use ic_inference::{create_backend, BackendKind};
use ic_web::AppState;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify images with a pretrained model", long_about = None)]
pub struct Cli {
    /// Model artifact: a path, a file:// URL or an http(s):// URL
    #[arg(long, default_value = MODEL_PATH)]
    model: ArtifactLocation,
    /// Class names, one per line or as JSON
    #[arg(long, default_value = LABELS_PATH)]
    labels: ArtifactLocation,
    /// Ignore the labels file and name classes by index
    #[arg(long)]
    no_labels: bool,
    #[arg(long, default_value_t = IMAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    image_size: u32,
    #[arg(long, default_value_t = TOPK_PREDICTIONS)]
    top_k: usize,
    #[arg(long, value_enum, default_value_t = InputLayout::Nhwc)]
    layout: InputLayout,
    #[arg(long, value_enum, default_value_t = BackendKind::Tract, help = "Inference backend. Available: tract (default), dummy")]
    backend: BackendKind,
    /// Image classified as soon as the model is ready
    #[arg(long, default_value = PRELOADED_IMAGE)]
    preloaded: PathBuf,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the demo page
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
    /// Classify image files from the terminal
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    fn demo_config(&self) -> DemoConfig {
        DemoConfig {
            model: self.model.clone(),
            labels: (!self.no_labels).then(|| self.labels.clone()),
            image_size: self.image_size,
            top_k: self.top_k,
            layout: self.layout,
        }
    }
}

async fn serve(
    config: DemoConfig,
    backend: Arc<dyn InferenceBackend>,
    preloaded: PathBuf,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config, backend, preloaded));
    state.initialize_in_background();

    let app = ic_web::create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌍 Serving on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn classify(
    config: DemoConfig,
    backend: Arc<dyn InferenceBackend>,
    preloaded: PathBuf,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let ui = Ui::from_shared(Arc::new(ConsoleUi::new()));
    let controller = Arc::new(DemoController::new(config, backend, ui));

    let outcome = controller.initialize(PreloadedImage::load(preloaded)).await?;
    if let Err(e) = outcome.wait().await {
        warn!("Preloaded image was not classified: {}", e);
    }

    let mut failures = 0;
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("⚠️ Cannot read {}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };
        if let Err(e) = controller.predict_upload(&name, &bytes).await {
            warn!("⚠️ {}: {}", name, e);
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{} file(s) could not be classified", failures);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { Level::DEBUG } else { Level::INFO });

    let config = cli.demo_config();
    let backend = create_backend(cli.backend);
    info!("🧠 Inference backend: {}", backend.name());

    match cli.command {
        Commands::Serve { addr } => serve(config, backend, cli.preloaded, addr).await,
        Commands::Classify { files } => classify(config, backend, cli.preloaded, files).await,
    }
}
