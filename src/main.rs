mod config;
mod error;
mod features;
mod model;
mod server;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Settings;
use crate::features::{FeatureExtractor, FEATURE_NAMES};
use crate::model::{Classifier, XgbModel};
use crate::server::AppState;

#[derive(Parser)]
#[command(name = "urlscan", about = "Malicious URL classifier service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the model and serve POST /predict
    Serve {
        /// Model file (overrides URLSCAN_MODEL_PATH)
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Listen address (overrides URLSCAN_BIND)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the feature vector for a URL
    Extract { url: String },
    /// Classify a single URL locally and print the response JSON
    Predict {
        url: String,
        /// Model file (overrides URLSCAN_MODEL_PATH)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load().context("Invalid URLSCAN_* settings")?;
    let extractor = FeatureExtractor::new(settings.fetch_timeout(), settings.user_agent.as_deref())
        .context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Serve { model, bind } => {
            let classifier = load_model(&model.unwrap_or(settings.model_path))?;
            let bind = bind.unwrap_or(settings.bind);
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("Invalid bind address: {}", bind))?;

            if settings.fetch_timeout_secs.is_none() {
                info!("No fetch timeout configured; slow targets hold their request open");
            }

            let app = server::router(AppState {
                extractor,
                classifier,
            });
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Listening on {}", addr);
            axum::serve(listener, app).await?;
            Ok(())
        }
        Commands::Extract { url } => {
            let features = extractor.extract(&url).await;
            println!("{}", serde_json::to_string_pretty(&features)?);
            Ok(())
        }
        Commands::Predict { url, model } => {
            let classifier = load_model(&model.unwrap_or(settings.model_path))?;
            let state = AppState {
                extractor,
                classifier,
            };
            let response = server::classify(&state, &url).await?;
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
    }
}

fn load_model(path: &Path) -> anyhow::Result<Arc<dyn Classifier>> {
    let model = XgbModel::load(path)
        .with_context(|| format!("Failed to load model from {}", path.display()))?;
    if model.num_features() != FEATURE_NAMES.len() {
        warn!(
            "Model expects {} features but extraction produces {}; every prediction will fail",
            model.num_features(),
            FEATURE_NAMES.len()
        );
    }
    Ok(Arc::new(model))
}
