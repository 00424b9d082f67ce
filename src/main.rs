//! # MinIO Operator binary
//!
//! ```bash
//! # Run the controller (default)
//! minio-operator run
//!
//! # Print the pod spec for a config and image resource without a cluster
//! minio-operator render --config config.yaml --image oci-image.yaml --secret ABC...
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minio_operator::config::OperatorConfig;
use minio_operator::controller::reconciler::build_pod_spec;
use minio_operator::image::{ImageResolver, ResourceFileImageResolver};
use minio_operator::runtime::{initialize, run_watch_loop};
use minio_operator::state::generate_secret_key;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minio-operator")]
#[command(
    about = "Kubernetes operator for a single MinIO object-storage server",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the controller
    Run,
    /// Print the pod spec built from a configuration and an image resource
    Render {
        /// Operator configuration (YAML with access-key, secret-key, port)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// OCI image resource (YAML with registrypath, username, password)
        #[arg(short, long)]
        image: PathBuf,
        /// Generated secret key; a fresh one is drawn when omitted
        #[arg(short, long)]
        secret: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let init_result = initialize().await?;
            run_watch_loop(init_result).await
        }
        Commands::Render {
            config,
            image,
            secret,
        } => render(config, image, secret).await,
    }
}

async fn render(config: Option<PathBuf>, image: PathBuf, secret: Option<String>) -> Result<()> {
    let config = match config {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            OperatorConfig::from_yaml(&raw)?
        }
        None => OperatorConfig::default(),
    };

    let resolver = ResourceFileImageResolver::new(image);
    let image_details = resolver
        .fetch()
        .await
        .with_context(|| {
            format!(
                "Failed to resolve {} from {}",
                resolver.resource_name(),
                resolver.path().display()
            )
        })?;

    let secret = secret.unwrap_or_else(generate_secret_key);
    let spec = build_pod_spec(&config, &secret, &image_details)?;
    print!("{}", serde_yaml::to_string(&spec)?);
    Ok(())
}
