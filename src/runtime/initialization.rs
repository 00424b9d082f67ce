//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client setup and wiring of the reconciler's collaborators.

use crate::config::ControllerConfig;
use crate::constants;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::host::ModelIdentity;
use crate::image::ResourceFileImageResolver;
use crate::kubernetes::{
    ConfigMapConfigProvider, ConfigMapRelationBus, ConfigMapStatusSink, DeploymentSpecSink,
    LeaseLeadership, SecretStateStore,
};
use crate::observability;
use crate::relation::VersionNegotiator;
use crate::runtime::EventDispatcher;
use crate::state::{SecretStore, StateStore};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Runtime settings
    pub config: ControllerConfig,
    /// Routes events to the reconciler
    pub dispatcher: EventDispatcher,
    /// Persisted controller state, shared with the reconciler's secret store
    pub state: Arc<dyn StateStore>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

/// Install the ring crypto provider for rustls
///
/// Must run before any TLS connection is made.
pub fn install_crypto_provider() -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }
    Ok(())
}

/// Set up the tracing subscriber, honouring `RUST_LOG`
pub fn init_tracing() {
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minio_operator=info".into()),
        )
        .try_init()
    {
        eprintln!("Tracing subscriber already initialized: {e}");
    }
}

/// Wire the Kubernetes-backed collaborators into a reconciler
pub fn build_reconciler(
    client: Client,
    config: &ControllerConfig,
    state: Arc<dyn StateStore>,
) -> Reconciler {
    let bus = Arc::new(ConfigMapRelationBus::new(client.clone(), config));

    Reconciler {
        model: ModelIdentity {
            model_name: config.namespace.clone(),
            app_name: config.app_name.clone(),
        },
        leadership: Arc::new(LeaseLeadership::new(client.clone(), config)),
        negotiator: Arc::new(VersionNegotiator::new(bus)),
        image_resolver: Arc::new(ResourceFileImageResolver::new(
            config.image_resource_path.clone(),
        )),
        config_provider: Arc::new(ConfigMapConfigProvider::new(client.clone(), config)),
        secret_store: SecretStore::new(state),
        workload: Arc::new(DeploymentSpecSink::new(client.clone(), config)),
        status_sink: Arc::new(ConfigMapStatusSink::new(client, config)),
    }
}

/// Initialize the controller runtime
///
/// Installs the crypto provider, sets up tracing and metrics, starts the HTTP
/// server, connects to the cluster and builds the event dispatcher.
pub async fn initialize() -> Result<InitializationResult> {
    install_crypto_provider()?;
    init_tracing();

    let config = ControllerConfig::from_env();
    info!(
        namespace = %config.namespace,
        app = %config.app_name,
        pod = %config.pod_name,
        "Starting MinIO operator v{}",
        env!("CARGO_PKG_VERSION")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });
    let server_state_clone = server_state.clone();
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let state: Arc<dyn StateStore> = Arc::new(SecretStateStore::new(client.clone(), &config));
    let reconciler = build_reconciler(client.clone(), &config, state.clone());
    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        config,
        dispatcher: EventDispatcher::new(reconciler),
        state,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout =
        std::time::Duration::from_secs(constants::DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval =
        std::time::Duration::from_millis(constants::DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
