//! Logging labeler - Crossplane composition function server

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tokio::net::UnixListener;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::transport::Server;
use tracing::{info, warn};

use logging_labeler::namespace::{KubeNamespaceClient, NamespaceResolution};
use logging_labeler::scheme;
use logging_labeler::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use logging_labeler::{LoggingLabeler, DEFAULT_ADDRESS};

/// Kind of socket the gRPC server listens on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum Network {
    /// TCP, `--address` is `host:port`
    #[default]
    Tcp,
    /// Unix domain socket, `--address` is a filesystem path
    Unix,
}

/// A Crossplane composition function that derives a Logging from namespace labels
#[derive(Parser, Debug)]
#[command(name = "logging-labeler", version, about, long_about = None)]
struct Cli {
    /// Emit debug logs in addition to info logs
    #[arg(short, long, env = "LOGGING_LABELER_DEBUG")]
    debug: bool,

    /// Log output format
    #[arg(long, value_enum, env = "LOGGING_LABELER_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Running outside of a Kubernetes cluster
    ///
    /// Reads credentials from the local kubeconfig (`KUBECONFIG` or
    /// `~/.kube/config`) instead of the pod's service account.
    #[arg(long, env = "LOGGING_LABELER_OUT_OF_CLUSTER")]
    out_of_cluster: bool,

    /// Network on which to listen for gRPC connections
    #[arg(long, value_enum, env = "LOGGING_LABELER_NETWORK", default_value_t = Network::Tcp)]
    network: Network,

    /// Address at which to listen for gRPC connections
    #[arg(long, env = "LOGGING_LABELER_ADDRESS", default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Where the target namespace is read from on the composite resource
    #[arg(
        long,
        value_enum,
        env = "LOGGING_LABELER_NAMESPACE_SOURCE",
        default_value_t = NamespaceResolution::ClaimRef
    )]
    namespace_source: NamespaceResolution,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(&TelemetryConfig {
        debug: cli.debug,
        format: cli.log_format,
    })?;

    // Register emitted kinds before the first request can arrive
    let registration = scheme::init();
    if !registration.succeeded() {
        warn!("continuing with incomplete scheme registration");
    }

    let client = kube_client(cli.out_of_cluster).await?;
    let function = LoggingLabeler::new(
        Arc::new(KubeNamespaceClient::new(client)),
        cli.namespace_source,
    );

    info!(
        network = ?cli.network,
        address = %cli.address,
        namespace_source = %cli.namespace_source,
        "Starting composition function gRPC server"
    );

    let router = Server::builder().add_service(function.into_service());
    let served = match cli.network {
        Network::Tcp => {
            let addr: SocketAddr = cli
                .address
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid TCP address {}: {}", cli.address, e))?;
            router.serve_with_shutdown(addr, shutdown_signal()).await
        }
        Network::Unix => {
            remove_stale_socket(Path::new(&cli.address))?;
            let listener = UnixListener::bind(&cli.address)
                .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", cli.address, e))?;
            router
                .serve_with_incoming_shutdown(UnixListenerStream::new(listener), shutdown_signal())
                .await
        }
    };
    served.map_err(|e| anyhow::anyhow!("gRPC server failed: {}", e))?;

    info!("gRPC server stopped");
    Ok(())
}

/// Build a Kubernetes client from the pod environment or the local kubeconfig
async fn kube_client(out_of_cluster: bool) -> anyhow::Result<Client> {
    let config = if out_of_cluster {
        Config::from_kubeconfig(&KubeConfigOptions::default())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load kubeconfig: {}", e))?
    } else {
        Config::incluster().map_err(|e| anyhow::anyhow!("Failed to load in-cluster config: {}", e))?
    };

    Client::try_from(config).map_err(|e| anyhow::anyhow!("Failed to create kube client: {}", e))
}

/// Remove a socket file left behind by a previous run
fn remove_stale_socket(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
