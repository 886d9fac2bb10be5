use anyhow::Context;
use axum::Router;
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use pdfy::config::AppConfig;
use pdfy::infrastructure::storage;
use pdfy::services::converter::Converter;
use pdfy::services::dispatcher::Dispatcher;
use pdfy::services::invoker::{ConverterInvoker, HttpInvoker, LocalInvoker};
use pdfy::services::storage::StorageService;
use pdfy::{AppState, create_app, create_worker_app, instrument};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Upload form and dispatcher, converter reached over HTTP
    Api,
    /// Converter invocation endpoint only
    Worker,
    /// Both tiers in one process
    All,
}

#[derive(Parser, Debug)]
#[command(name = "pdfy", version, about = "Convert text, images and documents to PDF")]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1")]
    host: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("🚀 Starting pdfy in {:?} mode...", args.mode);

    let config = AppConfig::from_env();
    info!(
        "⚙️  Config: Bucket={}, Max Size={}MB, Link TTL={}s",
        config.bucket,
        config.max_file_size / 1024 / 1024,
        config.download_url_ttl_secs
    );

    let storage_service: Arc<dyn StorageService> = storage::setup_storage(&config).await;
    let converter = Arc::new(Converter::new(storage_service.clone()));

    let app = match args.mode {
        Mode::Worker => create_worker_app(converter, config.max_file_size),
        Mode::Api => {
            let url = config
                .converter_url
                .as_deref()
                .context("CONVERTER_URL must be set in api mode")?;
            info!("🔀 Converter endpoint: {}/invoke", url);
            let invoker: Arc<dyn ConverterInvoker> = Arc::new(HttpInvoker::new(url));
            front_app(invoker, storage_service, &config)
        }
        Mode::All => {
            let invoker: Arc<dyn ConverterInvoker> =
                Arc::new(LocalInvoker::new(converter.clone()));
            front_app(invoker, storage_service, &config)
                .merge(create_worker_app(converter, config.max_file_size))
        }
    };

    let addr = SocketAddr::new(args.host, args.port);
    info!("✅ Server ready at http://{}", addr);
    if args.mode != Mode::Worker {
        info!("📖 Swagger UI: http://{}/swagger-ui", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, instrument(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

fn front_app(
    invoker: Arc<dyn ConverterInvoker>,
    storage: Arc<dyn StorageService>,
    config: &AppConfig,
) -> Router {
    let dispatcher = Arc::new(Dispatcher::new(
        invoker,
        storage.clone(),
        config.download_url_ttl(),
    ));

    create_app(AppState {
        dispatcher,
        storage,
        config: config.clone(),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
