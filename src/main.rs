use bucket_unzip::api::handlers::execute::invoke;
use bucket_unzip::config::FunctionConfig;
use bucket_unzip::infrastructure::storage;
use bucket_unzip::{AppState, create_app};
use clap::Parser;
use dotenvy::dotenv;
use std::net::{IpAddr, SocketAddr};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Extract a stored zip archive and re-upload its files", long_about = None)]
struct Args {
    /// Address to bind the invocation server to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to bind the invocation server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Run a single invocation with this JSON request and print the response
    #[arg(long, value_name = "JSON")]
    invoke: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucket_unzip=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("🚀 Starting bucket-unzip...");

    let config = FunctionConfig::from_env();
    info!(
        "🛠️  Function Config: Backend={}, Bucket={}, Concurrency={}, Max Archive={}MB",
        config.storage_backend,
        config.bucket_id.as_deref().unwrap_or("<unset>"),
        config.upload_concurrency,
        config.max_archive_size / 1024 / 1024
    );

    let storage_service = storage::setup_storage(&config).await?;
    let state = AppState::new(storage_service, config);

    if let Some(request) = args.invoke {
        return run_once(&state, &request).await;
    }

    let shutdown = state.shutdown.clone();
    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::new(args.host, args.port);
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Uploads not yet started are reported as cancelled.
            shutdown.cancel();
        })
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

/// Local single-shot invocation: prints the response envelope to stdout and
/// exits non-zero when the invocation failed.
async fn run_once(state: &AppState, request: &str) -> anyhow::Result<()> {
    let cancel = state.shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });

    let response = match invoke(state, request.as_bytes()).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Invocation failed: {}", e);
            e.to_response_body()
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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
