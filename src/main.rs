mod chunker;
mod config;
mod embeddings;
mod errors;
mod fetch;
mod llm;
mod metrics;
mod pdf;
mod routes;
mod services;
mod store;

use crate::services::AppState;
use crate::store::VectorStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    dotenvy::dotenv().ok();
    let config = config::AppConfig::load()?;

    // 2. Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.rust_log)),
        )
        .init();

    tracing::info!("Starting docket v{}", env!("CARGO_PKG_VERSION"));

    // 3. Setup metrics
    let metrics_handle = metrics::setup_recorder()?;
    metrics::register_metrics();

    // 4. Initialize the model clients; the literal api_key "mock" selects
    //    in-process stand-ins
    let embedder = embeddings::create_embedder(&config.openai)?;
    let model = llm::create_answer_model(&config.openai)?;

    // 5. Connect to the vector store
    let store = store::PgVectorStore::connect(
        &config.database,
        &config.openai.provider,
        embedder.dimension(),
    )
    .await?;
    store.ensure_schema().await?;
    let store: Arc<dyn VectorStore> = Arc::new(store);
    tracing::info!("Connected to the vector store");

    // 6. Assemble the answer pipeline
    let fetcher = fetch::DocumentFetcher::new(&config.document)?;
    let chunker = chunker::Chunker::new(config.document.chunk_size, config.document.chunk_overlap)?;
    let service = services::answer::AnswerService::new(
        fetcher,
        chunker,
        embedder,
        model,
        store.clone(),
        &config.document,
    );
    let state = AppState::new(service, store);

    // 7. Setup Router
    let app = routes::create_router(state, metrics_handle, &config.server);

    // 8. Start Server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, starting shutdown..."),
    }
}
