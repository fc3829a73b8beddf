use anyhow::Result;
use console::{router, ConsoleConfig, ConsoleParts, ConsoleState};
use gallery::HeadlessSurfaces;
use mock_feeds::MockFeeds;
use registry::FileStore;
use std::sync::Arc;
use stream_session::HttpClientFactory;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_with_service("console");

    let config = ConsoleConfig::from_env()?;
    let store = Arc::new(FileStore::new(&config.data_dir)?);
    let assistant = assistant::build_assistant(config.assistant.clone())?;

    let (state, event_loop) = ConsoleState::new(ConsoleParts {
        store,
        factory: Arc::new(HttpClientFactory::new()?),
        surfaces: Arc::new(HeadlessSurfaces),
        recovery: config.recovery.clone(),
        assistant,
        feeds: MockFeeds::new(config.feeds),
    });

    let app = router(state).layer(CorsLayer::permissive());
    let listener = TcpListener::bind(config.bind_addr).await?;

    info!(
        addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        max_retries = config.recovery.max_retries,
        "console listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    event_loop.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
