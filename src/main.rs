use anyhow::Context;
use dotenv::dotenv;
use tokio::signal::ctrl_c;
use tracing::info;

use coursehub_backend::{
    app::create_router,
    app_state::AppState,
    config::Config,
    db::Database,
    telemetry::{TelemetryConfig, init_telemetry},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    let telemetry = init_telemetry(TelemetryConfig::for_app(&config)).await?;

    let db = Database::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    let addr = config.server_addr();
    let app_name = config.app.name.clone();

    let state = AppState::new(db.clone(), config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("{} listening on {}", app_name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    info!("Server stopped, closing connections");
    db.close().await;
    telemetry.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
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
        _ = interrupt => {},
        _ = terminate => {},
    }
}
