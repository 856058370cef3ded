use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docshelf::app::AppState;
use docshelf::config::load_settings_from_path;
use docshelf::database::postgres::PostgresDatabase;
use docshelf::routes;
use docshelf::storage::UploadDir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting docshelf server...");

    // Load configuration.
    let settings = load_settings_from_path("docshelf.toml")?;
    info!(
        "Configuration loaded: environment={}, host={}, port={}",
        settings.environment, settings.host, settings.port
    );

    // Initialize database.
    let database = Arc::new(
        PostgresDatabase::new(&settings.postgres_uri, settings.db_pool_size).await?,
    );
    database.initialize().await?;
    info!("Database initialized");

    // Upload storage root.
    let uploads = UploadDir::new(&settings.upload_dir);
    info!("Upload storage rooted at {}", uploads.base().display());

    // Build application state.
    let state = Arc::new(AppState {
        settings: settings.clone(),
        collections: database.clone(),
        documents: database,
        uploads,
    });

    // Build router.
    let app = routes::build_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
