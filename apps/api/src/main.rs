use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use shared_config::AppConfig;
use shared_database::{DirectorySeed, SupportStore};
use support_session_cell::{HousekeepingService, SupportNotifier, SupportSessionService};
use video_room_cell::{build_room_provider, RoomProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting specialist support API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Directory records
    let store = SupportStore::new();
    if let Some(path) = config.directory_seed_path.as_deref() {
        DirectorySeed::from_path(path)?.apply(&store).await;
    }

    let rooms = build_room_provider(&config);
    info!("Room provider: {}", rooms.kind());

    let service = Arc::new(SupportSessionService::new(
        store,
        rooms,
        SupportNotifier::default(),
        &config,
    ));

    // Connecting-timeout sweep
    let housekeeping = Arc::new(HousekeepingService::new(service.clone(), &config));
    tokio::spawn({
        let housekeeping = housekeeping.clone();
        async move { housekeeping.run().await }
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(service)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    housekeeping.shutdown().await;
    Ok(())
}
