mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::{delete, get, post, put};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use trailmark_api::state::{AppState, AppStateInner};
use trailmark_api::storage::Storage;
use trailmark_api::{friends, memories, meta, photos, users};
use trailmark_db::Database;

use crate::config::{AllowedOrigins, Config};

/// 10 MB upload limit — photos and avatars only.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Per-request boundary timeout; expiry surfaces as a gateway-class failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .init();

    // Shared state, constructed once and injected everywhere
    let db = Database::open(&config.db_path)?;
    let storage = Storage::new(config.storage_dir.clone(), config.public_base_url.clone()).await?;
    let state: AppState = Arc::new(AppStateInner { db, storage });

    let cors = build_cors(&config.allowed_origins);

    let app = Router::new()
        .route("/", get(meta::root))
        .route("/health", get(meta::health))
        .route("/memories", get(memories::list_memories).post(memories::create_memory))
        .route("/memories/shared", get(memories::list_shared_memories))
        .route("/memories/{id}/shares", get(memories::get_shares))
        .route("/memories/{id}/upload-photo", post(memories::upload_memory_photo))
        .route("/memories/{id}/edit", put(memories::edit_memory))
        .route("/memories/{id}/share-user", post(memories::share_memory))
        .route("/memories/{id}/share-user/{shared_with}", delete(memories::unshare_memory))
        .route("/memories/{id}", delete(memories::delete_memory))
        .route("/photos", get(photos::list_photos).post(photos::create_photo))
        .route("/photos/{id}", get(photos::get_photo).delete(photos::delete_photo))
        .route("/photos/{id}/upload", post(photos::upload_photo))
        .route("/friends", get(friends::list_friends))
        .route("/friends/request", post(friends::send_friend_request))
        .route("/friends/accept", post(friends::accept_friend_request))
        .route("/friends/remove", delete(friends::remove_friend_handler))
        .route("/users", get(users::list_users))
        .route("/profile", get(users::get_profile).put(users::update_profile))
        .route("/profile/avatar", post(users::upload_avatar_handler))
        .nest_service("/storage", ServeDir::new(config.storage_dir.clone()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Trailmark API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_cors(origins: &AllowedOrigins) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    match origins {
        AllowedOrigins::Any => CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(false),
        AllowedOrigins::List(list) => {
            let parsed: Vec<HeaderValue> =
                list.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(methods)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
