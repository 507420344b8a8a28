use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use assistant_api_server::auth::JwtManager;
use assistant_api_server::config::Settings;
use assistant_api_server::database::{DbPool, Repository};
use assistant_api_server::handlers;
use assistant_api_server::services::{LlmService, SessionCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,assistant_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("🚀 Starting Assistant API Server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    info!("✅ Database connection established");

    // Initialize repository
    let repository = Arc::new(Repository::new(db_pool));

    // Initialize services
    let llm_service = Arc::new(LlmService::new(settings.llm.clone()));

    let session_cache = Arc::new(SessionCache::new(llm_service.clone(), &settings.chat));

    let jwt_manager = Arc::new(JwtManager::new(
        &settings.auth.jwt_secret,
        settings.auth.token_expiration_seconds,
    ));

    // Build router
    let app = build_router(session_cache, repository, jwt_manager);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(
    session_cache: Arc<SessionCache>,
    repository: Arc<Repository>,
    jwt_manager: Arc<JwtManager>,
) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/models", get(handlers::chat::list_models))
        .route("/chat/test", post(handlers::chat::chat_test_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/chat", post(handlers::chat::chat_handler))
        .route("/chats", get(handlers::chat::list_chats_handler))
        .route("/history/{thread_id}", get(handlers::chat::chat_history_handler))
        .route("/chat/{thread_id}", delete(handlers::chat::delete_chat_handler));

    // Combine routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Shared state
        .layer(Extension(session_cache))
        .layer(Extension(repository))
        .layer(Extension(jwt_manager))
        // CORS
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}
