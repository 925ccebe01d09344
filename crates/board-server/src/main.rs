use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use board_api::auth::{self, AppState, AppStateInner};
use board_api::boards;
use board_api::middleware::require_auth;
use board_api::reactions;
use board_api::tenants;
use board_core::BoardEngine;
use board_core::cache::TtlCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "board=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("BOARD_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("BOARD_DB_PATH").unwrap_or_else(|_| "answerboard.db".into());
    let host = std::env::var("BOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BOARD_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(board_store::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let engine = BoardEngine::new(db.clone());
    let state: AppState = Arc::new(AppStateInner {
        db,
        engine,
        users_cache: TtlCache::new(),
        jwt_secret,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(tenants::me).delete(tenants::deactivate))
        .route("/me/sheets", post(tenants::create_sheet))
        .route("/me/board", put(tenants::publish_board))
        .route("/boards/{owner_id}", get(boards::get_board))
        .route("/boards/{owner_id}/answers", post(boards::submit_answer))
        .route(
            "/boards/{owner_id}/rows/{row}/reactions",
            post(reactions::toggle_reaction),
        )
        .route(
            "/boards/{owner_id}/rows/{row}/highlight",
            post(reactions::toggle_highlight),
        )
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Answer board server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
