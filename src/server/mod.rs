use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::hierarchy::HierarchyPolicy;
use crate::storage::SqliteStore;

pub mod response;
pub mod routes;

pub use response::{ApiError, ApiResponse};

/// Server state
pub struct AppState {
    /// A rusqlite connection is not `Sync`; handlers take the lock for one store call.
    pub store: Mutex<SqliteStore>,
    pub policy: HierarchyPolicy,
}

impl AppState {
    pub fn new(store: SqliteStore, policy: HierarchyPolicy) -> Self {
        Self {
            store: Mutex::new(store),
            policy,
        }
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let config_items = Router::new()
        .route("/create", post(routes::create_ci))
        .route("/filter", get(routes::get_all_cis))
        .route("/get-byId/{id}", get(routes::get_ci_by_id))
        .route("/update/{id}", put(routes::update_ci))
        .route("/delete/{id}", delete(routes::delete_ci))
        .route("/create-hierarchy", post(routes::create_hierarchy));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/config-items", config_items)
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, store: SqliteStore, policy: HierarchyPolicy) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(store, policy));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, ?policy, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
