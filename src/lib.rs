pub mod clock;
pub mod config;
pub mod lease;
pub mod logging;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod workers;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::lease::KeyLeaseManager;
use crate::state::AppState;
use crate::store::{LeaseStore, MemoryStore, RedisStore, StoreError};

/// Connects to Redis when a URL is configured, otherwise falls back to the
/// in-process store. Returns the store and a label for health reporting.
pub async fn connect_store(
    redis_url: Option<&str>,
) -> Result<(Arc<dyn LeaseStore>, &'static str), StoreError> {
    match redis_url {
        Some(url) => {
            let store: Arc<dyn LeaseStore> = Arc::new(RedisStore::connect(url).await?);
            Ok((store, "redis"))
        }
        None => {
            let store: Arc<dyn LeaseStore> = Arc::new(MemoryStore::new());
            Ok((store, "memory"))
        }
    }
}

pub fn create_app(manager: KeyLeaseManager, store_backend: &'static str) -> axum::Router {
    let state = AppState::new(manager, store_backend);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
