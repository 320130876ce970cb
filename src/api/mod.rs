//! HTTP API
//!
//! ```text
//! Client ──HTTP──> TraceLayer ──> handlers ──RecordStore──> backend
//! ```
//!
//! - `models`: request/response bodies and validation
//! - `handlers`: one async handler per route
//! - `error`: `ApiError` and its JSON rendering
//! - `extract`: the JSON body extractor

pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;

pub use error::{ApiError, ApiResult};
pub use extract::JsonBody;
pub use models::{CreateRecord, PhoneRecord, UpdateRecord};

use crate::store::RecordStore;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the service router over `store`.
pub fn router<S: RecordStore>(store: Arc<S>) -> Router {
    Router::new()
        .route("/phones", post(handlers::create_phone::<S>))
        .route(
            "/phones/:phone",
            get(handlers::get_phone::<S>)
                .put(handlers::update_phone::<S>)
                .delete(handlers::delete_phone::<S>),
        )
        .route("/health", get(handlers::health::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
