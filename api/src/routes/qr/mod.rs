use crate::state::AppState;
use axum::{Router, routing::post};

mod post;

pub use post::{cleanup_sessions, rotate_signing_key};

/// Admin maintenance routes nested under `/qr`.
pub fn qr_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/cleanup", post(cleanup_sessions))
        .route("/keys/rotate", post(rotate_signing_key))
}
