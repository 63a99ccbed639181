use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

mod get;
mod post;

pub use get::get_active_session;
pub use post::{create_session, refresh_session};

/// Routes nested under `/events/{event_id}/qr`.
pub fn event_qr_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/active", get(get_active_session))
        .route("/sessions/refresh", post(refresh_session))
}
