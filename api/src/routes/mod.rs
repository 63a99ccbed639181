//! HTTP routes under `/api`.
//!
//! - `/health` → liveness probe (public)
//! - `/events/{event_id}/qr/sessions` → mint, refresh and fetch QR sessions (authenticated)
//! - `/checkin` → validate a scanned QR session (authenticated)
//! - `/qr` → maintenance: expired-session cleanup and key rotation (admin)

use crate::auth::guards::{allow_admin, allow_authenticated};
use crate::routes::{checkin::checkin_routes, events::event_qr_routes, health::health_routes, qr::qr_admin_routes};
use crate::state::AppState;
use axum::{Router, middleware::from_fn};

pub mod checkin;
pub mod common;
pub mod events;
pub mod health;
pub mod qr;

/// Builds the `/api` router with `app_state` already applied.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest(
            "/events/{event_id}/qr",
            event_qr_routes().route_layer(from_fn(allow_authenticated)),
        )
        .nest("/checkin", checkin_routes().route_layer(from_fn(allow_authenticated)))
        .nest("/qr", qr_admin_routes().route_layer(from_fn(allow_admin)))
        .with_state(app_state)
}
