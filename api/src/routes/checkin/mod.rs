use crate::state::AppState;
use axum::{Router, routing::post};

mod common;
mod post;

pub use common::{CheckinRequest, CheckinResponse, RejectionBody};
pub use post::check_in;

pub fn checkin_routes() -> Router<AppState> {
    Router::new().route("/", post(check_in))
}
