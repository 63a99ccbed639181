use api::{routes::routes, state::AppState};
use axum::{Router, body::Body, http::Request, response::Response};
use db::repositories::VerifierSecretRepository;
use db::test_utils::setup_test_db;
use services::{EnginePolicy, Signer};
use std::{convert::Infallible, sync::Arc};
use tower::{ServiceExt, util::BoxCloneService};
use util::config::AppConfig;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-qr-checkin";

pub type TestApp = BoxCloneService<Request<Body>, Response, Infallible>;

/// Router over a fresh in-memory database with a bootstrapped version-1
/// signing key and the default scan policy (5 scans per 60 s).
pub async fn make_test_app() -> (TestApp, AppState) {
    AppConfig::set_jwt_secret(TEST_JWT_SECRET);
    AppConfig::set_trusted_proxies(Vec::new());

    let db = setup_test_db().await;
    let signer = Signer::load(
        &VerifierSecretRepository::new(db.clone()),
        Some(&"5a".repeat(32)),
        1,
        chrono::Utc::now(),
    )
    .await
    .expect("Failed to bootstrap signing key");

    let app_state = AppState::new(db, Arc::new(signer), EnginePolicy::default());
    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .into_service()
        .boxed_clone();

    (app, app_state)
}
