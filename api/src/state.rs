//! Shared state handed to every route handler through axum's `State` extractor.

use sea_orm::DatabaseConnection;
use services::{CheckinEngine, EngineError, EnginePolicy, Signer};
use std::sync::Arc;
use util::config;

/// Central application state.
///
/// Cheap to clone: the connection is a pool handle and the signer and engine
/// sit behind `Arc`s, so every handler sees the same key ring.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    signer: Arc<Signer>,
    engine: Arc<CheckinEngine>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, signer: Arc<Signer>, policy: EnginePolicy) -> Self {
        let engine = Arc::new(CheckinEngine::from_db(db.clone(), signer.clone(), policy));
        Self { db, signer, engine }
    }

    /// Loads the signing key ring and engine policy from configuration.
    pub async fn init(db: DatabaseConnection) -> Result<Self, EngineError> {
        let repo = db::repositories::VerifierSecretRepository::new(db.clone());
        let signer = Signer::load(
            &repo,
            config::qr_signing_secret().as_deref(),
            config::qr_retained_key_versions(),
            chrono::Utc::now(),
        )
        .await?;

        Ok(Self::new(db, Arc::new(signer), EnginePolicy::from_config()))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn engine(&self) -> &CheckinEngine {
        &self.engine
    }
}
