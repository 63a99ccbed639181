//! Wiring of the lifecycle manager and validator over one database.

use crate::session_manager::SessionManager;
use crate::signer::Signer;
use crate::rate_limiter::RateLimiter;
use crate::validator::{CheckinValidator, ScanPolicy};
use chrono::Duration;
use db::repositories::{
    CheckinAuditRepository, EventRepository, QrSessionRepository, RateLimitRepository,
    UserRepository,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use util::config;

#[derive(Debug, Clone, Copy)]
pub struct EnginePolicy {
    pub scan_rate_limit: u32,
    pub scan_rate_window: Duration,
    pub session_retention: Duration,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            scan_rate_limit: 5,
            scan_rate_window: Duration::seconds(60),
            session_retention: Duration::hours(1),
        }
    }
}

impl EnginePolicy {
    pub fn from_config() -> Self {
        Self {
            scan_rate_limit: config::scan_rate_limit(),
            scan_rate_window: Duration::seconds(i64::from(config::scan_rate_window_seconds())),
            session_retention: Duration::minutes(i64::from(config::session_retention_minutes())),
        }
    }
}

pub struct CheckinEngine {
    pub sessions: SessionManager,
    pub validator: CheckinValidator,
}

impl CheckinEngine {
    pub fn from_db(db: DatabaseConnection, signer: Arc<Signer>, policy: EnginePolicy) -> Self {
        let store = Arc::new(QrSessionRepository::new(db.clone()));
        let events = Arc::new(EventRepository::new(db.clone()));
        let audit = Arc::new(CheckinAuditRepository::new(db.clone()));

        let sessions = SessionManager::new(
            store.clone(),
            events.clone(),
            Arc::new(UserRepository::new(db.clone())),
            audit.clone(),
            signer.clone(),
            policy.session_retention,
        );

        let validator = CheckinValidator::new(
            store,
            events,
            audit,
            signer,
            RateLimiter::new(RateLimitRepository::new(db)),
            ScanPolicy {
                scan_rate_limit: policy.scan_rate_limit,
                scan_rate_window: policy.scan_rate_window,
            },
        );

        Self { sessions, validator }
    }
}
