//! Append-only trail of every generate, refresh, validate and cleanup call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::models::checkin_audit::ActiveModel;
use db::repositories::CheckinAuditRepository;
use sea_orm::{ActiveValue::NotSet, Set};
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    Generate,
    Refresh,
    Validate,
    Cleanup,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub outcome: String,
    pub session_id: Option<String>,
    pub event_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, outcome: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            action,
            outcome: outcome.into(),
            session_id: None,
            event_id: None,
            actor_id: None,
            detail: None,
            at,
        }
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn event(mut self, event_id: i64) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Recording never fails the caller. A lost audit row is logged and dropped.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

#[async_trait]
impl AuditTrail for CheckinAuditRepository {
    async fn record(&self, entry: AuditEntry) {
        let row = ActiveModel {
            id: NotSet,
            action: Set(entry.action.to_string()),
            outcome: Set(entry.outcome.clone()),
            session_id: Set(entry.session_id.clone()),
            event_id: Set(entry.event_id),
            actor_id: Set(entry.actor_id),
            detail: Set(entry.detail.clone()),
            created_at: Set(entry.at),
        };

        if let Err(e) = self.create(row).await {
            tracing::warn!(
                action = %entry.action,
                outcome = %entry.outcome,
                session_id = ?entry.session_id,
                error = %e,
                "Failed to write check-in audit entry"
            );
        }
    }
}
