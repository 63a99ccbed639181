//! Mints, rotates and garbage-collects QR sessions for events.

use crate::audit::{AuditAction, AuditEntry, AuditTrail};
use crate::collaborators::{EventPolicy, EventSource, RoleChecker};
use crate::error::EngineError;
use crate::session_store::SessionStore;
use crate::signer::{canonical_payload_parts, Signer};
use chrono::{DateTime, Duration, DurationRound, Utc};
use db::models::qr_session::Model as QrSession;
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const MIN_REFRESH_SECONDS: i64 = 10;
pub const MAX_REFRESH_SECONDS: i64 = 300;

const NONCE_BYTES: usize = 16;

/// What a display surface needs to render one QR window. `qr_payload` is the
/// exact string that was signed and must be encoded unmodified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub event_id: i64,
    pub nonce: String,
    pub signature: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub refresh_interval_seconds: i64,
    pub qr_payload: String,
}

impl SessionResponse {
    fn from_session(session: &QrSession, refresh_interval_seconds: i64) -> Self {
        Self {
            session_id: session.session_id.clone(),
            event_id: session.event_id,
            nonce: session.nonce.clone(),
            signature: session.signature.clone(),
            issued_at: session.issued_at,
            expires_at: session.expires_at,
            refresh_interval_seconds,
            qr_payload: crate::signer::canonical_payload(session),
        }
    }
}

/// Event refresh interval clamped to the supported range.
pub fn refresh_interval_seconds(event: &EventPolicy) -> i64 {
    i64::from(event.qr_refresh_interval_seconds).clamp(MIN_REFRESH_SECONDS, MAX_REFRESH_SECONDS)
}

fn new_nonce() -> String {
    let mut buf = [0u8; NONCE_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    events: Arc<dyn EventSource>,
    roles: Arc<dyn RoleChecker>,
    audit: Arc<dyn AuditTrail>,
    signer: Arc<Signer>,
    retention: Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        events: Arc<dyn EventSource>,
        roles: Arc<dyn RoleChecker>,
        audit: Arc<dyn AuditTrail>,
        signer: Arc<Signer>,
        retention: Duration,
    ) -> Self {
        Self {
            store,
            events,
            roles,
            audit,
            signer,
            retention,
        }
    }

    /// Mints a fresh session for `event_id` on behalf of `requester_id`.
    pub async fn generate(
        &self,
        event_id: i64,
        requester_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionResponse, EngineError> {
        let event = self
            .authorize(AuditAction::Generate, event_id, requester_id, now)
            .await?;
        self.mint(&event, requester_id, AuditAction::Generate, now).await
    }

    /// Newest usable session of the event, if any. Only the owner or an
    /// elevated user may read it, since the response carries a live signature.
    pub async fn get_active(
        &self,
        event_id: i64,
        requester_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionResponse>, EngineError> {
        let event = self.find_event(event_id).await?;
        if let Err(e) = self.ensure_manager(&event, requester_id).await {
            tracing::warn!(event_id, requester_id, error = %e, "Active QR session read denied");
            return Err(e);
        }

        let active = self.store.list_active(event_id, now).await?;
        Ok(active
            .first()
            .map(|s| SessionResponse::from_session(s, refresh_interval_seconds(&event))))
    }

    /// Force-expires every active session of the event, then mints a new one.
    /// Retired rows stay in the store until garbage collection.
    pub async fn refresh(
        &self,
        event_id: i64,
        requester_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionResponse, EngineError> {
        let event = self
            .authorize(AuditAction::Refresh, event_id, requester_id, now)
            .await?;

        let retired = self.store.force_expire_active(event_id, now).await?;
        tracing::debug!(event_id, retired, "Retired active QR sessions");

        self.mint(&event, requester_id, AuditAction::Refresh, now).await
    }

    /// Deletes sessions that expired more than the retention period ago.
    /// Safe to run repeatedly and alongside live traffic.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, EngineError> {
        let deleted = self.store.purge_expired_older_than(self.retention, now).await?;

        tracing::info!(deleted, "Purged expired QR sessions");
        self.audit
            .record(AuditEntry::new(AuditAction::Cleanup, "purged", now).detail(format!("deleted={deleted}")))
            .await;
        Ok(deleted)
    }

    async fn authorize(
        &self,
        action: AuditAction,
        event_id: i64,
        requester_id: i64,
        now: DateTime<Utc>,
    ) -> Result<EventPolicy, EngineError> {
        let result = self.check_access(event_id, requester_id).await;

        if let Err(e) = &result {
            tracing::warn!(event_id, requester_id, action = %action, error = %e, "QR session request denied");
            self.audit
                .record(
                    AuditEntry::new(action, e.code(), now)
                        .event(event_id)
                        .actor(requester_id),
                )
                .await;
        }
        result
    }

    async fn check_access(&self, event_id: i64, requester_id: i64) -> Result<EventPolicy, EngineError> {
        let event = self.find_event(event_id).await?;

        if !event.is_open() {
            return Err(EngineError::EventClosed(event_id));
        }

        self.ensure_manager(&event, requester_id).await?;
        Ok(event)
    }

    async fn find_event(&self, event_id: i64) -> Result<EventPolicy, EngineError> {
        self.events
            .find_event(event_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {event_id}")))
    }

    async fn ensure_manager(&self, event: &EventPolicy, requester_id: i64) -> Result<(), EngineError> {
        if event.created_by == requester_id || self.roles.has_elevated_role(requester_id).await? {
            Ok(())
        } else {
            Err(EngineError::Forbidden {
                user_id: requester_id,
                event_id: event.id,
            })
        }
    }

    async fn mint(
        &self,
        event: &EventPolicy,
        requester_id: i64,
        action: AuditAction,
        now: DateTime<Utc>,
    ) -> Result<SessionResponse, EngineError> {
        let issued_at = now
            .duration_trunc(Duration::milliseconds(1))
            .unwrap_or(now);
        let interval = refresh_interval_seconds(event);
        let expires_at = issued_at + Duration::seconds(interval);
        let session_id = Uuid::new_v4().to_string();
        let nonce = new_nonce();

        let payload = canonical_payload_parts(&session_id, event.id, &nonce, issued_at, expires_at);
        let signature = self.signer.sign(&payload);

        let session = self
            .store
            .create(QrSession {
                session_id,
                event_id: event.id,
                created_by: requester_id,
                nonce,
                signature,
                issued_at,
                signed_expires_at: expires_at,
                expires_at,
                used_at: None,
                used_by_user_id: None,
            })
            .await?;

        tracing::info!(
            event_id = event.id,
            session_id = %session.session_id,
            key_version = self.signer.active_version(),
            expires_at = %session.expires_at,
            "Minted QR session"
        );
        self.audit
            .record(
                AuditEntry::new(action, "issued", now)
                    .session(session.session_id.clone())
                    .event(event.id)
                    .actor(requester_id),
            )
            .await;

        Ok(SessionResponse {
            qr_payload: payload,
            ..SessionResponse::from_session(&session, interval)
        })
    }
}
