//! End-to-end verification of a single scan attempt.
//!
//! Checks run in a fixed order and stop at the first failure, each with its
//! own [`Outcome`]. The session is consumed only after every policy check has
//! passed, so a rejected scan never burns a valid QR window.

use crate::attendance::NewAttendance;
use crate::audit::{AuditAction, AuditEntry, AuditTrail};
use crate::collaborators::{EventPolicy, EventSource};
use crate::error::EngineError;
use crate::geo::GeoPoint;
use crate::rate_limiter::{user_identifier, RateDecision, RateLimiter, QR_SCAN_ACTION};
use crate::session_store::SessionStore;
use crate::signer::{canonical_payload, Signer};
use chrono::{DateTime, Duration, Utc};
use db::models::attendance_record::{AttendanceStatus, CheckInMethod, Model as AttendanceRecord};
use db::repositories::{Consumed, MarkUsed};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_meters: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanAttempt {
    pub session_id: String,
    pub signature: String,
    pub user_id: i64,
    pub geo: Option<GeoFix>,
    pub device: Option<DeviceInfo>,
    pub client_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(AttendanceRecord),
    RejectedExpired,
    RejectedUsed,
    RejectedBadSignature,
    RejectedOutOfRange,
    RejectedRateLimited { retry_after_seconds: u64 },
    RejectedNotFound,
    RejectedLate,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// Stable reason code for the audit trail and API clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Outcome::Accepted(_) => "accepted",
            Outcome::RejectedExpired => "expired",
            Outcome::RejectedUsed => "already_used",
            Outcome::RejectedBadSignature => "bad_signature",
            Outcome::RejectedOutOfRange => "out_of_range",
            Outcome::RejectedRateLimited { .. } => "rate_limited",
            Outcome::RejectedNotFound => "not_found",
            Outcome::RejectedLate => "late",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanPolicy {
    pub scan_rate_limit: u32,
    pub scan_rate_window: Duration,
}

/// Where the location check landed. `Err` carries the audit detail.
pub type LocationCheck = Result<CheckInMethod, String>;

pub fn evaluate_location(event: &EventPolicy, attempt: &ScanAttempt) -> LocationCheck {
    if event.require_gps {
        let Some(fix) = attempt.geo else {
            return Err("missing location".into());
        };
        let centre = GeoPoint::new(event.latitude, event.longitude);
        let distance = centre.distance_to(&GeoPoint::new(fix.latitude, fix.longitude));
        if distance > event.radius_meters {
            return Err(format!(
                "distance={distance:.1}m radius={:.1}m",
                event.radius_meters
            ));
        }
        return Ok(CheckInMethod::Gps);
    }

    if let Some(cidr) = event.allowed_network_cidr.as_deref() {
        let Ok(net) = cidr.trim().parse::<IpNet>() else {
            tracing::warn!(event_id = event.id, cidr, "Event has an unparseable network policy");
            return Err("invalid network policy".into());
        };
        let ip = attempt
            .client_ip
            .as_deref()
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
        return match ip {
            Some(ip) if net.contains(&ip) => Ok(CheckInMethod::Wifi),
            Some(ip) => Err(format!("client_ip={ip} outside {net}")),
            None => Err("missing client ip".into()),
        };
    }

    Ok(CheckInMethod::Wifi)
}

/// `None` when the event refuses late check-ins and the threshold has passed.
pub fn attendance_status(event: &EventPolicy, now: DateTime<Utc>) -> Option<AttendanceStatus> {
    let late = now > event.late_threshold();
    match (late, event.allow_late_checkin) {
        (false, _) => Some(AttendanceStatus::Present),
        (true, true) => Some(AttendanceStatus::Late),
        (true, false) => None,
    }
}

pub struct CheckinValidator {
    store: Arc<dyn SessionStore>,
    events: Arc<dyn EventSource>,
    audit: Arc<dyn AuditTrail>,
    signer: Arc<Signer>,
    limiter: RateLimiter,
    policy: ScanPolicy,
}

impl CheckinValidator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        events: Arc<dyn EventSource>,
        audit: Arc<dyn AuditTrail>,
        signer: Arc<Signer>,
        limiter: RateLimiter,
        policy: ScanPolicy,
    ) -> Self {
        Self {
            store,
            events,
            audit,
            signer,
            limiter,
            policy,
        }
    }

    /// Validates a scan and, on success, records attendance.
    ///
    /// Rejections are `Ok(Outcome::Rejected*)`. `Err` only means the store
    /// could not be reached, and the scan must be treated as rejected.
    pub async fn validate(&self, attempt: &ScanAttempt, now: DateTime<Utc>) -> Result<Outcome, EngineError> {
        let mut entry = AuditEntry::new(AuditAction::Validate, "", now)
            .session(attempt.session_id.clone())
            .actor(attempt.user_id);

        let result = self.evaluate(attempt, now, &mut entry).await;

        match &result {
            Ok(outcome) => {
                entry.outcome = outcome.reason().to_string();
                if outcome.is_accepted() {
                    tracing::info!(
                        session_id = %attempt.session_id,
                        user_id = attempt.user_id,
                        "Check-in accepted"
                    );
                } else {
                    tracing::info!(
                        session_id = %attempt.session_id,
                        user_id = attempt.user_id,
                        reason = outcome.reason(),
                        "Check-in rejected"
                    );
                }
            }
            Err(e) => {
                entry.outcome = e.code().to_string();
                tracing::error!(session_id = %attempt.session_id, error = %e, "Check-in failed");
            }
        }
        self.audit.record(entry).await;

        result
    }

    async fn evaluate(
        &self,
        attempt: &ScanAttempt,
        now: DateTime<Utc>,
        entry: &mut AuditEntry,
    ) -> Result<Outcome, EngineError> {
        let decision = self
            .limiter
            .check(
                &user_identifier(attempt.user_id),
                QR_SCAN_ACTION,
                self.policy.scan_rate_limit,
                self.policy.scan_rate_window,
                now,
            )
            .await?;
        if let RateDecision::Blocked { .. } = decision {
            return Ok(Outcome::RejectedRateLimited {
                retry_after_seconds: decision.retry_after_seconds().unwrap_or(1),
            });
        }

        let Some(session) = self.store.get_by_id(&attempt.session_id).await? else {
            return Ok(Outcome::RejectedNotFound);
        };
        entry.event_id = Some(session.event_id);

        if !self.signer.verify(&canonical_payload(&session), &attempt.signature) {
            return Ok(Outcome::RejectedBadSignature);
        }

        if session.is_expired(now) {
            return Ok(Outcome::RejectedExpired);
        }

        if session.is_used() {
            return Ok(Outcome::RejectedUsed);
        }

        let Some(event) = self.events.find_event(session.event_id).await? else {
            return Ok(Outcome::RejectedNotFound);
        };
        if !event.is_open() {
            entry.detail = Some(format!("event status={}", event.status));
            return Ok(Outcome::RejectedNotFound);
        }

        let method = match evaluate_location(&event, attempt) {
            Ok(method) => method,
            Err(detail) => {
                entry.detail = Some(detail);
                return Ok(Outcome::RejectedOutOfRange);
            }
        };

        let Some(status) = attendance_status(&event, now) else {
            return Ok(Outcome::RejectedLate);
        };

        let device = attempt.device.clone().unwrap_or_default();
        let committed = self
            .store
            .commit_checkin(NewAttendance {
                event_id: event.id,
                user_id: attempt.user_id,
                session_id: session.session_id,
                status,
                method,
                latitude: attempt.geo.map(|g| g.latitude),
                longitude: attempt.geo.map(|g| g.longitude),
                accuracy_meters: attempt.geo.and_then(|g| g.accuracy_meters),
                device_fingerprint: device.fingerprint,
                client_ip: attempt.client_ip.clone(),
                checked_in_at: now,
            })
            .await?;

        let record = match committed {
            Consumed::Recorded(record) => record,
            Consumed::Refused(MarkUsed::AlreadyUsed) => return Ok(Outcome::RejectedUsed),
            Consumed::Refused(MarkUsed::Expired) => return Ok(Outcome::RejectedExpired),
            Consumed::Refused(MarkUsed::NotFound | MarkUsed::Marked) => {
                return Ok(Outcome::RejectedNotFound);
            }
        };

        entry.detail = Some(format!("status={status} method={method}"));
        Ok(Outcome::Accepted(record))
    }
}
