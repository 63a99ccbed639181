//! Fixed-window scan limiter keyed by `(identifier, action)`.
//!
//! Every step is a single conditional statement against `rate_limits`, so
//! concurrent attempts at the boundary cannot both be admitted.

use crate::error::EngineError;
use chrono::{DateTime, Duration, Utc};
use db::repositories::RateLimitRepository;

/// Action key for QR scans.
pub const QR_SCAN_ACTION: &str = "QR_SCAN";

pub fn user_identifier(user_id: i64) -> String {
    format!("user:{user_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { count: u32 },
    Blocked { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }

    /// Whole seconds until the window reopens, rounded up and never zero.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            RateDecision::Allowed { .. } => None,
            RateDecision::Blocked { retry_after } => {
                let ms = retry_after.num_milliseconds().max(0) as u64;
                Some(ms.div_ceil(1000).max(1))
            }
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    repo: RateLimitRepository,
}

impl RateLimiter {
    pub fn new(repo: RateLimitRepository) -> Self {
        Self { repo }
    }

    /// Counts one attempt and decides whether it may proceed.
    ///
    /// At most `limit` attempts are admitted per window. Once a window has
    /// lasted `window`, the next attempt starts a fresh one with a count of one.
    pub async fn check(
        &self,
        identifier: &str,
        action: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, EngineError> {
        if limit == 0 {
            return Ok(RateDecision::Blocked { retry_after: window });
        }

        if self.repo.insert_if_absent(identifier, action, now).await? {
            return Ok(RateDecision::Allowed { count: 1 });
        }

        if self
            .repo
            .reset_if_elapsed(identifier, action, now - window, now)
            .await?
        {
            return Ok(RateDecision::Allowed { count: 1 });
        }

        let limit_i32 = i32::try_from(limit).unwrap_or(i32::MAX);
        let admitted = self.repo.increment_below(identifier, action, limit_i32).await?;
        let row = self.repo.find(identifier, action).await?;

        let Some(row) = row else {
            // Deleted between statements; nothing left to count against.
            return Ok(RateDecision::Allowed { count: 1 });
        };

        if admitted {
            return Ok(RateDecision::Allowed {
                count: row.attempt_count.max(1) as u32,
            });
        }

        let until = row.window_start + window;
        self.repo.block_until(identifier, action, until).await?;
        let retry_after = (until - now).max(Duration::zero());

        tracing::warn!(
            identifier,
            action,
            attempts = row.attempt_count,
            retry_after_seconds = retry_after.num_seconds(),
            "Rate limit exceeded"
        );
        Ok(RateDecision::Blocked { retry_after })
    }
}
