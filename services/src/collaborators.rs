//! Read-only views of data owned outside the check-in engine: who may mint
//! sessions, and which policy an event carries.

use crate::error::EngineError;
use async_trait::async_trait;
use db::models::event;
use db::repositories::{EventRepository, UserRepository};

/// Event row as the engine sees it: location, radius, GPS requirement, late
/// policy, refresh interval and lifecycle status.
pub type EventPolicy = event::Model;

#[async_trait]
pub trait RoleChecker: Send + Sync {
    /// Elevated users may manage sessions of events they do not own.
    async fn has_elevated_role(&self, user_id: i64) -> Result<bool, EngineError>;
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn find_event(&self, event_id: i64) -> Result<Option<EventPolicy>, EngineError>;
}

#[async_trait]
impl RoleChecker for UserRepository {
    async fn has_elevated_role(&self, user_id: i64) -> Result<bool, EngineError> {
        Ok(self
            .find_by_id(user_id)
            .await?
            .is_some_and(|user| user.role.is_elevated()))
    }
}

#[async_trait]
impl EventSource for EventRepository {
    async fn find_event(&self, event_id: i64) -> Result<Option<EventPolicy>, EngineError> {
        Ok(self.find_by_id(event_id).await?)
    }
}
