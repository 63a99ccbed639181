use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "checkin_audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `generate`, `refresh`, `validate` or `cleanup`.
    pub action: String,
    /// Reason code, e.g. `accepted`, `bad_signature`, `forbidden`.
    pub outcome: String,
    pub session_id: Option<String>,
    pub event_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
