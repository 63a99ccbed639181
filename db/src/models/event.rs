use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Event policy row. Owned by the event-management side; the check-in engine
/// only ever reads it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub created_by: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub require_gps: bool,
    pub allow_late_checkin: bool,
    pub late_checkin_minutes: i32,
    pub qr_refresh_interval_seconds: i32,
    /// Optional venue network (e.g. `10.20.0.0/16`) used when GPS is not required.
    pub allowed_network_cidr: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EventStatus {
    #[sea_orm(string_value = "draft")]
    Draft,

    #[sea_orm(string_value = "published")]
    Published,

    #[sea_orm(string_value = "ongoing")]
    Ongoing,

    #[sea_orm(string_value = "completed")]
    Completed,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::qr_session::Entity")]
    QrSessions,
}

impl Related<super::qr_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QrSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Completed and cancelled events no longer accept new QR sessions.
    pub fn is_open(&self) -> bool {
        !matches!(self.status, EventStatus::Completed | EventStatus::Cancelled)
    }

    /// Instant after which a check-in counts as late.
    pub fn late_threshold(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.late_checkin_minutes.max(0)))
    }
}
