use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A user as seen by the check-in engine. Profile and credential data live
/// with the identity service; only the role matters here.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Platform-wide role. Manager and above may mint QR sessions for any event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UserRole {
    #[sea_orm(string_value = "participant")]
    Participant,

    #[sea_orm(string_value = "organizer")]
    Organizer,

    #[sea_orm(string_value = "manager")]
    Manager,

    #[sea_orm(string_value = "admin")]
    Admin,

    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl UserRole {
    pub fn is_elevated(self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin | UserRole::SuperAdmin)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        username: &str,
        role: UserRole,
    ) -> Result<Self, DbErr> {
        ActiveModel {
            id: NotSet,
            username: Set(username.to_owned()),
            role: Set(role),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
    }
}
