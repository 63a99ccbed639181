use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// HMAC key material for QR signatures. The row with `retired_at = NULL`
/// is the active signing key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "verifier_secrets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub rotation_version: i32,
    pub secret_hex: String,
    pub created_at: DateTime<Utc>,
    pub retired_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
