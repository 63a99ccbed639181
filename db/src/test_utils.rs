use crate::models::{event, user};
use chrono::{DateTime, Duration, Utc};
use migration::Migrator;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

/// Fresh, migrated in-memory database.
///
/// Pinned to a single pooled connection so every query sees the same
/// in-memory file and concurrent tests inside one database are serialized
/// by SQLite itself.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub async fn seed_user(db: &DatabaseConnection, username: &str, role: user::UserRole) -> user::Model {
    user::Model::create(db, username, role)
        .await
        .expect("Failed to seed user")
}

/// Seeds an open event centred on (10.0, 106.0) with a 100 m radius, GPS not
/// required, late check-in allowed after 15 minutes and a 30 s QR rotation.
pub async fn seed_event(
    db: &DatabaseConnection,
    created_by: i64,
    start_time: DateTime<Utc>,
) -> event::Model {
    event::ActiveModel {
        id: NotSet,
        title: Set("Seeded Event".into()),
        created_by: Set(created_by),
        latitude: Set(10.0),
        longitude: Set(106.0),
        radius_meters: Set(100.0),
        require_gps: Set(false),
        allow_late_checkin: Set(true),
        late_checkin_minutes: Set(15),
        qr_refresh_interval_seconds: Set(30),
        allowed_network_cidr: Set(None),
        start_time: Set(start_time),
        end_time: Set(start_time + Duration::hours(2)),
        status: Set(event::EventStatus::Published),
    }
    .insert(db)
    .await
    .expect("Failed to seed event")
}
