use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202510010001_create_users::Migration),
            Box::new(migrations::m202510010002_create_events::Migration),
            Box::new(migrations::m202510010003_create_qr_sessions::Migration),
            Box::new(migrations::m202510010004_create_attendance_records::Migration),
            Box::new(migrations::m202510010005_create_rate_limits::Migration),
            Box::new(migrations::m202510010006_create_verifier_secrets::Migration),
            Box::new(migrations::m202510010007_create_checkin_audit_log::Migration),
        ]
    }
}
