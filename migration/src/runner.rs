use colored::*;
use migration::Migrator;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use sea_orm_migration::MigrationStatus;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 72;

/// Applies pending migrations one at a time so each gets its own progress
/// line. Already-applied migrations are skipped, which makes the command safe
/// to rerun against a live database.
pub async fn apply_pending(db: &DatabaseConnection) -> Result<usize, DbErr> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if pending.is_empty() {
        println!("{}", "Schema is up to date".green());
        return Ok(0);
    }

    println!("Applying {} migration(s)", pending.len());
    for migration in &pending {
        let label = format!("  {}", migration.name().bold());
        print!("{label}{} ", ".".repeat(STATUS_COLUMN.saturating_sub(label.len())));
        io::stdout().flush().ok();

        let started = Instant::now();
        match Migrator::up(db, Some(1)).await {
            Ok(()) => println!("{} {}", "ok".green(), format!("({:.2?})", started.elapsed()).dimmed()),
            Err(e) => {
                println!("{}", "failed".red());
                return Err(e);
            }
        }
    }
    Ok(pending.len())
}

/// Prints every known migration with whether it has been applied.
pub async fn print_status(db: &DatabaseConnection) -> Result<(), DbErr> {
    for migration in Migrator::get_migration_with_status(db).await? {
        let state = match migration.status() {
            MigrationStatus::Applied => "applied".green(),
            MigrationStatus::Pending => "pending".yellow(),
        };
        println!("{state}  {}", migration.name());
    }
    Ok(())
}
