use std::{env, fs, path::Path, process::ExitCode};

mod runner;

/// `migration [up|fresh|clean|status]`, defaulting to `up`.
#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let Ok(db_path) = env::var("DATABASE_PATH") else {
        eprintln!("DATABASE_PATH must be set");
        return ExitCode::FAILURE;
    };
    let command = env::args().nth(1).unwrap_or_else(|| "up".into());

    if matches!(command.as_str(), "clean" | "fresh") {
        if let Err(e) = remove_db_file(&db_path) {
            eprintln!("Failed to delete {db_path}: {e}");
            return ExitCode::FAILURE;
        }
        if command == "clean" {
            return ExitCode::SUCCESS;
        }
    }

    if let Some(parent) = Path::new(&db_path).parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Failed to create {}: {e}", parent.display());
            return ExitCode::FAILURE;
        }
    }

    let url = format!("sqlite://{db_path}?mode=rwc");
    let db = match sea_orm::Database::connect(&url).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to connect to {url}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match command.as_str() {
        "status" => runner::print_status(&db).await,
        "up" | "fresh" => runner::apply_pending(&db).await.map(|_| ()),
        other => {
            eprintln!("Unknown command `{other}`; expected up, fresh, clean or status");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Migration failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn remove_db_file(path: &str) -> std::io::Result<()> {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path)?;
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
    Ok(())
}
