use arkdb::config::default_credential_path;
use arkdb::{DbHandle, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: arkdb [CREDENTIALS_FILE] SQL...";

/// Runs one statement, printing result rows as JSON lines or the change count.
fn run_statement(db: &DbHandle, sql: &str) -> Result<()> {
    let mut cursor = db.prepare(sql)?;
    if cursor.columns().is_empty() {
        drop(cursor);
        let changed = db.execute_no_commit(sql, &[])?;
        println!("{} row(s) affected", changed);
        return Ok(());
    }
    for row in cursor.stream(&[])? {
        println!("{}", row?.to_json()?);
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let credentials: Option<PathBuf> = match args.first() {
        Some(first) if Path::new(first).is_file() => Some(PathBuf::from(args.remove(0))),
        _ => default_credential_path(),
    };
    let Some(credentials) = credentials else {
        eprintln!("no credential file given and no config directory found\n{}", USAGE);
        return ExitCode::from(2);
    };
    if args.is_empty() {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    info!("Opening database from {:?}", credentials);
    let db = match DbHandle::from_credential_file(&credentials) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = 0;
    for sql in &args {
        if let Err(e) = run_statement(&db, sql) {
            eprintln!("{}", e);
            failed += 1;
        }
    }
    if let Err(e) = db.commit() {
        eprintln!("Failed to commit: {}", e);
        return ExitCode::FAILURE;
    }

    if failed > 0 {
        eprintln!("{} of {} statement(s) failed", failed, args.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
