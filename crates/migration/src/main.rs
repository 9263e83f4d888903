//! Schema tool for the coin store database.
//!
//! Reads the same database URL as the `coinstore` binary
//! (`COINSTORE__DATABASE__URL`), falling back to `DATABASE_URL` and then to
//! the local SQLite file.

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./coinstore.db?mode=rwc";

const USAGE: &str = "\
coin store schema tool

usage: migration [COMMAND] [STEPS]

commands:
  up [STEPS]     apply pending migrations (default: all)
  down [STEPS]   revert applied migrations (default: 1)
  fresh          drop every table, then apply all migrations and the catalog
  refresh        revert all migrations, then apply them again
  status         list migrations and whether they are applied

database: COINSTORE__DATABASE__URL, DATABASE_URL, or ./coinstore.db";

#[derive(Debug, PartialEq)]
enum Command {
    Up(Option<u32>),
    Down(Option<u32>),
    Fresh,
    Refresh,
    Status,
}

fn parse(args: &[String]) -> Option<Command> {
    let steps = match args.get(1) {
        Some(raw) => Some(raw.parse().ok()?),
        None => None,
    };
    let command = match args.first().map(String::as_str).unwrap_or("up") {
        "up" => Command::Up(steps),
        "down" => Command::Down(Some(steps.unwrap_or(1))),
        "fresh" if steps.is_none() => Command::Fresh,
        "refresh" if steps.is_none() => Command::Refresh,
        "status" if steps.is_none() => Command::Status,
        _ => return None,
    };
    if args.len() > 2 {
        return None;
    }
    Some(command)
}

fn database_url() -> String {
    std::env::var("COINSTORE__DATABASE__URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse(&args) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let db = Database::connect(database_url()).await?;
    match command {
        Command::Up(steps) => migration::Migrator::up(&db, steps).await?,
        Command::Down(steps) => migration::Migrator::down(&db, steps).await?,
        Command::Fresh => migration::Migrator::fresh(&db).await?,
        Command::Refresh => migration::Migrator::refresh(&db).await?,
        Command::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}
