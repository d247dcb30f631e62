use anyhow::{Context, Result};
use clap::Parser;
use critsvis::db::{migrate, Db};
use critsvis::import::{import_into, Fixture};
use critsvis::Config;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "import")]
#[command(about = "Load entities, relationships and analysts from a JSON fixture")]
struct Args {
    /// Fixture file to import
    fixture: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let config = Config::load()?;
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;

    let fixture = Fixture::from_path(&args.fixture)
        .with_context(|| format!("Failed to load fixture {}", args.fixture.display()))?;
    log::info!(
        "Importing {} entities and {} analysts from {}",
        fixture.entities.len(),
        fixture.analysts.len(),
        args.fixture.display()
    );

    let start = Instant::now();
    let stats = import_into(&db, fixture).await?;

    log::info!(
        "Imported {} entities, {} relationships, {} analysts in {:?}",
        stats.entities,
        stats.relationships,
        stats.analysts,
        start.elapsed()
    );

    Ok(())
}
