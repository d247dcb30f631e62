use anyhow::Result;
use critsvis::api::VisServer;
use critsvis::db::{migrate, Db};
use critsvis::Config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve-http" => run_http_server().await?,
        "verify" => run_schema_verification().await?,
        other => anyhow::bail!("Unknown command '{}'. Usage: critsvis [verify|serve-http]", other),
    }

    Ok(())
}

/// Load config and bring the schema up to date
async fn open_database(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;
    log::info!("Database initialized: {}", config.db_path().display());
    Ok(db)
}

/// Run the vis HTTP server
async fn run_http_server() -> Result<()> {
    log::info!("Starting Critsvis HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let db = open_database(&config).await?;

    let server = VisServer::new(db, &config)?;
    server.run(config.http_server.port).await?;

    Ok(())
}

/// Check that every expected table exists
async fn run_schema_verification() -> Result<()> {
    log::info!("Starting Critsvis v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Max traversal depth: {}", config.traversal.max_depth);
    let db = open_database(&config).await?;

    let (missing, applied) = db
        .with_connection(|conn| {
            let missing = migrate::missing_tables(conn)?;
            let applied = migrate::get_applied_migrations(conn)?;
            Ok((missing, applied))
        })
        .await?;

    for table in &missing {
        log::error!("Missing table: {}", table);
    }
    if !missing.is_empty() {
        anyhow::bail!("{} required table(s) missing", missing.len());
    }

    log::info!("✓ {} migrations applied", applied.len());
    log::info!("✓ Database schema verification complete");
    Ok(())
}
