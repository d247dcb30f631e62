use anyhow::Result;
use clap::Parser;
use critsvis::db::Db;
use critsvis::import::Fixture;
use critsvis::repository::{analyst_sources, SqliteRepository};
use critsvis::{generate_vis_graph, Config, GraphResult, SourceSet, TraversalLimits};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "vis")]
#[command(about = "Build the relationship graph around an entity and print it as JSON")]
struct Args {
    /// Id of the entity to start from
    id: String,

    /// Analyst whose sources decide visibility
    #[arg(short, long, conflicts_with = "source")]
    analyst: Option<String>,

    /// Allowed source name (repeatable)
    #[arg(short, long)]
    source: Vec<String>,

    /// Read entities from a JSON fixture instead of the configured database
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Override traversal.max_depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

fn with_depth(mut limits: TraversalLimits, max_depth: Option<usize>) -> Result<TraversalLimits> {
    if let Some(depth) = max_depth {
        if depth == 0 {
            anyhow::bail!("--max-depth must be at least 1");
        }
        limits.max_depth = depth;
    }
    Ok(limits)
}

/// Walk a fixture in memory; no config file needed.
fn run_fixture(args: &Args, path: &Path) -> Result<GraphResult> {
    let fixture = Fixture::from_path(path)?;
    let repo = fixture.to_memory_repository()?;
    let allowed: SourceSet = match &args.analyst {
        Some(analyst) => fixture.analyst_sources(analyst),
        None => args.source.iter().cloned().collect(),
    };
    let limits = with_depth(TraversalLimits::default(), args.max_depth)?;
    let result = generate_vis_graph(&repo, &args.id, &allowed, &limits)?;
    log::info!("{} repository lookups", repo.lookups());
    Ok(result)
}

async fn run_database(args: &Args) -> Result<GraphResult> {
    let config = Config::load()?;
    let db = Db::new(config.db_path());
    let limits = with_depth(config.traversal.limits(), args.max_depth)?;

    let id = args.id.clone();
    let analyst = args.analyst.clone();
    let sources: SourceSet = args.source.iter().cloned().collect();
    let result = db
        .with_connection(move |conn| {
            let allowed = match &analyst {
                Some(name) => analyst_sources(conn, name)?,
                None => sources,
            };
            let repo = SqliteRepository::new(conn);
            generate_vis_graph(&repo, &id, &allowed, &limits)
        })
        .await?;
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "warn")
    ).init();

    let args = Args::parse();
    if args.analyst.is_none() && args.source.is_empty() {
        anyhow::bail!("Give --analyst <name> or at least one --source <name>");
    }

    let start = Instant::now();
    let result = match &args.fixture {
        Some(path) => run_fixture(&args, path)?,
        None => run_database(&args).await?,
    };
    let duration = start.elapsed();

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    match result.graph() {
        Some(graph) => eprintln!(
            "{} nodes, {} edges in {:?}",
            graph.nodes.len(),
            graph.edges.len(),
            duration
        ),
        None => {
            eprintln!("ID does not exist or insufficient privs for source");
            std::process::exit(2);
        }
    }

    Ok(())
}
