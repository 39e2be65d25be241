//! `osurec` command line.

mod cli;
mod error;

use clap::Parser;
use exn::ResultExt;
use figment::providers::Serialized;
use osurec_cache::{Database, MapIndex, Reconciliation};
use osurec_config::Config;
use osurec_format::{Beatmap, ReplayHeader};
use osurec_watch::Recorder;
use std::process::ExitCode;
use tracing::Span;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::error::{ErrorKind, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    if args.command == Command::Count {
        return count(&config);
    }
    let db = Database::connect(config.database_path()).await.or_raise(|| ErrorKind::Database)?;
    let result = match args.command {
        Command::Watch => watch(&db, &config).await,
        Command::Lookup { hash } => lookup(&db, &config, &hash).await,
        Command::Count => count(&config),
        Command::Reindex => reindex(&db, &config).await,
    };
    db.close().await;
    result
}

fn load_config(args: &Args) -> Result<Config> {
    let mut figment = Config::figment(args.config.as_deref());
    if let Some(root) = &args.osu_root {
        figment = figment.merge(Serialized::default("osu_root", root));
    }
    Config::from_figment(figment).or_raise(|| ErrorKind::Config)
}

async fn open_index(db: &Database, config: &Config) -> Result<MapIndex> {
    let root = config.osu_root().or_raise(|| ErrorKind::Config)?;
    let catalog = config.catalog_path().or_raise(|| ErrorKind::Config)?;
    MapIndex::open(db, root, catalog, Span::current()).await.or_raise(|| ErrorKind::Index)
}

async fn watch(db: &Database, config: &Config) -> Result<()> {
    let mut recorder = Recorder::open(db, config, report, tracing::info_span!("recorder"))
        .await
        .or_raise(|| ErrorKind::Watch)?;
    recorder.start().or_raise(|| ErrorKind::Watch)?;
    let interrupted = tokio::signal::ctrl_c().await.or_raise(|| ErrorKind::Signal);
    recorder.stop().await;
    interrupted
}

fn report(map: Option<Beatmap>, replay: ReplayHeader) {
    let played_at = replay.played_at();
    match map {
        Some(map) => tracing::info!(
            player = %replay.player,
            score = replay.score,
            combo = replay.max_combo,
            ?played_at,
            map = %map,
            path = %map.path.display(),
            "new replay"
        ),
        None => tracing::info!(
            player = %replay.player,
            score = replay.score,
            ?played_at,
            hash = %replay.beatmap_hash,
            "new replay for an unknown beatmap"
        ),
    }
}

async fn lookup(db: &Database, config: &Config, hash: &str) -> Result<()> {
    let index = open_index(db, config).await?;
    let path = index.lookup(hash).await.or_raise(|| ErrorKind::Index)?;
    match path {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        },
        None => exn::bail!(ErrorKind::UnknownHash(hash.to_string())),
    }
}

/// Reads only the catalog header; the index isn't touched.
fn count(config: &Config) -> Result<()> {
    let catalog = config.catalog_path().or_raise(|| ErrorKind::Config)?;
    let records = osurec_format::read_record_count(&catalog).or_raise(|| ErrorKind::Catalog)?;
    println!("{records}");
    Ok(())
}

async fn reindex(db: &Database, config: &Config) -> Result<()> {
    let root = config.osu_root().or_raise(|| ErrorKind::Config)?;
    let catalog = config.catalog_path().or_raise(|| ErrorKind::Config)?;
    let index = MapIndex::attach(db, root, catalog, Span::current()).or_raise(|| ErrorKind::Index)?;
    let outcome = index.rebuild().await.or_raise(|| ErrorKind::Index)?;
    let maps = index.len().await.or_raise(|| ErrorKind::Index)?;
    match outcome {
        Reconciliation::Rebuilt { added } => println!("indexed {maps} beatmaps ({added:+} records)"),
        _ => println!("indexed {maps} beatmaps"),
    }
    Ok(())
}
