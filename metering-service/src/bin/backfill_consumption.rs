use std::{env, fs::File};

use anyhow::{bail, Context, Result};
use metering_service::{backfill, config::AppConfig, observability, storage};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: backfill_consumption <csv_file_path>");
    }
    let file_path = &args[1];

    // Load configuration (can point METERING_CONFIG to a backfill-specific file).
    let cfg = AppConfig::load()?;

    // Parse and validate the whole file before touching the store.
    let file = File::open(file_path).with_context(|| format!("failed to open CSV file '{file_path}'"))?;
    let batches = backfill::read_batches(file)?;

    let store = storage::connect(&cfg.storage).await?;
    let summary = backfill::ingest_batches(store.as_ref(), batches).await?;

    tracing::info!(
        file = %file_path,
        households = summary.households,
        households_created = summary.households_created,
        records = summary.records,
        "backfill complete"
    );

    Ok(())
}
