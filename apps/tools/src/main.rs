use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use console_core::{HttpRecordStore, RecordStore, DEFAULT_STORE_URL};
use futures::future::join_all;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

mod seed;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_STORE_URL)]
    store_url: String,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the directory with generated users.
    Seed {
        #[arg(long, default_value_t = 70)]
        count: usize,
        /// Add to the existing records instead of wiping them first.
        #[arg(long)]
        keep_existing: bool,
        /// Fixed RNG seed for a reproducible directory.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Delete every record in the directory.
    Wipe,
}

/// Deletes by raw id so records the console cannot decode go too.
async fn wipe(store: &dyn RecordStore) -> Result<usize> {
    let ids = store.list_ids().await?;
    let results = join_all(ids.iter().map(|id| store.delete(id))).await;

    let mut failed = 0;
    for (id, result) in ids.iter().zip(&results) {
        if let Err(err) = result {
            warn!(user_id = %id, "wipe: delete failed: {err}");
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("failed to delete {failed} of {} users", ids.len());
    }
    Ok(ids.len())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let url = Url::parse(&cli.store_url)
        .with_context(|| format!("invalid store url '{}'", cli.store_url))?;
    let store: Arc<dyn RecordStore> = Arc::new(HttpRecordStore::new(
        url,
        Duration::from_secs(cli.timeout_secs),
    )?);

    match cli.command {
        Command::Seed {
            count,
            keep_existing,
            seed,
        } => {
            if !keep_existing {
                let removed = wipe(store.as_ref()).await?;
                info!(removed, "existing users deleted");
            }

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let payloads = seed::generate_users(&mut rng, count, Utc::now());
            for (index, payload) in payloads.iter().enumerate() {
                let created = store
                    .create(payload)
                    .await
                    .with_context(|| format!("failed to create user {} of {count}", index + 1))?;
                info!(user_id = %created.id, name = %created.name, "seeded user");
            }
            println!("seeded {count} users");
        }
        Command::Wipe => {
            let removed = wipe(store.as_ref()).await?;
            println!("deleted {removed} users");
        }
    }

    Ok(())
}
