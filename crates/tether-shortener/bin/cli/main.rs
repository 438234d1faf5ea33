mod cli;

use crate::cli::{Command, LogFormat, CLI};
use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tether_core::{Backend, ShortCode, Shortener, StoreError};
use tether_deleter::{PipelineConfig, ShutdownMode};
use tether_shortener::ShortenerService;
use tether_storage::{HybridStore, StoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    init_tracing(config.log_format);

    let store_config = StoreConfig::builder()
        .log_path(config.file_storage_path.clone())
        .database_dsn(config.database_dsn.clone())
        .build();
    let pipeline = PipelineConfig::builder()
        .flush_interval(Duration::from_millis(config.flush_interval_ms))
        .flush_threshold(config.flush_threshold)
        .build();

    info!(
        file_storage_path = %store_config.log_path.display(),
        database = store_config.database_dsn.is_some(),
        flush_interval_ms = config.flush_interval_ms,
        flush_threshold = config.flush_threshold,
        "starting shortener"
    );

    match store_config.database_dsn.as_deref() {
        Some(dsn) => {
            let store = HybridStore::open_postgres(&store_config, dsn)
                .await
                .context("can't open hybrid store")?;
            run(store, pipeline, &config).await
        }
        None => {
            let store =
                HybridStore::open_detached(&store_config).context("can't open file-only store")?;
            run(store, pipeline, &config).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// Runs one command, then drains pending deletes and closes the store
/// whatever the command's outcome.
async fn run<B: Backend>(
    store: HybridStore<B>,
    pipeline: PipelineConfig,
    config: &CLI,
) -> anyhow::Result<()> {
    let service = ShortenerService::new(store, pipeline);

    let outcome = execute(&service, &config.command, &config.base_url).await;

    service
        .shutdown(ShutdownMode::Drain)
        .await
        .context("can't shut down cleanly")?;

    outcome
}

async fn execute<B: Backend>(
    service: &ShortenerService<B>,
    command: &Command,
    base_url: &str,
) -> anyhow::Result<()> {
    match command {
        Command::Shorten { url, user } => match service.save(url, user).await {
            Ok(code) => println!("{}", code.to_url(base_url)),
            Err(StoreError::Duplicate(code)) => {
                println!("{} (already shortened)", code.to_url(base_url))
            }
            Err(err) => return Err(err).context("can't shorten url"),
        },
        Command::Batch { user, items } => {
            let results = service
                .save_batch(user, items.clone())
                .await
                .context("can't shorten batch")?;
            for result in results {
                println!(
                    "{}\t{}",
                    result.correlation_id,
                    result.short_code.to_url(base_url)
                );
            }
        }
        Command::Resolve { code } => {
            let code = ShortCode::parse(code.as_str())?;
            let url = service.get(code.as_str()).await?;
            println!("{url}");
        }
        Command::List { user } => {
            for entry in service.get_by_user(user).await? {
                println!(
                    "{}\t{}",
                    entry.short_code.to_url(base_url),
                    entry.original_url
                );
            }
        }
        Command::Delete { user, codes, wait } => {
            let codes = codes
                .iter()
                .map(|code| ShortCode::parse(code.as_str()))
                .collect::<Result<Vec<_>, _>>()?;
            let count = codes.len();
            if *wait {
                service
                    .delete_and_wait(codes, user)
                    .await
                    .context("can't delete short codes")?;
                println!("deleted {count} short codes");
            } else {
                service.delete_async(codes, user)?;
                println!("accepted {count} delete requests");
            }
        }
        Command::Stats => {
            let stats = service.stats().await?;
            println!("urls\t{}", stats.urls);
            println!("users\t{}", stats.users);
        }
        Command::Ping => {
            if service.ping().await {
                println!("ok");
            } else {
                println!("unavailable");
            }
        }
    }

    Ok(())
}
