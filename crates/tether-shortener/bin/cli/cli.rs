use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tether_core::BatchItem;

pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FLUSH_INTERVAL_ENV: &str = "TETHER_FLUSH_INTERVAL_MS";
pub const FLUSH_THRESHOLD_ENV: &str = "TETHER_FLUSH_THRESHOLD";
pub const LOG_FORMAT_ENV: &str = "TETHER_LOG_FORMAT";

pub const DEFAULT_FILE_STORAGE_PATH: &str = "urls.json";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FLUSH_INTERVAL_MS: &str = "5000";
pub const DEFAULT_FLUSH_THRESHOLD: &str = "10";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tether-shortener")]
pub struct CLI {
    #[arg(
        long,
        global = true,
        env = FILE_STORAGE_PATH_ENV,
        default_value = DEFAULT_FILE_STORAGE_PATH,
    )]
    pub file_storage_path: PathBuf,

    /// Without a DSN the shortener runs in file-only mode.
    #[arg(long, global = true, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        global = true,
        env = FLUSH_INTERVAL_ENV,
        default_value = DEFAULT_FLUSH_INTERVAL_MS,
    )]
    pub flush_interval_ms: u64,

    #[arg(
        long,
        global = true,
        env = FLUSH_THRESHOLD_ENV,
        default_value = DEFAULT_FLUSH_THRESHOLD,
    )]
    pub flush_threshold: usize,

    #[arg(
        long,
        global = true,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten one URL.
    Shorten {
        url: String,
        #[arg(long)]
        user: String,
    },
    /// Shorten several URLs atomically. Items are `correlation_id=url`.
    Batch {
        #[arg(long)]
        user: String,
        #[arg(required = true, value_parser = parse_batch_item)]
        items: Vec<BatchItem>,
    },
    /// Print the URL behind a short code.
    Resolve { code: String },
    /// List the URLs a user has shortened.
    List {
        #[arg(long)]
        user: String,
    },
    /// Tombstone short codes owned by a user.
    Delete {
        #[arg(long)]
        user: String,
        #[arg(required = true)]
        codes: Vec<String>,
        /// Commit before exiting and report a failed commit.
        #[arg(long)]
        wait: bool,
    },
    /// Count distinct URLs and users.
    Stats,
    /// Check the relational backend.
    Ping,
}

fn parse_batch_item(raw: &str) -> Result<BatchItem, String> {
    let (correlation_id, original_url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected correlation_id=url, got {raw:?}"))?;
    if correlation_id.is_empty() || original_url.is_empty() {
        return Err(format!("expected correlation_id=url, got {raw:?}"));
    }
    Ok(BatchItem {
        correlation_id: correlation_id.to_string(),
        original_url: original_url.to_string(),
    })
}
