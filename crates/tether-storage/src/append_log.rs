//! The durable log: one JSON [`UrlRecord`] per line, append only.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tether_core::{Result, StoreError, UrlRecord};
use tracing::{debug, info};

/// An open handle on the durable log file.
///
/// The file is opened with append, create and read access. Records are
/// only ever added at the end; nothing is rewritten in place.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    file: File,
}

impl AppendLog {
    /// Opens (or creates) the log at `path` and replays every line.
    ///
    /// Returns the handle together with the replayed records in file order.
    /// Any line that is not a valid record fails the whole open with
    /// [`StoreError::CorruptLog`]; a process must not start on an unreadable
    /// log. Blank lines are skipped.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<UrlRecord>)> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .read(true)
            .open(&path)
            .map_err(|e| StoreError::Log(format!("failed to open '{}': {e}", path.display())))?;

        let records = replay(&file)?;
        info!(path = %path.display(), records = records.len(), "replayed durable log");

        Ok((Self { path, file }, records))
    }

    /// Appends one record and flushes it to the OS before returning.
    pub fn append(&mut self, record: &UrlRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| StoreError::Log(format!("failed to encode record: {e}")))?;
        line.push(b'\n');

        self.file.write_all(&line)?;
        self.file.flush()?;

        debug!(code = %record.short_code, "appended record to durable log");
        Ok(())
    }

    /// Forces appended data down to the disk.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn replay(file: &File) -> Result<Vec<UrlRecord>> {
    let mut records = Vec::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| StoreError::CorruptLog {
            line: line_no,
            reason: e.to_string(),
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str::<UrlRecord>(&line).map_err(|e| {
            StoreError::CorruptLog {
                line: line_no,
                reason: e.to_string(),
            }
        })?;
        records.push(record);
    }

    Ok(records)
}
