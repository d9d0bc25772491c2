//! # File Journal
//!
//! Durable journal stored as JSON lines, one event per line.
//!
//! ## Guarantees
//!
//! - Each `append` is flushed with `sync_data` before returning.
//! - A failed `append` truncates the file back to its last committed length,
//!   so neither a torn line nor an unacknowledged event survives a restart.
//!   If the truncation itself fails, the journal refuses further appends
//!   until a retry of the truncation succeeds.
//! - The file is held under an exclusive `fs2` lock for the lifetime of the
//!   journal, so two engines can never write the same file.

use crate::domain::errors::JournalError;
use crate::ports::outbound::EventJournal;
use fs2::FileExt;
use shared_bus::RegistryEvent;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// JSON-lines event journal on disk.
#[derive(Debug)]
pub struct FileJournal {
    /// Append handle; also holds the lock.
    file: File,
    /// Journal location.
    path: PathBuf,
    /// Events currently in the file.
    entries: usize,
    /// Byte length of the file after the last acknowledged append.
    committed_len: u64,
    /// A failed append left bytes past `committed_len`.
    needs_rollback: bool,
}

impl FileJournal {
    /// Open (or create) the journal at `path` and lock it.
    ///
    /// # Errors
    ///
    /// - `JournalError::Locked` if another process holds the lock
    /// - `JournalError::Io` if the file cannot be created or read
    /// - `JournalError::Corrupt` if an existing line cannot be decoded
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| JournalError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .map_err(|source| JournalError::Io {
                path: path.clone(),
                source,
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(JournalError::Locked(path));
        }

        let entries = read_events(&path)?.len();
        let committed_len = file
            .metadata()
            .map_err(|source| JournalError::Io {
                path: path.clone(),
                source,
            })?
            .len();
        info!(path = %path.display(), entries, bytes = committed_len, "Opened file journal");

        Ok(Self {
            file,
            path,
            entries,
            committed_len,
            needs_rollback: false,
        })
    }

    /// Location of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the file to the last committed length.
    fn rollback(&mut self) -> Result<(), JournalError> {
        let io_err = |source| JournalError::Io {
            path: self.path.clone(),
            source,
        };
        self.file.set_len(self.committed_len).map_err(io_err)?;
        self.file.sync_data().map_err(io_err)?;
        self.needs_rollback = false;
        warn!(bytes = self.committed_len, "Journal rolled back to last commit");
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), JournalError> {
        let io_err = |source| JournalError::Io {
            path: self.path.clone(),
            source,
        };
        self.file.write_all(line).map_err(io_err)?;
        self.file.sync_data().map_err(io_err)
    }
}

impl EventJournal for FileJournal {
    fn load(&self) -> Result<Vec<RegistryEvent>, JournalError> {
        read_events(&self.path)
    }

    fn append(&mut self, event: &RegistryEvent) -> Result<(), JournalError> {
        let mut line =
            serde_json::to_string(event).map_err(|e| JournalError::Encode(e.to_string()))?;
        line.push('\n');

        if self.needs_rollback {
            self.rollback()?;
        }

        if let Err(err) = self.write_line(line.as_bytes()) {
            self.needs_rollback = true;
            if let Err(rollback_err) = self.rollback() {
                error!(error = %rollback_err, "Journal rollback failed");
            }
            return Err(err);
        }

        self.committed_len += line.len() as u64;
        self.entries += 1;
        debug!(entries = self.entries, kind = event.kind(), "Journal append");
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries
    }
}

impl Drop for FileJournal {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn read_events(path: &Path) -> Result<Vec<RegistryEvent>, JournalError> {
    let file = File::open(path).map_err(|source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| JournalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|e| JournalError::Corrupt {
            line: index + 1,
            reason: e.to_string(),
        })?;
        events.push(event);
    }
    Ok(events)
}
