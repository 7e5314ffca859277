//! Writing and replacing the snapshot.

use super::{log_failure, CachePersistenceStrategy, PersistOutcome, ReplaceMode};
use crate::codec::{CodecError, SnapshotCodec};
use crate::error::{IoOp, PersistError, PersistResult};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

impl<C> CachePersistenceStrategy<C> {
    /// Replace the snapshot with `cache`, or clear it when `cache` is `None`.
    ///
    /// Never fails: errors are logged and reported as
    /// [`PersistOutcome::Aborted`]. See [`ReplaceMode`] for what an aborted
    /// write leaves on disk.
    pub fn persist<T>(&self, cache: Option<&T>) -> PersistOutcome
    where
        C: SnapshotCodec<T>,
    {
        let result = match cache {
            None => self.delete_file().map(|deleted| {
                if deleted {
                    log::debug!("Cleared cache file '{}'", self.path.display());
                }
                PersistOutcome::Cleared
            }),
            Some(cache) => match self.replace_mode {
                ReplaceMode::Atomic => self.write_atomic(cache),
                ReplaceMode::InPlace => self.write_in_place(cache),
            }
            .map(|()| PersistOutcome::Written),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log_failure(&e);
                PersistOutcome::Aborted
            }
        }
    }

    fn write_in_place<T>(&self, cache: &T) -> PersistResult<()>
    where
        C: SnapshotCodec<T>,
    {
        // A stale snapshot that cannot be deleted stays; nothing new is written
        self.delete_file()?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| PersistError::io(IoOp::Create, &self.path, e))?;

        log::debug!("Serializing cache to '{}'", self.path.display());
        self.encode_into(cache, file, &self.path)?;
        self.sync_parent()
    }

    fn write_atomic<T>(&self, cache: &T) -> PersistResult<()>
    where
        C: SnapshotCodec<T>,
    {
        let dir = self.parent_dir();
        let prefix = match self.path.file_name() {
            Some(name) => format!(".{}.", name.to_string_lossy()),
            None => ".snapshot.".to_string(),
        };

        // Dropping the temporary file on any early return removes it
        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(dir)
            .map_err(|e| PersistError::io(IoOp::Create, dir, e))?;
        let temp_path = temp.path().to_path_buf();

        log::debug!(
            "Serializing cache to '{}' via '{}'",
            self.path.display(),
            temp_path.display()
        );
        let file = temp
            .as_file()
            .try_clone()
            .map_err(|e| PersistError::io(IoOp::Open, &temp_path, e))?;
        self.encode_into(cache, file, &temp_path)?;

        temp.persist(&self.path)
            .map_err(|e| PersistError::io(IoOp::Rename, &self.path, e.error))?;
        self.sync_parent()
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Flush the directory entry of a newly created or renamed snapshot.
    fn sync_parent(&self) -> PersistResult<()> {
        if !self.sync_on_write {
            return Ok(());
        }
        let dir = self.parent_dir();
        sync_dir(dir).map_err(|e| PersistError::io(IoOp::Sync, dir, e))
    }

    fn encode_into<T>(&self, cache: &T, file: File, path: &Path) -> PersistResult<()>
    where
        C: SnapshotCodec<T>,
    {
        let mut writer = BufWriter::new(file);
        self.codec
            .encode(cache, &mut writer)
            .map_err(|source| encode_error(path, source))?;
        writer
            .flush()
            .map_err(|e| PersistError::io(IoOp::Write, path, e))?;

        if self.sync_on_write {
            let file = writer
                .into_inner()
                .map_err(|e| PersistError::io(IoOp::Write, path, e.into_error()))?;
            file.sync_all()
                .map_err(|e| PersistError::io(IoOp::Sync, path, e))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

// Only Unix lets a directory be opened for syncing
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn encode_error(path: &Path, source: CodecError) -> PersistError {
    match source {
        CodecError::Io(e) => PersistError::io(IoOp::Write, path, e),
        source => PersistError::Serialize {
            path: path.to_path_buf(),
            source,
        },
    }
}
