//! Reading a snapshot back.

use super::{log_failure, CachePersistenceStrategy};
use crate::codec::{CodecError, SnapshotCodec};
use crate::error::{IoOp, PersistError, PersistResult};
use std::fs::File;
use std::io::{self, BufReader};

impl<C> CachePersistenceStrategy<C> {
    /// Recover the cache from the snapshot file.
    ///
    /// Returns `None` when there is no snapshot. When the snapshot cannot be
    /// read or decoded the failure is logged, the file is deleted (best
    /// effort) and `None` is returned, so the caller can rebuild the cache.
    pub fn load<T>(&self) -> Option<T>
    where
        C: SnapshotCodec<T>,
    {
        match self.try_load() {
            Ok(Some(cache)) => {
                log::info!("Recovered cache from '{}'", self.path.display());
                Some(cache)
            }
            Ok(None) => {
                log::debug!("No cache file found at '{}'", self.path.display());
                None
            }
            Err(e) => {
                log_failure(&e);
                self.discard_corrupt();
                None
            }
        }
    }

    fn try_load<T>(&self) -> PersistResult<Option<T>>
    where
        C: SnapshotCodec<T>,
    {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistError::io(IoOp::Open, &self.path, e)),
        };

        log::debug!("Reading cache from '{}'", self.path.display());
        let mut reader = BufReader::new(file);
        match self.codec.decode(&mut reader) {
            Ok(cache) => Ok(Some(cache)),
            Err(CodecError::Io(e)) => Err(PersistError::io(IoOp::Read, &self.path, e)),
            Err(source) => Err(PersistError::Deserialize {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn discard_corrupt(&self) {
        match self.delete_file() {
            Ok(true) => log::warn!("Deleted unreadable cache file '{}'", self.path.display()),
            Ok(false) => {}
            Err(e) => log_failure(&e),
        }
    }
}
