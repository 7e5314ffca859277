//! Cache persistence strategy.
//!
//! A [`CachePersistenceStrategy`] owns the location of a single snapshot
//! file and exposes the operations a cache controller needs across process
//! restarts:
//!
//! * [`init`](CachePersistenceStrategy::init): resolve and fix the path.
//! * [`load`](CachePersistenceStrategy::load): recover a previous snapshot.
//! * [`persist`](CachePersistenceStrategy::persist): replace or clear it.
//! * [`remove`](CachePersistenceStrategy::remove): delete it.
//!
//! # Failure containment
//!
//! The snapshot is an optimization. Apart from `init`, no operation returns
//! an error: failures are logged with their path and operation and turned
//! into a fallback (`None` from `load`, [`PersistOutcome::Aborted`] from
//! `persist`). A snapshot that fails to decode is deleted so the next start
//! does not trip over it again.
//!
//! # Concurrency
//!
//! There is no internal locking. The owner must not run two operations on
//! the same path at the same time.
//!
//! # Architecture
//!
//! * [`load`]: reading and self-healing.
//! * [`persist`]: in-place and atomic replacement.

pub mod load;
pub mod persist;

use crate::codec::{EnvelopeCodec, SnapshotCodec};
use crate::directory::DirectoryResolver;
use crate::error::{PersistError, PersistResult};
use crate::policy::{LifecycleEvent, PersistencePolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the snapshot inside the resolved directory.
pub const CACHE_FILE_NAME: &str = "cache.tmp";

/// How `persist` replaces an existing snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// Write a temporary sibling and rename it over the snapshot.
    ///
    /// A failed write leaves the previous snapshot untouched.
    #[default]
    Atomic,
    /// Delete the snapshot, create a new file and write into it.
    ///
    /// A failed write leaves either no file or a truncated one, which the
    /// next `load` detects and removes.
    InPlace,
}

/// What a call to `persist` or one of the lifecycle hooks did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// A new snapshot was written.
    Written,
    /// No cache was supplied and any existing snapshot was deleted.
    Cleared,
    /// The policy does not persist on this event.
    Skipped,
    /// The operation failed and was logged.
    Aborted,
}

/// Persists a cache snapshot at a single, fixed path.
#[derive(Debug, Clone)]
pub struct CachePersistenceStrategy<C = EnvelopeCodec> {
    path: PathBuf,
    codec: C,
    replace_mode: ReplaceMode,
    sync_on_write: bool,
    policy: PersistencePolicy,
}

impl<C> CachePersistenceStrategy<C> {
    /// Resolve the storage directory and fix the snapshot path.
    ///
    /// The directory is created if missing and the path is made absolute.
    /// Every call resolves again and returns an independent strategy; there
    /// is no shared state between them.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::DirectoryUnavailable`] when the resolver fails
    /// or the directory cannot be created. Hosts usually log this and run
    /// without persistence.
    pub fn init<R>(resolver: &R, codec: C) -> PersistResult<Self>
    where
        R: DirectoryResolver + ?Sized,
    {
        let dir = resolver.resolve()?;
        let dir = std::path::absolute(&dir).map_err(|e| {
            PersistError::DirectoryUnavailable(format!(
                "cannot make '{}' absolute: {}",
                dir.display(),
                e
            ))
        })?;
        fs::create_dir_all(&dir).map_err(|e| {
            PersistError::DirectoryUnavailable(format!(
                "cannot create '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let path = dir.join(CACHE_FILE_NAME);
        log::debug!("Cache snapshot location: '{}'", path.display());
        Ok(Self::with_path(path, codec))
    }

    /// Build a strategy for an explicit snapshot path.
    ///
    /// A relative path is resolved against the current directory now, so a
    /// later directory change does not move the snapshot. The path is kept
    /// as given only if it cannot be made absolute.
    pub fn with_path(path: impl Into<PathBuf>, codec: C) -> Self {
        let path = path.into();
        Self {
            path: std::path::absolute(&path).unwrap_or(path),
            codec,
            replace_mode: ReplaceMode::default(),
            sync_on_write: true,
            policy: PersistencePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_replace_mode(mut self, mode: ReplaceMode) -> Self {
        self.replace_mode = mode;
        self
    }

    /// Whether `persist` syncs the snapshot and its directory entry to the
    /// device before returning.
    #[must_use]
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PersistencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Absolute path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    #[must_use]
    pub fn replace_mode(&self) -> ReplaceMode {
        self.replace_mode
    }

    #[must_use]
    pub fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    /// Delete the snapshot if present. Failures are logged only.
    pub fn remove(&self) {
        match self.delete_file() {
            Ok(true) => log::debug!("Removed cache file '{}'", self.path.display()),
            Ok(false) => log::trace!("No cache file to remove at '{}'", self.path.display()),
            Err(e) => log_failure(&e),
        }
    }

    /// Returns whether a file was actually deleted.
    fn delete_file(&self) -> PersistResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(PersistError::Delete {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Lifecycle hooks, filtered through the configured [`PersistencePolicy`].
impl<C> CachePersistenceStrategy<C> {
    pub fn persist_on_partial_update<T>(&self, cache: &T) -> PersistOutcome
    where
        C: SnapshotCodec<T>,
    {
        self.persist_on(LifecycleEvent::PartialUpdate, cache)
    }

    pub fn persist_on_complete_update<T>(&self, cache: &T) -> PersistOutcome
    where
        C: SnapshotCodec<T>,
    {
        self.persist_on(LifecycleEvent::CompleteUpdate, cache)
    }

    pub fn persist_on_shutdown<T>(&self, cache: &T) -> PersistOutcome
    where
        C: SnapshotCodec<T>,
    {
        self.persist_on(LifecycleEvent::Shutdown, cache)
    }

    /// Persist `cache` if the policy asks for it on `event`.
    pub fn persist_on<T>(&self, event: LifecycleEvent, cache: &T) -> PersistOutcome
    where
        C: SnapshotCodec<T>,
    {
        if !self.policy.should_persist(event) {
            log::trace!(
                "Skipping cache persistence on {:?} ({:?} policy)",
                event,
                self.policy
            );
            return PersistOutcome::Skipped;
        }

        let outcome = self.persist(Some(cache));
        if outcome == PersistOutcome::Aborted && event == LifecycleEvent::Shutdown {
            log::warn!(
                "Cache was not persisted on shutdown; it will be rebuilt on next start"
            );
        }
        outcome
    }
}

pub(crate) fn log_failure(err: &PersistError) {
    log::error!("[{}] {}", err.kind().code_prefix(), err);
}
