//! cache-snapshot - on-disk snapshots for rebuildable content caches
//!
//! Persists an in-memory cache to a single file so a restarting process can
//! recover it instead of rebuilding from slow backends. Failures never reach
//! the caller: a missing or corrupt snapshot simply means "rebuild".
//!
//! ```rust,no_run
//! use cache_snapshot::{CachePersistenceStrategy, EnvelopeCodec, FixedDirectory};
//! use std::collections::BTreeMap;
//!
//! let strategy = CachePersistenceStrategy::init(
//!     &FixedDirectory::new("/var/cache/capabilities"),
//!     EnvelopeCodec::new(1),
//! )?;
//!
//! let cache: BTreeMap<String, Vec<String>> = strategy.load().unwrap_or_default();
//! strategy.persist(Some(&cache));
//! # Ok::<(), cache_snapshot::PersistError>(())
//! ```

pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod policy;
pub mod strategy;

pub use codec::{CodecError, EnvelopeCodec, SnapshotCodec};
pub use config::PersistenceConfig;
pub use directory::{DirectoryResolver, FixedDirectory, ProjectCacheDirectory};
pub use error::{ErrorKind, IoOp, PersistError, PersistResult};
pub use policy::{LifecycleEvent, PersistencePolicy};
pub use strategy::{CachePersistenceStrategy, PersistOutcome, ReplaceMode, CACHE_FILE_NAME};
