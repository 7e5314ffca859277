//! Persistence configuration.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file
//! 3. Environment variables prefixed `CACHE_SNAPSHOT_`
//!
//! ```toml
//! directory = "/var/cache/capabilities"
//! replace_mode = "atomic"      # or "in_place"
//! sync_on_write = true
//! policy = "on_update"         # immediate | on_update | on_shutdown | never
//! schema_version = 3
//! ```

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::{EnvelopeCodec, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::directory::{DirectoryResolver, FixedDirectory, ProjectCacheDirectory};
use crate::error::PersistResult;
use crate::policy::PersistencePolicy;
use crate::strategy::{CachePersistenceStrategy, ReplaceMode};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "CACHE_SNAPSHOT_";

/// Settings for building a [`CachePersistenceStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory holding the snapshot. Platform cache directory when unset.
    pub directory: Option<PathBuf>,
    pub replace_mode: ReplaceMode,
    /// Flush snapshots to the device before reporting success.
    pub sync_on_write: bool,
    pub policy: PersistencePolicy,
    /// Snapshots written under another schema version are discarded.
    pub schema_version: u32,
    pub max_payload_bytes: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            directory: None,
            replace_mode: ReplaceMode::Atomic,
            sync_on_write: true,
            policy: PersistencePolicy::OnUpdate,
            schema_version: 1,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl PersistenceConfig {
    /// Load from defaults, an optional TOML file and the environment.
    ///
    /// Falls back to the defaults (with a warning) if the layers do not
    /// form a valid configuration.
    pub fn load_from_path(path: Option<&Path>) -> Self {
        match Self::try_load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load persistence config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    /// Like [`load_from_path`](Self::load_from_path), but reports errors.
    pub fn try_load_from_path(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: Self = figment
            .extract()
            .context("Invalid persistence configuration")?;
        log::debug!("Persistence config: {:?}", config);
        Ok(config)
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Resolver for the configured directory.
    pub fn resolver(&self) -> Box<dyn DirectoryResolver> {
        match &self.directory {
            Some(dir) => Box::new(FixedDirectory::new(dir)),
            None => Box::new(ProjectCacheDirectory::default()),
        }
    }

    pub fn codec(&self) -> EnvelopeCodec {
        EnvelopeCodec::new(self.schema_version).with_max_payload_bytes(self.max_payload_bytes)
    }

    /// Run `init` with everything this configuration describes.
    pub fn build_strategy(&self) -> PersistResult<CachePersistenceStrategy> {
        let strategy = CachePersistenceStrategy::init(self.resolver().as_ref(), self.codec())?
            .with_replace_mode(self.replace_mode)
            .with_sync_on_write(self.sync_on_write)
            .with_policy(self.policy);
        Ok(strategy)
    }
}
