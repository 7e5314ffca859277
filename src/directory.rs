//! Storage directory resolution.

use crate::error::{PersistError, PersistResult};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Supplies the base directory that holds the cache snapshot.
pub trait DirectoryResolver {
    /// Resolve the directory. Called once, from `init`.
    fn resolve(&self) -> PersistResult<PathBuf>;
}

/// A directory chosen by the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDirectory(PathBuf);

impl FixedDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl DirectoryResolver for FixedDirectory {
    fn resolve(&self) -> PersistResult<PathBuf> {
        Ok(self.0.clone())
    }
}

impl DirectoryResolver for PathBuf {
    fn resolve(&self) -> PersistResult<PathBuf> {
        Ok(self.clone())
    }
}

impl DirectoryResolver for &Path {
    fn resolve(&self) -> PersistResult<PathBuf> {
        Ok(self.to_path_buf())
    }
}

/// The platform cache directory for an application.
///
/// XDG cache home on Linux, `Library/Caches` on macOS, `AppData\Local` on
/// Windows, as reported by [`ProjectDirs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCacheDirectory {
    qualifier: String,
    organization: String,
    application: String,
}

impl ProjectCacheDirectory {
    pub fn new(
        qualifier: impl Into<String>,
        organization: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            qualifier: qualifier.into(),
            organization: organization.into(),
            application: application.into(),
        }
    }
}

impl Default for ProjectCacheDirectory {
    fn default() -> Self {
        Self::new("org", "cache-snapshot", "cache-snapshot")
    }
}

impl DirectoryResolver for ProjectCacheDirectory {
    fn resolve(&self) -> PersistResult<PathBuf> {
        let dirs = ProjectDirs::from(&self.qualifier, &self.organization, &self.application)
            .ok_or_else(|| {
                PersistError::DirectoryUnavailable(format!(
                    "no home directory to derive a cache directory for '{}'",
                    self.application
                ))
            })?;
        Ok(dirs.cache_dir().to_path_buf())
    }
}
