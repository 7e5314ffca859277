//! When the lifecycle hooks write a snapshot.

use serde::{Deserialize, Serialize};

/// Lifecycle events reported by the cache controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Part of the cache was refreshed.
    PartialUpdate,
    /// The whole cache was rebuilt.
    CompleteUpdate,
    /// The process is shutting down.
    Shutdown,
}

/// Selects which lifecycle events result in a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Write on every update and on shutdown.
    Immediate,
    /// Write after complete updates and on shutdown.
    #[default]
    OnUpdate,
    /// Write only on shutdown.
    OnShutdown,
    /// Never write from a hook.
    Never,
}

impl PersistencePolicy {
    /// Whether `event` should produce a snapshot under this policy.
    #[must_use]
    pub fn should_persist(self, event: LifecycleEvent) -> bool {
        match (self, event) {
            (Self::Never, _) => false,
            (Self::Immediate, _) => true,
            (Self::OnUpdate, LifecycleEvent::PartialUpdate) => false,
            (Self::OnUpdate, _) => true,
            (Self::OnShutdown, LifecycleEvent::Shutdown) => true,
            (Self::OnShutdown, _) => false,
        }
    }
}
