//! Live configuration manager.
//!
//! Holds the published configuration snapshot behind a reader/writer lock:
//! many concurrent readers, infrequent writer reloads. A reload re-parses
//! and re-validates off-lock and only takes the write lock for the pointer
//! swap, so readers are never blocked on file I/O. A failed reload leaves
//! the previously published snapshot untouched.

use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::config::schema::Config;
use crate::error::{HerderError, Result};

/// Thread-safe holder of the live configuration snapshot.
///
/// State machine: Uninitialized -> Live (via [`ConfigManager::load`]).
/// Snapshots returned by [`ConfigManager::get`] are immutable; mutating a
/// clone never affects the live one.
#[derive(Debug, Default)]
pub struct ConfigManager {
    current: RwLock<Option<Arc<Config>>>,
}

impl ConfigManager {
    /// Create an uninitialized manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a configuration file, then publish it.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Config>> {
        let config = Arc::new(Config::load_from_file(path)?);
        *self.write_slot()? = Some(Arc::clone(&config));
        log::info!("Configuration loaded");
        Ok(config)
    }

    /// Re-parse, re-validate, and atomically swap the published snapshot.
    ///
    /// Parsing and validation happen before any lock is taken. Fields fixed
    /// for the process lifetime are checked against the live snapshot; on
    /// any failure the live snapshot stays published.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<Arc<Config>> {
        let next = Config::load_from_file(path)?;
        let current = self.read_slot()?.clone();
        validate_runtime_compat(current.as_deref(), Some(&next))?;

        let next = Arc::new(next);
        *self.write_slot()? = Some(Arc::clone(&next));
        log::info!("Configuration reloaded");
        Ok(next)
    }

    /// The live snapshot. Safe to read without further synchronization.
    pub fn get(&self) -> Result<Arc<Config>> {
        self.read_slot()?.clone().ok_or(HerderError::ConfigNotLoaded)
    }

    /// True once a configuration has been published.
    pub fn is_live(&self) -> bool {
        self.read_slot().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn read_slot(&self) -> Result<std::sync::RwLockReadGuard<'_, Option<Arc<Config>>>> {
        self.current
            .read()
            .map_err(|e| HerderError::Config(format!("config lock poisoned: {e}")))
    }

    fn write_slot(&self) -> Result<std::sync::RwLockWriteGuard<'_, Option<Arc<Config>>>> {
        self.current
            .write()
            .map_err(|e| HerderError::Config(format!("config lock poisoned: {e}")))
    }
}

/// Reject a reload whose process-lifetime fields differ from the running
/// configuration.
///
/// Only `state-db` and `api.bind` are fixed; everything else may change
/// freely. String comparison is whitespace-normalized. A missing
/// configuration on either side is invalid input, not "no constraint".
pub fn validate_runtime_compat(current: Option<&Config>, next: Option<&Config>) -> Result<()> {
    let (current, next) = match (current, next) {
        (Some(c), Some(n)) => (c, n),
        _ => {
            return Err(HerderError::RuntimeCompat(
                "both current and next configuration are required".to_string(),
            ));
        }
    };

    if current.state_db.trim() != next.state_db.trim() {
        return Err(HerderError::RuntimeCompat(format!(
            "state-db may not change across a reload ('{}' -> '{}')",
            current.state_db.trim(),
            next.state_db.trim()
        )));
    }
    if current.api.bind.trim() != next.api.bind.trim() {
        return Err(HerderError::RuntimeCompat(format!(
            "api.bind may not change across a reload ('{}' -> '{}')",
            current.api.bind.trim(),
            next.api.bind.trim()
        )));
    }
    Ok(())
}
