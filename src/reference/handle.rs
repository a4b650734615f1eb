use std::path::Path;
use std::sync::{Arc, RwLock};

use super::snapshot::ReferenceSnapshot;
use super::ReferenceError;

/// Shared access to the current reference snapshot.
///
/// Readers clone the `Arc` and keep evaluating against it; a reload swaps in a
/// new snapshot only after it validated, so no evaluation ever sees a partial
/// table set.
pub struct ReferenceHandle {
    current: RwLock<Arc<ReferenceSnapshot>>,
}

impl ReferenceHandle {
    pub fn new(snapshot: ReferenceSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Result<Arc<ReferenceSnapshot>, ReferenceError> {
        let guard = self.current.read().map_err(|_| ReferenceError::LockFailed)?;
        Ok(Arc::clone(&guard))
    }

    pub fn replace(&self, snapshot: ReferenceSnapshot) -> Result<(), ReferenceError> {
        let mut guard = self.current.write().map_err(|_| ReferenceError::LockFailed)?;
        *guard = Arc::new(snapshot);
        Ok(())
    }

    /// Load and validate `dir`, then swap. On error the old snapshot stays.
    pub fn reload_from(&self, dir: &Path) -> Result<(), ReferenceError> {
        match ReferenceSnapshot::load(dir) {
            Ok(snapshot) => {
                self.replace(snapshot)?;
                tracing::info!(dir = %dir.display(), "Reference data reloaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Reference reload rejected");
                Err(e)
            }
        }
    }
}
