use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ArchiverError;

/// Marker-file mutual exclusion over a destination directory. Presence of the
/// marker means an archival run is in progress. This guards against
/// overlapping runs by a single operator, not against true distributed races.
#[derive(Debug, Clone)]
pub struct RunLock {
    path: Utf8PathBuf,
}

impl RunLock {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Creates the marker and returns `true`, or returns `false` if the
    /// marker already exists. `create_new` makes the existence check and the
    /// creation a single filesystem operation.
    pub fn acquire(&self) -> Result<bool, ArchiverError> {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path.as_std_path())
        {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(ArchiverError::Filesystem(format!(
                "create lock {}: {err}",
                self.path
            ))),
        }
    }

    /// Removes the marker. Removing an already-absent marker is not an error.
    pub fn release(&self) -> Result<(), ArchiverError> {
        match fs::remove_file(self.path.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ArchiverError::Filesystem(format!(
                "remove lock {}: {err}",
                self.path
            ))),
        }
    }

    /// Operator override for a marker left behind by a crashed run. Callable
    /// before any acquisition is attempted.
    pub fn force_break(&self) -> Result<(), ArchiverError> {
        tracing::debug!(path = %self.path, "breaking lock marker");
        self.release()
    }
}
