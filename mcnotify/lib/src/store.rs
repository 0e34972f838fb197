//! Persistence of the last version a notification was sent for.
//!
//! The record is a single JSON object mirroring [`VersionDescriptor`]. An
//! absent, empty or unreadable record simply means "nothing seen yet".

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::types::VersionDescriptor;

/// Storage backend for the last-seen version.
pub trait VersionStore {
    /// Loads the last-seen version.
    ///
    /// Returns `None` when nothing usable has been stored; a damaged record
    /// is never an error.
    fn load(&self) -> Option<VersionDescriptor>;

    /// Replaces the stored version.
    ///
    /// ## Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    fn save(&self, version: &VersionDescriptor) -> Result<(), StoreError>;
}

/// JSON file holding the last-seen version.
///
/// Writes go to a temporary file in the same directory which then replaces
/// the record, so a crash mid-write never leaves a truncated file behind.
///
/// ## Examples
///
/// ```no_run
/// use mcnotify_lib::{JsonFileStore, VersionStore};
///
/// let store = JsonFileStore::new("version.json".into());
/// if let Some(version) = store.load() {
///     println!("last seen {}", version.id);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the path to the version file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl VersionStore for JsonFileStore {
    fn load(&self) -> Option<VersionDescriptor> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No version file");
                return None;
            }
        };

        if contents.trim().is_empty() {
            debug!(path = %self.path.display(), "Version file is empty");
            return None;
        }

        let value: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Version file is not valid JSON");
                return None;
            }
        };

        if value.as_object().is_some_and(|object| object.is_empty()) {
            debug!(path = %self.path.display(), "Version file holds no version");
            return None;
        }

        match serde_json::from_value(value) {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Version file is malformed");
                None
            }
        }
    }

    fn save(&self, version: &VersionDescriptor) -> Result<(), StoreError> {
        let directory = self.directory();
        std::fs::create_dir_all(directory)?;

        let mut file = NamedTempFile::new_in(directory)?;
        serde_json::to_writer_pretty(&mut file, version)?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.persist(&self.path)?;

        debug!(path = %self.path.display(), id = %version.id, "Saved version");
        Ok(())
    }
}
