use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use super::domain::AwardCollection;

/// Error enumeration for snapshot storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot is not a valid award list: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("snapshot storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable byte storage for the award snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Returns `None` when no snapshot has been written yet.
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError>;
    /// Replaces the snapshot. On failure the previous snapshot must survive.
    fn write(&self, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Snapshot kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "awards.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }

        // Stage next to the target so the rename stays on one filesystem.
        let staging = self.staging_path();
        let staged = fs::File::create(&staging).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(err) = staged.and_then(|_| fs::rename(&staging, &self.path)) {
            let _ = fs::remove_file(&staging);
            return Err(self.io_error(err));
        }
        Ok(())
    }
}

/// Result of reading the snapshot at startup. Every variant yields a usable
/// collection; the failures only tell the caller what to warn about.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(AwardCollection),
    Missing,
    Unreadable(StoreError),
}

impl LoadOutcome {
    pub fn into_collection(self) -> AwardCollection {
        match self {
            LoadOutcome::Loaded(collection) => collection,
            LoadOutcome::Missing | LoadOutcome::Unreadable(_) => AwardCollection::default(),
        }
    }
}

/// Serializes the award collection to and from a [`SnapshotStore`].
#[derive(Debug)]
pub struct AwardStore<S> {
    backend: S,
}

impl<S: SnapshotStore> AwardStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn load(&self) -> LoadOutcome {
        let bytes = match self.backend.load() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::Missing,
            Err(err) => return LoadOutcome::Unreadable(err),
        };

        match serde_json::from_slice::<AwardCollection>(&bytes) {
            Ok(collection) => LoadOutcome::Loaded(collection),
            Err(err) => LoadOutcome::Unreadable(StoreError::Malformed(err)),
        }
    }

    /// Writes the whole collection, pretty printed with two-space indentation.
    pub fn persist(&self, collection: &AwardCollection) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(collection)?;
        bytes.push(b'\n');
        self.backend.write(&bytes)
    }
}
