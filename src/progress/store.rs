//! Listening-progress persistence.
//!
//! One [`ProgressSnapshot`] is kept per `(user_id, document_id)`.  Stores keep
//! snapshots in write order so [`ProgressStore::read`] can hand them back
//! most-recent-first without relying on timestamp resolution.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ProgressSnapshot
// ---------------------------------------------------------------------------

/// How far a user got through a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub document_id: String,
    pub user_id: String,
    /// Logical speech-page count of the document.
    pub total_pages: usize,
    /// 1-indexed page the user reached.
    pub current_page: usize,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Snapshot stamped with the current time.  Stores restamp on save.
    pub fn new(
        document_id: impl Into<String>,
        user_id: impl Into<String>,
        total_pages: usize,
        current_page: usize,
        completed: bool,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            user_id: user_id.into(),
            total_pages,
            current_page,
            completed,
            updated_at: Utc::now(),
        }
    }

    /// Completed fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.completed {
            return 1.0;
        }
        if self.total_pages == 0 {
            return 0.0;
        }
        (self.current_page as f32 / self.total_pages as f32).clamp(0.0, 1.0)
    }

    fn same_key(&self, other: &ProgressSnapshot) -> bool {
        self.user_id == other.user_id && self.document_id == other.document_id
    }
}

/// Logical page index to resume `snapshot` at.
///
/// Starts over at 0 when the document was completed or when the stored page
/// no longer fits `total_pages` (e.g. the paginator ceiling changed).
pub fn resume_index(snapshot: &ProgressSnapshot, total_pages: usize) -> usize {
    if snapshot.completed || snapshot.current_page == 0 || snapshot.current_page > total_pages {
        return 0;
    }
    snapshot.current_page - 1
}

// ---------------------------------------------------------------------------
// ProgressError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("progress file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// ProgressStore trait
// ---------------------------------------------------------------------------

/// Where the player reports progress.
pub trait ProgressStore: Send + Sync {
    /// Upsert `snapshot` keyed by `(user_id, document_id)`, stamping it with
    /// the write time.
    fn save(&self, snapshot: ProgressSnapshot) -> Result<(), ProgressError>;

    /// All of `user_id`'s snapshots, most recently written first.
    fn read(&self, user_id: &str) -> Result<Vec<ProgressSnapshot>, ProgressError>;

    fn find(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<Option<ProgressSnapshot>, ProgressError> {
        Ok(self
            .read(user_id)?
            .into_iter()
            .find(|s| s.document_id == document_id))
    }
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ProgressStore>) {}
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Remove any snapshot with the same key and append the new one, stamped.
fn upsert(entries: &mut Vec<ProgressSnapshot>, mut snapshot: ProgressSnapshot) {
    snapshot.updated_at = Utc::now();
    entries.retain(|s| !s.same_key(&snapshot));
    entries.push(snapshot);
}

fn newest_first(entries: &[ProgressSnapshot], user_id: &str) -> Vec<ProgressSnapshot> {
    entries
        .iter()
        .rev()
        .filter(|s| s.user_id == user_id)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// MemoryProgressStore
// ---------------------------------------------------------------------------

/// In-memory store; used by tests and as a fallback when the progress file
/// cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    entries: Mutex<Vec<ProgressSnapshot>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots across all users.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressStore for MemoryProgressStore {
    fn save(&self, snapshot: ProgressSnapshot) -> Result<(), ProgressError> {
        upsert(&mut lock(&self.entries), snapshot);
        Ok(())
    }

    fn read(&self, user_id: &str) -> Result<Vec<ProgressSnapshot>, ProgressError> {
        Ok(newest_first(&lock(&self.entries), user_id))
    }
}

// ---------------------------------------------------------------------------
// JsonProgressStore
// ---------------------------------------------------------------------------

/// Snapshots persisted as a JSON array, rewritten on every save.
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    entries: Mutex<Vec<ProgressSnapshot>>,
}

impl JsonProgressStore {
    /// Open the store at `path`.  A missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProgressError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| ProgressError::Malformed {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(ProgressError::Io { path, source }),
        };
        log::debug!(
            "progress: opened {} ({} snapshots)",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &[ProgressSnapshot]) -> Result<(), ProgressError> {
        let io_err = |source| ProgressError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(entries).map_err(|source| {
            ProgressError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

impl ProgressStore for JsonProgressStore {
    fn save(&self, snapshot: ProgressSnapshot) -> Result<(), ProgressError> {
        let mut entries = lock(&self.entries);
        upsert(&mut entries, snapshot);
        self.persist(&entries)
    }

    fn read(&self, user_id: &str) -> Result<Vec<ProgressSnapshot>, ProgressError> {
        Ok(newest_first(&lock(&self.entries), user_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snap(doc: &str, user: &str, page: usize, total: usize) -> ProgressSnapshot {
        ProgressSnapshot::new(doc, user, total, page, false)
    }

    #[test]
    fn upsert_keeps_one_snapshot_per_user_and_document() {
        let store = MemoryProgressStore::new();
        store.save(snap("book.txt", "ayse", 1, 10)).unwrap();
        store.save(snap("book.txt", "ayse", 2, 10)).unwrap();
        store.save(snap("book.txt", "ayse", 3, 10)).unwrap();

        let all = store.read("ayse").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].current_page, 3);
    }

    #[test]
    fn read_is_most_recent_first_and_scoped_to_user() {
        let store = MemoryProgressStore::new();
        store.save(snap("a", "ayse", 1, 5)).unwrap();
        store.save(snap("b", "ayse", 1, 5)).unwrap();
        store.save(snap("c", "mehmet", 1, 5)).unwrap();
        store.save(snap("a", "ayse", 2, 5)).unwrap();

        let docs: Vec<_> = store
            .read("ayse")
            .unwrap()
            .into_iter()
            .map(|s| s.document_id)
            .collect();
        assert_eq!(docs, vec!["a", "b"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn find_returns_matching_snapshot() {
        let store = MemoryProgressStore::new();
        store.save(snap("a", "ayse", 4, 5)).unwrap();

        assert_eq!(store.find("ayse", "a").unwrap().unwrap().current_page, 4);
        assert!(store.find("ayse", "z").unwrap().is_none());
        assert!(store.find("mehmet", "a").unwrap().is_none());
    }

    #[test]
    fn json_store_round_trips_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("progress.json");

        let store = JsonProgressStore::open(&path).unwrap();
        store.save(snap("a", "ayse", 2, 7)).unwrap();
        store
            .save(ProgressSnapshot::new("b", "ayse", 3, 3, true))
            .unwrap();
        drop(store);

        let reopened = JsonProgressStore::open(&path).unwrap();
        let all = reopened.read("ayse").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].document_id, "b");
        assert!(all[0].completed);
        assert_eq!(all[1].current_page, 2);
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::open(dir.path().join("progress.json")).unwrap();
        assert!(store.read("anyone").unwrap().is_empty());
    }

    #[test]
    fn json_store_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonProgressStore::open(&path).unwrap_err();
        assert!(matches!(err, ProgressError::Malformed { .. }));
    }

    #[test]
    fn save_restamps_updated_at() {
        let store = MemoryProgressStore::new();
        let mut old = snap("a", "ayse", 1, 2);
        old.updated_at = DateTime::<Utc>::UNIX_EPOCH;
        store.save(old).unwrap();

        let saved = store.find("ayse", "a").unwrap().unwrap();
        assert!(saved.updated_at > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn resume_index_maps_pages() {
        assert_eq!(resume_index(&snap("a", "u", 4, 10), 10), 3);
        assert_eq!(resume_index(&snap("a", "u", 1, 10), 10), 0);
        // out of range after re-pagination
        assert_eq!(resume_index(&snap("a", "u", 12, 10), 8), 0);
        assert_eq!(resume_index(&snap("a", "u", 0, 10), 10), 0);
        let done = ProgressSnapshot::new("a", "u", 10, 10, true);
        assert_eq!(resume_index(&done, 10), 0);
    }

    #[test]
    fn fraction_is_bounded() {
        assert_eq!(snap("a", "u", 5, 10).fraction(), 0.5);
        assert_eq!(snap("a", "u", 0, 0).fraction(), 0.0);
        assert_eq!(ProgressSnapshot::new("a", "u", 10, 3, true).fraction(), 1.0);
    }
}
