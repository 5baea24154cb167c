//! Shared repository fixtures for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared helpers under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/fixtures.rs"]
//! mod fixtures;
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use evidence_collector::test_support::session_start;
use evidence_collector::{EvidenceLog, InstanceId, RepositoryStore, SyncController, SyncStartOutcome};
use tempfile::TempDir;

/// Temporary repository root removed on drop.
#[derive(Debug)]
pub struct RepoRoot {
    _tmp: TempDir,
    root: Utf8PathBuf,
}

impl RepoRoot {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = Utf8PathBuf::from_path_buf(tmp.path().join("evidences"))
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
        Self { _tmp: tmp, root }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    pub fn store(&self) -> RepositoryStore {
        RepositoryStore::new(self.root.clone())
    }
}

pub fn instance(raw: &str) -> InstanceId {
    InstanceId::new(raw).unwrap_or_else(|err| panic!("test instance id: {err}"))
}

/// Starts a session for `raw` and appends one payload per entry in `sizes`.
pub fn seed_instance(store: &RepositoryStore, raw: &str, sync_time: i64, sizes: &[u64]) -> InstanceId {
    let id = instance(raw);
    let outcome = SyncController::local(store).sync_start(&id, &session_start(1, sync_time));
    assert_eq!(outcome, SyncStartOutcome::Recorded);
    let log = EvidenceLog::new(store);
    for size in sizes {
        log.append(&id, *size, b"payload")
            .unwrap_or_else(|err| panic!("append: {err}"));
    }
    id
}
