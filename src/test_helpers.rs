//! Shared fixtures for unit tests that need a real repository root.

use camino::Utf8PathBuf;
use rstest::fixture;
use rusqlite::Connection;
use tempfile::TempDir;

use crate::instance::InstanceId;
use crate::repository::RepositoryStore;
use crate::session::{SyncController, SyncStartOutcome};
use crate::test_support::session_start;

/// Repository store rooted in a temporary directory removed on drop.
pub struct TempRepository {
    _tmp: TempDir,
    store: RepositoryStore,
}

impl TempRepository {
    /// Returns the store under test.
    pub const fn store(&self) -> &RepositoryStore {
        &self.store
    }

    /// Parses a test identifier.
    pub fn instance(&self, raw: &str) -> InstanceId {
        InstanceId::new(raw).unwrap_or_else(|err| panic!("test instance id: {err}"))
    }

    /// Starts a session and asserts it was recorded locally.
    pub fn start_session(&self, instance: &InstanceId, bid: i64, sync_time: i64) {
        let outcome =
            SyncController::local(&self.store).sync_start(instance, &session_start(bid, sync_time));
        assert_eq!(outcome, SyncStartOutcome::Recorded);
    }

    /// Runs raw SQL against an instance's repository file, bypassing the store.
    pub fn execute_sql(&self, instance: &InstanceId, sql: &str) {
        let conn = Connection::open(self.store.repository_path(instance).as_std_path())
            .unwrap_or_else(|err| panic!("open repository: {err}"));
        conn.execute_batch(sql)
            .unwrap_or_else(|err| panic!("execute {sql:?}: {err}"));
    }
}

/// Provides an empty repository root inside a fresh temporary directory.
#[fixture]
pub fn temp_repository() -> TempRepository {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().join("evidences"))
        .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
    TempRepository {
        _tmp: tmp,
        store: RepositoryStore::new(root),
    }
}
