//! Per-instance evidence repositories backed by `SQLite`.
//!
//! Every instance owns one database file named after its identifier under
//! the repository root. Each file carries two tables:
//!
//! - `info`: a single row describing the latest session (see
//!   [`InfoRecord`]).
//! - `evidences`: the append-only payload log (see [`EvidenceRecord`]).
//!
//! Connections are opened and dropped within a single call. Calls that touch
//! the same instance are serialised by an instance-scoped mutex held for the
//! duration of that call only; different instances never contend.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::CollectorConfig;
use crate::instance::{InstanceId, is_side_file_name};

mod types;

pub use types::{EvidenceRecord, InfoRecord, SessionStart, SyncStatus};

/// Busy timeout applied when none is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS info (bid INT,
                                      build CHAR(16),
                                      instance CHAR(40),
                                      subtype CHAR(16),
                                      version INT,
                                      user CHAR(256),
                                      device CHAR(256),
                                      source CHAR(256),
                                      sync_time INT,
                                      sync_status INT)",
    "CREATE TABLE IF NOT EXISTS evidences (id INTEGER PRIMARY KEY ASC,
                                           size INT,
                                           content BLOB)",
];

const SELECT_INFO: &str = "SELECT bid, build, instance, subtype, version, user, device, source,
                                  sync_time, sync_status
                           FROM info LIMIT 1";

/// Errors raised by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Raised when the repository file or its schema cannot be created.
    #[error("failed to create repository {path}: {message}")]
    Creation {
        /// Repository file that could not be created.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when an operation targets an instance without a repository.
    #[error("no repository for instance {instance}")]
    NoRepository {
        /// Instance that has no repository.
        instance: InstanceId,
    },
    /// Raised when reading or writing an existing repository fails.
    #[error("repository {path} failed: {message}")]
    Persistence {
        /// Repository file that failed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when an evidence size cannot be stored as a signed 64-bit
    /// integer.
    #[error("evidence size {size} exceeds the storable range")]
    SizeOutOfRange {
        /// Rejected size.
        size: u64,
    },
    /// Raised when the repository root cannot be enumerated.
    #[error("failed to scan repository root {path}: {message}")]
    ScanRoot {
        /// Repository root directory.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Owns the repository root and hands out serialised access per instance.
///
/// Construct one store per process and share it by reference (or `Arc`)
/// between the session controller, the evidence log, and the reporter.
#[derive(Debug)]
pub struct RepositoryStore {
    root: Utf8PathBuf,
    busy_timeout: Duration,
    locks: Mutex<HashMap<InstanceId, Arc<Mutex<()>>>>,
}

impl RepositoryStore {
    /// Creates a store rooted at `root`. The directory is created lazily by
    /// [`Self::ensure_created`].
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a store from loaded configuration.
    #[must_use]
    pub fn from_config(config: &CollectorConfig) -> Self {
        Self::new(config.repo_dir()).with_busy_timeout(config.busy_timeout())
    }

    /// Overrides the `SQLite` busy timeout used for every connection.
    #[must_use]
    pub const fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Returns the repository root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the path of the repository file for `instance`.
    #[must_use]
    pub fn repository_path(&self, instance: &InstanceId) -> Utf8PathBuf {
        self.root.join(instance.as_str())
    }

    /// Creates the repository file and both tables when absent.
    ///
    /// Safe to call repeatedly. Failures are logged and reported as `false`;
    /// they never propagate.
    #[must_use]
    pub fn ensure_created(&self, instance: &InstanceId) -> bool {
        match self.create(instance) {
            Ok(()) => true,
            Err(err) => {
                error!(%instance, error = %err, "cannot create repository");
                false
            }
        }
    }

    /// Returns whether a repository file exists for `instance`.
    #[must_use]
    pub fn exists(&self, instance: &InstanceId) -> bool {
        match self.try_exists(instance) {
            Ok(found) => found,
            Err(err) => {
                warn!(%instance, error = %err, "cannot check repository existence");
                false
            }
        }
    }

    /// Reads the `info` row of `instance`, if one has been written.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NoRepository`] when the repository does not
    /// exist and [`RepositoryError::Persistence`] when the read fails.
    pub fn info(&self, instance: &InstanceId) -> Result<Option<InfoRecord>, RepositoryError> {
        self.with_connection(instance, |conn| {
            conn.query_row(SELECT_INFO, [], |row| {
                Ok(InfoRecord {
                    bid: row.get(0)?,
                    build: row.get(1)?,
                    instance: row.get(2)?,
                    subtype: row.get(3)?,
                    version: row.get(4)?,
                    user: row.get(5)?,
                    device: row.get(6)?,
                    source: row.get(7)?,
                    sync_time: row.get(8)?,
                    sync_status: row.get(9)?,
                })
            })
            .optional()
        })
    }

    /// Returns the declared sizes of all evidence rows in insertion order.
    ///
    /// Payload content is not read.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NoRepository`] when the repository does not
    /// exist and [`RepositoryError::Persistence`] when the read fails.
    pub fn evidence_sizes(&self, instance: &InstanceId) -> Result<Vec<u64>, RepositoryError> {
        let raw = self.with_connection(instance, |conn| {
            let mut stmt = conn.prepare("SELECT size FROM evidences ORDER BY id ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        raw.into_iter()
            .map(|size| {
                u64::try_from(size).map_err(|_| RepositoryError::Persistence {
                    path: self.repository_path(instance),
                    message: format!("negative evidence size {size}"),
                })
            })
            .collect()
    }

    /// Returns every evidence row, payloads included, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NoRepository`] when the repository does not
    /// exist and [`RepositoryError::Persistence`] when the read fails.
    pub fn evidences(&self, instance: &InstanceId) -> Result<Vec<EvidenceRecord>, RepositoryError> {
        let raw = self.with_connection(instance, |conn| {
            let mut stmt = conn.prepare("SELECT id, size, content FROM evidences ORDER BY id ASC")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        raw.into_iter()
            .map(|(id, size, content)| {
                let declared = u64::try_from(size).map_err(|_| RepositoryError::Persistence {
                    path: self.repository_path(instance),
                    message: format!("negative evidence size {size}"),
                })?;
                Ok(EvidenceRecord {
                    id,
                    size: declared,
                    content,
                })
            })
            .collect()
    }

    /// Lists the instances that have a repository file under the root,
    /// sorted by identifier.
    ///
    /// A missing root yields an empty list. Entries that are not regular
    /// files, are `SQLite` side files, or are not valid identifiers are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ScanRoot`] when the root exists but cannot
    /// be read.
    pub fn list_instances(&self) -> Result<Vec<InstanceId>, RepositoryError> {
        let dir = match Dir::open_ambient_dir(&self.root, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.scan_error(&err)),
        };

        let mut instances = Vec::new();
        for item in dir.entries().map_err(|err| self.scan_error(&err))? {
            let entry = item.map_err(|err| self.scan_error(&err))?;
            let name = match entry.file_name() {
                Ok(name) => name,
                Err(err) => {
                    debug!(root = %self.root, error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let is_file = entry.file_type().is_ok_and(|kind| kind.is_file());
            if !is_file || is_side_file_name(&name) {
                continue;
            }
            match InstanceId::new(name.clone()) {
                Ok(instance) => instances.push(instance),
                Err(err) => debug!(root = %self.root, %name, error = %err, "skipping entry"),
            }
        }
        instances.sort();
        Ok(instances)
    }

    /// Replaces the `info` row wholesale inside one transaction.
    pub(crate) fn replace_info(
        &self,
        instance: &InstanceId,
        record: &InfoRecord,
    ) -> Result<(), RepositoryError> {
        self.with_connection(instance, |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM info", [])?;
            tx.execute(
                "INSERT INTO info (bid, build, instance, subtype, version, user, device, source,
                                   sync_time, sync_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.bid,
                    record.build,
                    record.instance,
                    record.subtype,
                    record.version,
                    record.user,
                    record.device,
                    record.source,
                    record.sync_time,
                    record.sync_status,
                ],
            )?;
            tx.commit()
        })
    }

    /// Sets `sync_status` on the row owned by `bid`, optionally only when the
    /// current status equals `only_from`. Returns the number of rows changed.
    pub(crate) fn update_status(
        &self,
        instance: &InstanceId,
        bid: i64,
        status: SyncStatus,
        only_from: Option<SyncStatus>,
    ) -> Result<usize, RepositoryError> {
        self.with_connection(instance, |conn| match only_from {
            Some(current) => conn.execute(
                "UPDATE info SET sync_status = ?1 WHERE bid = ?2 AND sync_status = ?3",
                params![status, bid, current],
            ),
            None => conn.execute(
                "UPDATE info SET sync_status = ?1 WHERE bid = ?2",
                params![status, bid],
            ),
        })
    }

    /// Appends one evidence row and returns its identifier.
    pub(crate) fn insert_evidence(
        &self,
        instance: &InstanceId,
        size: u64,
        content: &[u8],
    ) -> Result<i64, RepositoryError> {
        let stored_size = i64::try_from(size).map_err(|_| RepositoryError::SizeOutOfRange { size })?;
        self.with_connection(instance, |conn| {
            conn.execute(
                "INSERT INTO evidences (size, content) VALUES (?1, ?2)",
                params![stored_size, content],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn create(&self, instance: &InstanceId) -> Result<(), RepositoryError> {
        let path = self.repository_path(instance);
        Dir::create_ambient_dir_all(&self.root, ambient_authority()).map_err(|err| {
            RepositoryError::Creation {
                path: self.root.clone(),
                message: err.to_string(),
            }
        })?;

        info!(%instance, %path, "creating repository");

        let lock = self.instance_lock(instance);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = self
            .open(&path, OpenFlags::SQLITE_OPEN_CREATE)
            .map_err(|err| RepositoryError::Creation {
                path: path.clone(),
                message: err.to_string(),
            })?;
        for statement in SCHEMA {
            conn.execute(statement, [])
                .map_err(|err| RepositoryError::Creation {
                    path: path.clone(),
                    message: err.to_string(),
                })?;
        }
        Ok(())
    }

    fn try_exists(&self, instance: &InstanceId) -> io::Result<bool> {
        match Dir::open_ambient_dir(&self.root, ambient_authority()) {
            Ok(dir) => dir.try_exists(instance.as_str()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn with_connection<T, F>(&self, instance: &InstanceId, op: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
    {
        // Repositories are never removed, so a file seen here stays present
        // once the lock is held. Missing ids never get a lock entry.
        if !self.exists(instance) {
            return Err(RepositoryError::NoRepository {
                instance: instance.clone(),
            });
        }

        let lock = self.instance_lock(instance);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.repository_path(instance);
        let persistence = |err: rusqlite::Error| RepositoryError::Persistence {
            path: path.clone(),
            message: err.to_string(),
        };
        let mut conn = self.open(&path, OpenFlags::empty()).map_err(persistence)?;
        op(&mut conn).map_err(persistence)
    }

    fn open(&self, path: &Utf8Path, extra: OpenFlags) -> rusqlite::Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX | extra;
        let conn = Connection::open_with_flags(path.as_std_path(), flags)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn instance_lock(&self, instance: &InstanceId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(instance.clone()).or_default())
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn scan_error(&self, err: &io::Error) -> RepositoryError {
        RepositoryError::ScanRoot {
            path: self.root.clone(),
            message: err.to_string(),
        }
    }
}
