//! Typed rows stored in an instance repository.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::instance::InstanceId;

/// State of the synchronisation session recorded in `info.sync_status`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// No session is running.
    Idle,
    /// A session has started and has not yet ended or timed out.
    InProgress,
    /// The front end gave up on the session before it ended.
    Timeout,
}

impl SyncStatus {
    /// Integer code persisted in the repository.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Idle => 0,
            Self::InProgress => 1,
            Self::Timeout => 2,
        }
    }

    /// Decodes a persisted status code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Idle),
            1 => Some(Self::InProgress),
            2 => Some(Self::Timeout),
            _ => None,
        }
    }

    /// Label shown in the status report.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::InProgress => "IN PROGRESS",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl ToSql for SyncStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for SyncStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = i64::column_result(value)?;
        Self::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// Metadata reported by an instance when it opens a session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionStart {
    /// Session identifier chosen by the front end.
    pub bid: i64,
    /// Build identifier of the instance software.
    pub build: String,
    /// Instance subtype or category.
    pub subtype: String,
    /// Protocol version spoken by the instance.
    pub version: i64,
    /// User reported by the instance.
    pub user: String,
    /// Device reported by the instance.
    pub device: String,
    /// Source address or channel reported by the instance.
    pub source: String,
    /// Moment the session started.
    pub time: DateTime<Utc>,
}

/// The single `info` row of a repository.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InfoRecord {
    /// Session identifier of the session that wrote this row.
    pub bid: i64,
    /// Build identifier of the instance software.
    pub build: String,
    /// Instance identifier, redundant with the repository name.
    pub instance: String,
    /// Instance subtype or category.
    pub subtype: String,
    /// Protocol version spoken by the instance.
    pub version: i64,
    /// User reported by the instance.
    pub user: String,
    /// Device reported by the instance.
    pub device: String,
    /// Source address or channel reported by the instance.
    pub source: String,
    /// Unix timestamp (seconds) of the session start.
    pub sync_time: i64,
    /// Current session state.
    pub sync_status: SyncStatus,
}

impl InfoRecord {
    /// Builds the row written when `instance` opens a session.
    #[must_use]
    pub fn in_progress(instance: &InstanceId, start: &SessionStart) -> Self {
        Self {
            bid: start.bid,
            build: start.build.clone(),
            instance: instance.as_str().to_owned(),
            subtype: start.subtype.clone(),
            version: start.version,
            user: start.user.clone(),
            device: start.device.clone(),
            source: start.source.clone(),
            sync_time: start.time.timestamp(),
            sync_status: SyncStatus::InProgress,
        }
    }
}

/// One stored evidence payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EvidenceRecord {
    /// Insertion-ordered row identifier.
    pub id: i64,
    /// Size declared by the uploader.
    pub size: u64,
    /// Opaque payload.
    pub content: Vec<u8>,
}
