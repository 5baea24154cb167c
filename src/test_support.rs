//! Test support utilities shared across unit and integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::instance::InstanceId;
use crate::repository::SessionStart;
use crate::session::SessionNotifier;

/// Builds a session start with fixed metadata and the given `bid` and unix
/// timestamp.
#[must_use]
pub fn session_start(bid: i64, sync_time: i64) -> SessionStart {
    SessionStart {
        bid,
        build: String::from("RCS_0000000001"),
        subtype: String::from("WINDOWS"),
        version: 2_012_063_001,
        user: String::from("alice"),
        device: String::from("WORKSTATION-01"),
        source: String::from("10.0.0.7"),
        time: DateTime::<Utc>::from_timestamp(sync_time, 0).unwrap_or_default(),
    }
}

/// Records a single upstream notification made through [`RecordingNotifier`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NotifiedStart {
    /// Instance that started the session.
    pub instance: InstanceId,
    /// Session metadata passed upstream.
    pub start: SessionStart,
}

/// Session notifier that remembers every call, in order.
///
/// Clones share the same log, so a test can hand one clone to the controller
/// and inspect another.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<NotifiedStart>>>,
}

impl RecordingNotifier {
    /// Creates a notifier with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all notifications recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<NotifiedStart> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionNotifier for RecordingNotifier {
    fn sync_started(&self, instance: &InstanceId, start: &SessionStart) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(NotifiedStart {
                instance: instance.clone(),
                start: start.clone(),
            });
    }
}
