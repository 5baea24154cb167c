//! Synchronisation session state machine.
//!
//! A session moves `IDLE -> IN_PROGRESS -> {IDLE, TIMEOUT}`. Only
//! [`SyncController::sync_start`] enters `IN_PROGRESS`; timeouts apply only
//! to an in-progress row owned by the same `bid`, and an end always wins for
//! its `bid`.
//!
//! Session bookkeeping never fails the caller: storage errors are logged and
//! swallowed. The one observable difference is the [`SyncStartOutcome`]
//! returned by `sync_start`, which reports whether local state was recorded
//! after the upstream notification went out.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

use crate::instance::InstanceId;
use crate::repository::{InfoRecord, RepositoryError, RepositoryStore, SessionStart, SyncStatus};

mod notifier;

pub use notifier::{LocalOnlyNotifier, SessionNotifier};

/// Result of a session start once the upstream notification has been sent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum SyncStartOutcome {
    /// The `info` row now records the session as in progress.
    Recorded,
    /// The repository could not be created; nothing was written locally.
    RepositoryUnavailable,
    /// The repository exists but the `info` row could not be replaced.
    PersistenceFailed,
}

impl SyncStartOutcome {
    /// Returns true when upstream was told about a session that local storage
    /// did not record.
    #[must_use]
    pub const fn diverged_from_upstream(self) -> bool {
        !matches!(self, Self::Recorded)
    }
}

/// Drives the session state stored in each repository's `info` row.
#[derive(Debug)]
pub struct SyncController<'a, N: SessionNotifier> {
    store: &'a RepositoryStore,
    notifier: N,
    divergent_starts: AtomicU64,
}

impl<'a> SyncController<'a, LocalOnlyNotifier> {
    /// Creates a controller that keeps session starts local.
    #[must_use]
    pub const fn local(store: &'a RepositoryStore) -> Self {
        Self::new(store, LocalOnlyNotifier)
    }
}

impl<'a, N: SessionNotifier> SyncController<'a, N> {
    /// Creates a controller over `store` that announces starts to `notifier`.
    #[must_use]
    pub const fn new(store: &'a RepositoryStore, notifier: N) -> Self {
        Self {
            store,
            notifier,
            divergent_starts: AtomicU64::new(0),
        }
    }

    /// Number of starts announced upstream that were not recorded locally.
    #[must_use]
    pub fn divergent_starts(&self) -> u64 {
        self.divergent_starts.load(Ordering::Relaxed)
    }

    /// Opens a session for `instance`.
    ///
    /// Notifies upstream first, then creates the repository if needed and
    /// replaces the `info` row with an `IN_PROGRESS` record built from
    /// `start`. Repeated calls overwrite the previous row.
    pub fn sync_start(&self, instance: &InstanceId, start: &SessionStart) -> SyncStartOutcome {
        self.notifier.sync_started(instance, start);

        let outcome = if self.store.ensure_created(instance) {
            info!(%instance, bid = start.bid, "sync is in progress");
            let record = InfoRecord::in_progress(instance, start);
            match self.store.replace_info(instance, &record) {
                Ok(()) => SyncStartOutcome::Recorded,
                Err(err) => {
                    warn!(%instance, bid = start.bid, error = %err, "cannot insert into the repository");
                    SyncStartOutcome::PersistenceFailed
                }
            }
        } else {
            SyncStartOutcome::RepositoryUnavailable
        };

        if outcome.diverged_from_upstream() {
            self.divergent_starts.fetch_add(1, Ordering::Relaxed);
            warn!(
                %instance,
                bid = start.bid,
                ?outcome,
                diverged_from_upstream = true,
                "session start announced upstream but not recorded locally"
            );
        }
        outcome
    }

    /// Marks the session `bid` as timed out, but only while it is still in
    /// progress. Unknown instances and stale `bid`s are ignored.
    pub fn sync_timeout(&self, instance: &InstanceId, bid: i64) {
        if !self.store.exists(instance) {
            return;
        }
        self.transition(
            instance,
            bid,
            SyncStatus::Timeout,
            Some(SyncStatus::InProgress),
        );
        info!(%instance, bid, "sync has timed out");
    }

    /// Returns the session `bid` to idle from any state. Unknown instances
    /// are ignored.
    pub fn sync_end(&self, instance: &InstanceId, bid: i64) {
        if !self.store.exists(instance) {
            return;
        }
        self.transition(instance, bid, SyncStatus::Idle, None);
        info!(%instance, bid, "sync ended");
    }

    fn transition(
        &self,
        instance: &InstanceId,
        bid: i64,
        status: SyncStatus,
        only_from: Option<SyncStatus>,
    ) {
        match self.store.update_status(instance, bid, status, only_from) {
            Ok(0) => info!(%instance, bid, to = status.label(), "no matching session row"),
            Ok(_) => {}
            Err(RepositoryError::NoRepository { .. }) => {}
            Err(err) => warn!(%instance, bid, error = %err, "cannot update the repository"),
        }
    }
}
