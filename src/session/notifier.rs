//! Upstream notification seam for session starts.

use tracing::debug;

use crate::instance::InstanceId;
use crate::repository::SessionStart;

/// Records centrally that an instance began a session.
///
/// The controller calls this before it touches local storage, whatever the
/// outcome of that storage work. Implementations own their own failure
/// handling; the controller never observes it.
pub trait SessionNotifier {
    /// Announces that `instance` started the session described by `start`.
    fn sync_started(&self, instance: &InstanceId, start: &SessionStart);
}

impl<N: SessionNotifier + ?Sized> SessionNotifier for &N {
    fn sync_started(&self, instance: &InstanceId, start: &SessionStart) {
        (**self).sync_started(instance, start);
    }
}

impl<N: SessionNotifier + ?Sized> SessionNotifier for std::sync::Arc<N> {
    fn sync_started(&self, instance: &InstanceId, start: &SessionStart) {
        (**self).sync_started(instance, start);
    }
}

/// Notifier for deployments without an upstream database.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalOnlyNotifier;

impl SessionNotifier for LocalOnlyNotifier {
    fn sync_started(&self, instance: &InstanceId, start: &SessionStart) {
        debug!(%instance, bid = start.bid, "no upstream configured; session start kept local");
    }
}
