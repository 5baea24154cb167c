//! Shared fixtures and helpers for session BDD scenarios.

use std::sync::Arc;

use evidence_collector::RepositoryStore;
use evidence_collector::test_support::RecordingNotifier;
use rstest::fixture;

use crate::fixtures::RepoRoot;

#[derive(Clone, Debug)]
pub enum UploadOutcome {
    Stored,
    NoRepository,
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct SessionContext {
    _root: Arc<RepoRoot>,
    pub store: Arc<RepositoryStore>,
    pub notifier: RecordingNotifier,
    pub upload: Option<UploadOutcome>,
}

#[fixture]
pub fn session_context() -> SessionContext {
    let root = RepoRoot::new();
    let store = root.store();
    SessionContext {
        _root: Arc::new(root),
        store: Arc::new(store),
        notifier: RecordingNotifier::new(),
        upload: None,
    }
}
