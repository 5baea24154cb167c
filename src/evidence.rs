//! Append-only evidence log scoped to one instance repository.
//!
//! Appends are the only operation in the collector that surfaces storage
//! failures to the caller: an upload is never acknowledged unless it was
//! written.

use thiserror::Error;
use tracing::{debug, warn};

use crate::instance::InstanceId;
use crate::repository::{RepositoryError, RepositoryStore};

/// Errors raised while storing evidence.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Raised when the instance has no repository yet (no session started).
    #[error("no repository for instance {instance}")]
    NoRepository {
        /// Instance that has no repository.
        instance: InstanceId,
    },
    /// Raised when the payload could not be written.
    #[error("cannot save evidence for instance {instance}")]
    PersistenceFailure {
        /// Instance whose repository failed.
        instance: InstanceId,
        /// Underlying repository error.
        #[source]
        source: RepositoryError,
    },
}

/// Stores and enumerates evidence payloads.
#[derive(Clone, Copy, Debug)]
pub struct EvidenceLog<'a> {
    store: &'a RepositoryStore,
}

impl<'a> EvidenceLog<'a> {
    /// Creates a log over `store`.
    #[must_use]
    pub const fn new(store: &'a RepositoryStore) -> Self {
        Self { store }
    }

    /// Appends `content` to the instance's log with the caller-declared
    /// `size`.
    ///
    /// The declared size is stored as given. A mismatch with the payload
    /// length is logged, not rejected.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::NoRepository`] when no session has created the
    /// repository, and [`EvidenceError::PersistenceFailure`] when the write
    /// fails.
    pub fn append(
        &self,
        instance: &InstanceId,
        size: u64,
        content: &[u8],
    ) -> Result<(), EvidenceError> {
        if !self.store.exists(instance) {
            return Err(EvidenceError::NoRepository {
                instance: instance.clone(),
            });
        }

        let actual = u64::try_from(content.len()).unwrap_or(u64::MAX);
        if actual != size {
            warn!(%instance, declared = size, actual, "declared evidence size differs from payload length");
        }

        match self.store.insert_evidence(instance, size, content) {
            Ok(id) => {
                debug!(%instance, id, size, "evidence stored");
                Ok(())
            }
            Err(RepositoryError::NoRepository { .. }) => Err(EvidenceError::NoRepository {
                instance: instance.clone(),
            }),
            Err(err) => {
                warn!(%instance, error = %err, "cannot insert into the repository");
                Err(EvidenceError::PersistenceFailure {
                    instance: instance.clone(),
                    source: err,
                })
            }
        }
    }

    /// Returns the declared sizes of the stored evidence in insertion order,
    /// or `None` when the instance has no repository. Read failures are
    /// logged and also yield `None`.
    #[must_use]
    pub fn list_sizes(&self, instance: &InstanceId) -> Option<Vec<u64>> {
        match self.store.evidence_sizes(instance) {
            Ok(sizes) => Some(sizes),
            Err(RepositoryError::NoRepository { .. }) => None,
            Err(err) => {
                warn!(%instance, error = %err, "cannot read from the repository");
                None
            }
        }
    }

    /// Returns the number of stored evidence rows, or `None` when the sizes
    /// cannot be listed.
    #[must_use]
    pub fn count(&self, instance: &InstanceId) -> Option<usize> {
        self.list_sizes(instance).map(|sizes| sizes.len())
    }
}
