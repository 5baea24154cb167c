//! Fleet-wide and per-instance status reporting.
//!
//! The reporter only reads. Each repository is opened independently, so a
//! corrupt repository costs its own row in a fleet scan and nothing else.

use thiserror::Error;
use tracing::warn;

use crate::instance::InstanceId;
use crate::repository::{InfoRecord, RepositoryError, RepositoryStore};

mod size;
mod table;

pub use size::format_size;
pub use table::{render_detail, render_table};

/// Errors raised while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Raised when a specific instance was requested but has no `info` row.
    #[error("Invalid instance {instance}")]
    UnknownInstance {
        /// Requested instance.
        instance: InstanceId,
    },
    /// Raised when a specifically requested repository cannot be read.
    #[error("cannot read repository for instance {instance}")]
    Persistence {
        /// Requested instance.
        instance: InstanceId,
        /// Underlying repository error.
        #[source]
        source: RepositoryError,
    },
    /// Raised when the repository root cannot be enumerated.
    #[error("cannot scan repositories")]
    ScanRoot(#[source] RepositoryError),
}

/// One report row: the `info` record plus evidence totals.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSummary {
    /// Latest session metadata.
    pub info: InfoRecord,
    /// Number of stored evidence payloads.
    pub evidence_count: usize,
    /// Sum of declared evidence sizes in bytes.
    pub total_size: u64,
}

impl InstanceSummary {
    /// Builds a summary from an `info` row and the declared evidence sizes.
    #[must_use]
    pub fn new(info: InfoRecord, sizes: &[u64]) -> Self {
        Self {
            info,
            evidence_count: sizes.len(),
            total_size: sizes.iter().fold(0_u64, |acc, size| acc.saturating_add(*size)),
        }
    }

    /// Returns the total size in the largest binary unit.
    #[must_use]
    pub fn total_size_label(&self) -> String {
        format_size(self.total_size)
    }
}

/// Summarises repositories for administrators.
#[derive(Clone, Copy, Debug)]
pub struct FleetReporter<'a> {
    store: &'a RepositoryStore,
}

impl<'a> FleetReporter<'a> {
    /// Creates a reporter over `store`.
    #[must_use]
    pub const fn new(store: &'a RepositoryStore) -> Self {
        Self { store }
    }

    /// Summarises one instance, or every instance when `target` is `None`,
    /// ordered by ascending sync time.
    ///
    /// Fleet scans skip repositories without an `info` row and log and skip
    /// repositories that fail to read.
    ///
    /// # Errors
    ///
    /// For a specific target, returns [`ReportError::UnknownInstance`] when it
    /// has no `info` row and [`ReportError::Persistence`] when its repository
    /// cannot be read. For a fleet scan, returns [`ReportError::ScanRoot`] when
    /// the repository root cannot be enumerated.
    pub fn report(
        &self,
        target: Option<&InstanceId>,
    ) -> Result<Vec<InstanceSummary>, ReportError> {
        let mut summaries = match target {
            Some(instance) => vec![self.single(instance)?],
            None => self.fleet()?,
        };
        summaries.sort_by_key(|summary| summary.info.sync_time);
        Ok(summaries)
    }

    fn single(&self, instance: &InstanceId) -> Result<InstanceSummary, ReportError> {
        match self.summarise(instance) {
            Ok(Some(summary)) => Ok(summary),
            Ok(None) | Err(RepositoryError::NoRepository { .. }) => {
                Err(ReportError::UnknownInstance {
                    instance: instance.clone(),
                })
            }
            Err(source) => Err(ReportError::Persistence {
                instance: instance.clone(),
                source,
            }),
        }
    }

    fn fleet(&self) -> Result<Vec<InstanceSummary>, ReportError> {
        let instances = self.store.list_instances().map_err(ReportError::ScanRoot)?;
        let mut summaries = Vec::with_capacity(instances.len());
        for instance in &instances {
            match self.summarise(instance) {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) | Err(RepositoryError::NoRepository { .. }) => {}
                Err(err) => {
                    warn!(%instance, error = %err, "skipping unreadable repository");
                }
            }
        }
        Ok(summaries)
    }

    fn summarise(&self, instance: &InstanceId) -> Result<Option<InstanceSummary>, RepositoryError> {
        let Some(info) = self.store.info(instance)? else {
            return Ok(None);
        };
        let sizes = self.store.evidence_sizes(instance)?;
        Ok(Some(InstanceSummary::new(info, &sizes)))
    }
}
