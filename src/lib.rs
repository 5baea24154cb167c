//! Evidence repository and synchronisation state for the collector.
//!
//! Every remote instance owns one durable `SQLite` repository. A session
//! controller brackets each upload session with `start`, `timeout`, and
//! `end` signals; an append-only evidence log stores uploaded payloads; and
//! a fleet reporter summarises all repositories for administrators.

pub mod config;
pub mod evidence;
pub mod instance;
pub mod report;
pub mod repository;
pub mod session;
#[cfg(test)]
mod test_helpers;
pub mod test_support;

pub use config::{CollectorConfig, ConfigError};
pub use evidence::{EvidenceError, EvidenceLog};
pub use instance::{InstanceId, InstanceIdError};
pub use report::{FleetReporter, InstanceSummary, ReportError, format_size};
pub use repository::{
    EvidenceRecord, InfoRecord, RepositoryError, RepositoryStore, SessionStart, SyncStatus,
};
pub use session::{LocalOnlyNotifier, SessionNotifier, SyncController, SyncStartOutcome};
