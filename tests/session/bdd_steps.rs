//! BDD step definitions for session behaviour.

use evidence_collector::test_support::session_start;
use evidence_collector::{
    EvidenceError, EvidenceLog, FleetReporter, InstanceId, SyncController, SyncStartOutcome,
};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{SessionContext, UploadOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn instance_id(raw: &str) -> InstanceId {
    InstanceId::new(raw.trim()).unwrap_or_else(|err| panic!("scenario instance id: {err}"))
}

#[given("an empty repository root")]
fn empty_root(session_context: SessionContext) -> SessionContext {
    assert!(
        session_context
            .store
            .list_instances()
            .is_ok_and(|instances| instances.is_empty()),
        "repository root should start empty"
    );
    session_context
}

#[when("instance \"{instance}\" starts session {bid:u32} at {time:u32}")]
fn start_session(
    session_context: SessionContext,
    instance: String,
    bid: u32,
    time: u32,
) -> SessionContext {
    let controller = SyncController::new(&session_context.store, session_context.notifier.clone());
    let outcome = controller.sync_start(
        &instance_id(&instance),
        &session_start(i64::from(bid), i64::from(time)),
    );
    assert_eq!(outcome, SyncStartOutcome::Recorded);
    session_context
}

#[when("instance \"{instance}\" uploads {count:u32} payloads of {size:u32} bytes")]
fn upload_payloads(
    mut session_context: SessionContext,
    instance: String,
    count: u32,
    size: u32,
) -> SessionContext {
    let id = instance_id(&instance);
    let log = EvidenceLog::new(&session_context.store);
    let payload = vec![0x5a_u8; usize::try_from(size).unwrap_or(0)];
    let mut outcome = UploadOutcome::Stored;
    for _ in 0..count {
        match log.append(&id, u64::from(size), &payload) {
            Ok(()) => {}
            Err(EvidenceError::NoRepository { .. }) => {
                outcome = UploadOutcome::NoRepository;
                break;
            }
            Err(err) => {
                outcome = UploadOutcome::Failed(err.to_string());
                break;
            }
        }
    }
    session_context.upload = Some(outcome);
    session_context
}

#[when("instance \"{instance}\" ends session {bid:u32}")]
fn end_session(session_context: SessionContext, instance: String, bid: u32) -> SessionContext {
    SyncController::local(&session_context.store).sync_end(&instance_id(&instance), i64::from(bid));
    session_context
}

#[when("instance \"{instance}\" times out session {bid:u32}")]
fn timeout_session(session_context: SessionContext, instance: String, bid: u32) -> SessionContext {
    SyncController::local(&session_context.store)
        .sync_timeout(&instance_id(&instance), i64::from(bid));
    session_context
}

#[then("instance \"{instance}\" is \"{status}\"")]
fn instance_has_status(
    session_context: &SessionContext,
    instance: String,
    status: String,
) -> Result<(), StepError> {
    let info = session_context
        .store
        .info(&instance_id(&instance))
        .map_err(|err| StepError::Assertion(err.to_string()))?
        .ok_or_else(|| StepError::Assertion(format!("no info row for {instance}")))?;
    if info.sync_status.label() == status {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {status}, got {}",
            info.sync_status.label()
        )))
    }
}

#[then("instance \"{instance}\" holds {count:u32} evidences totalling \"{total}\"")]
fn instance_holds_evidence(
    session_context: &SessionContext,
    instance: String,
    count: u32,
    total: String,
) -> Result<(), StepError> {
    let summaries = FleetReporter::new(&session_context.store)
        .report(Some(&instance_id(&instance)))
        .map_err(|err| StepError::Assertion(err.to_string()))?;
    let Some(summary) = summaries.first() else {
        return Err(StepError::Assertion(String::from("empty report")));
    };
    if summary.evidence_count == count as usize && summary.total_size_label() == total {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} evidences totalling {total}, got {summary:?}"
        )))
    }
}

#[then("upstream was notified {count:u32} time")]
fn upstream_notified(session_context: &SessionContext, count: u32) -> Result<(), StepError> {
    let calls = session_context.notifier.calls().len();
    if calls == count as usize {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} notifications, got {calls}"
        )))
    }
}

#[then("the upload is refused because there is no repository")]
fn upload_refused(session_context: &SessionContext) -> Result<(), StepError> {
    match session_context.upload.as_ref() {
        Some(UploadOutcome::NoRepository) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected NoRepository, got {other:?}"
        ))),
    }
}

#[then("the fleet report is empty")]
fn fleet_report_empty(session_context: &SessionContext) -> Result<(), StepError> {
    let summaries = FleetReporter::new(&session_context.store)
        .report(None)
        .map_err(|err| StepError::Assertion(err.to_string()))?;
    if summaries.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected empty report, got {summaries:?}"
        )))
    }
}
