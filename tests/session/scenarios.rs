//! BDD scenarios for session tracking.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SessionContext, session_context};

#[scenario(
    path = "tests/features/session.feature",
    name = "A completed session stores its evidence and returns to idle"
)]
fn scenario_completed_session(session_context: SessionContext) {
    drop(session_context);
}

#[scenario(
    path = "tests/features/session.feature",
    name = "A late timeout does not regress an ended session"
)]
fn scenario_late_timeout(session_context: SessionContext) {
    drop(session_context);
}

#[scenario(
    path = "tests/features/session.feature",
    name = "A stale timeout does not touch a newer session"
)]
fn scenario_stale_timeout(session_context: SessionContext) {
    drop(session_context);
}

#[scenario(
    path = "tests/features/session.feature",
    name = "An end resolves a timed-out session"
)]
fn scenario_end_after_timeout(session_context: SessionContext) {
    drop(session_context);
}

#[scenario(
    path = "tests/features/session.feature",
    name = "Uploads before any session are refused"
)]
fn scenario_upload_without_session(session_context: SessionContext) {
    drop(session_context);
}
