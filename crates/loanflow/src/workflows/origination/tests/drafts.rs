use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::common::*;
use crate::workflows::origination::domain::{
    ApplicationDraft, ApplicationStatus, LoanType, WizardStep,
};
use crate::workflows::origination::drafts::{AutoSaveTimer, DraftCoordinator, WizardSession};

#[test]
fn sanitize_drops_blanks_and_client_metrics_but_keeps_zero_and_false() {
    let draft = ApplicationDraft {
        loan_amount: Some("".to_string()),
        property_city: Some("   ".to_string()),
        net_worth: Some("0".to_string()),
        has_bankruptcy: Some(false),
        ltv: Some("99.99".to_string()),
        ..quick_start_draft()
    };

    let sanitized = draft.sanitized();
    assert!(sanitized.loan_amount.is_none());
    assert!(sanitized.property_city.is_none());
    assert_eq!(sanitized.net_worth.as_deref(), Some("0"));
    assert_eq!(sanitized.has_bankruptcy, Some(false));
    assert!(sanitized.ltv.is_none());
}

#[test]
fn merge_is_per_field_last_write_wins() {
    let base = quick_start_draft();
    let patch = ApplicationDraft {
        loan_amount: Some("2500000".to_string()),
        ..ApplicationDraft::default()
    };

    let merged = base.merged(patch);
    assert_eq!(merged.loan_amount.as_deref(), Some("2500000"));
    assert_eq!(merged.property_city.as_deref(), Some("Des Moines"));
    assert_eq!(merged.loan_type, Some(LoanType::PermanentAcquisition));
}

#[test]
fn coordinator_creates_on_first_save_and_updates_afterwards() {
    let store = Arc::new(FakeDraftStore::default());
    let mut coordinator = DraftCoordinator::new(store.clone());

    coordinator.apply(quick_start_draft());
    assert!(coordinator.is_dirty());

    let created = coordinator.save().expect("first save creates");
    assert_eq!(created.status, ApplicationStatus::Draft);
    assert!(!coordinator.is_dirty());
    assert_eq!(store.save_count(), 1);

    coordinator.apply(ApplicationDraft {
        property_name: Some("Riverfront Lofts".to_string()),
        ..ApplicationDraft::default()
    });
    let updated = coordinator.save().expect("second save updates");
    assert_eq!(updated.id, created.id);
    assert_eq!(store.save_count(), 2);
}

#[test]
fn first_save_is_always_a_draft() {
    let store = Arc::new(FakeDraftStore::default());
    let mut coordinator = DraftCoordinator::new(store.clone());
    coordinator.apply(quick_start_draft());
    coordinator.save().expect("save succeeds");

    let outbound = store.last_save().expect("payload recorded");
    assert_eq!(outbound.status, Some(ApplicationStatus::Draft));
}

#[test]
fn outbound_payloads_never_carry_blanks_or_metrics() {
    let store = Arc::new(FakeDraftStore::default());
    let mut coordinator = DraftCoordinator::new(store.clone());

    coordinator.apply(quick_start_draft());
    // Clearing a text input sends a blank, which must read as "absent" and
    // leave the accumulated value alone.
    coordinator.apply(ApplicationDraft {
        property_city: Some("".to_string()),
        dscr: Some("9.99".to_string()),
        ..ApplicationDraft::default()
    });
    coordinator.save().expect("save succeeds");

    let outbound = store.last_save().expect("payload recorded");
    assert_eq!(outbound.property_city.as_deref(), Some("Des Moines"));
    assert!(outbound.dscr.is_none());
}

#[test]
fn failed_save_keeps_edits_and_marks_dirty() {
    let store = Arc::new(FakeDraftStore::default());
    let mut coordinator = DraftCoordinator::new(store.clone());
    coordinator.apply(quick_start_draft());

    store.fail.store(true, Ordering::Relaxed);
    let err = coordinator.save().expect_err("save fails");
    assert!(err.to_string().contains("store offline"));
    assert!(coordinator.is_dirty());
    assert_eq!(coordinator.last_error(), Some(err.to_string().as_str()));
    assert_eq!(
        coordinator.draft().property_city.as_deref(),
        Some("Des Moines")
    );

    store.fail.store(false, Ordering::Relaxed);
    coordinator.save().expect("retry succeeds");
    assert!(!coordinator.is_dirty());
    assert!(coordinator.last_error().is_none());
}

#[test]
fn continue_persists_before_advancing_and_stamps_the_step() {
    let store = Arc::new(FakeDraftStore::default());
    let mut session = WizardSession::new(store.clone());

    let saved = session
        .continue_step(quick_start_draft())
        .expect("step saves");
    assert_eq!(saved.current_step, WizardStep::QuickStart);
    assert_eq!(session.wizard().current(), WizardStep::PropertyDetails);

    let outbound = store.last_save().expect("payload recorded");
    assert_eq!(outbound.current_step, Some(WizardStep::QuickStart));
}

#[test]
fn continue_does_not_advance_when_the_save_fails() {
    let store = Arc::new(FakeDraftStore::default());
    let mut session = WizardSession::new(store.clone());

    store.fail.store(true, Ordering::Relaxed);
    session
        .continue_step(quick_start_draft())
        .expect_err("save fails");
    assert_eq!(session.wizard().current(), WizardStep::QuickStart);
    assert!(session.drafts().is_dirty());
}

#[test]
fn back_saves_best_effort_and_never_blocks_navigation() {
    let store = Arc::new(FakeDraftStore::default());
    let mut session = WizardSession::new(store.clone());
    session
        .continue_step(quick_start_draft())
        .expect("step saves");

    store.fail.store(true, Ordering::Relaxed);
    session.drafts_mut().apply(ApplicationDraft {
        property_name: Some("Riverfront Lofts".to_string()),
        ..ApplicationDraft::default()
    });
    session.back();

    assert_eq!(session.wizard().current(), WizardStep::QuickStart);
    assert!(session.drafts().is_dirty());
    assert!(session.drafts().last_error().is_some());
}

#[test]
fn back_without_pending_edits_skips_the_save() {
    let store = Arc::new(FakeDraftStore::default());
    let mut session = WizardSession::new(store.clone());
    session
        .continue_step(quick_start_draft())
        .expect("step saves");
    assert_eq!(store.save_count(), 1);

    session.back();
    assert_eq!(store.save_count(), 1);
}

#[test]
fn jump_refuses_unreached_steps() {
    let store = Arc::new(FakeDraftStore::default());
    let mut session = WizardSession::new(store);
    session
        .continue_step(quick_start_draft())
        .expect("step saves");

    session
        .jump_to(WizardStep::Documents)
        .expect_err("documents step not reached");
    session
        .jump_to(WizardStep::QuickStart)
        .expect("revisit is allowed");
    assert_eq!(session.wizard().current(), WizardStep::QuickStart);
    assert_eq!(session.wizard().max_reached(), WizardStep::PropertyDetails);
}

#[test]
fn submission_marks_the_application_submitted() {
    let store = Arc::new(FakeDraftStore::default());
    let mut session = WizardSession::new(store);
    session
        .continue_step(quick_start_draft())
        .expect("step saves");

    let submitted = session.submit().expect("submission saves");
    assert_eq!(submitted.status, ApplicationStatus::Submitted);
}

#[tokio::test(start_paused = true)]
async fn auto_save_fires_once_after_the_quiet_window() {
    let store = Arc::new(FakeDraftStore::default());
    let coordinator = Arc::new(Mutex::new(DraftCoordinator::new(store.clone())));
    let mut timer = AutoSaveTimer::new();

    coordinator
        .lock()
        .expect("coordinator mutex poisoned")
        .apply(quick_start_draft());
    timer.schedule(coordinator.clone());

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(store.save_count(), 1);
    assert!(!coordinator
        .lock()
        .expect("coordinator mutex poisoned")
        .is_dirty());
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_coalesce_into_one_save() {
    let store = Arc::new(FakeDraftStore::default());
    let coordinator = Arc::new(Mutex::new(DraftCoordinator::new(store.clone())));
    let mut timer = AutoSaveTimer::new();

    for city in ["D", "De", "Des Moines"] {
        coordinator
            .lock()
            .expect("coordinator mutex poisoned")
            .apply(ApplicationDraft {
                property_city: Some(city.to_string()),
                ..ApplicationDraft::default()
            });
        timer.schedule(coordinator.clone());
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(store.save_count(), 1);
    let outbound = store.last_save().expect("payload recorded");
    assert_eq!(outbound.property_city.as_deref(), Some("Des Moines"));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_timer_cancels_the_pending_save() {
    let store = Arc::new(FakeDraftStore::default());
    let coordinator = Arc::new(Mutex::new(DraftCoordinator::new(store.clone())));

    {
        let mut timer = AutoSaveTimer::new();
        coordinator
            .lock()
            .expect("coordinator mutex poisoned")
            .apply(quick_start_draft());
        timer.schedule(coordinator.clone());
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.save_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn auto_save_skips_when_nothing_is_dirty() {
    let store = Arc::new(FakeDraftStore::default());
    let coordinator = Arc::new(Mutex::new(DraftCoordinator::new(store.clone())));
    let mut timer = AutoSaveTimer::new();

    timer.schedule(coordinator.clone());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(store.save_count(), 0);
}
