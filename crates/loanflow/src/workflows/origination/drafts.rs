use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use super::domain::{
    ApplicationDraft, ApplicationId, ApplicationStatus, LoanApplication, WizardStep,
};
use super::wizard::{WizardError, WizardState};

/// Trailing-edge delay for the background auto-save.
pub const AUTO_SAVE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Raised when the application store rejects or cannot take a draft save.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DraftStoreError {
    #[error("draft rejected: {0}")]
    Rejected(String),
    #[error("draft store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for draft saves. The production implementation fronts the
/// application HTTP API; tests and the CLI demo drive the service directly.
pub trait DraftStore: Send + Sync {
    fn create(&self, draft: &ApplicationDraft) -> Result<LoanApplication, DraftStoreError>;
    fn update(
        &self,
        id: &ApplicationId,
        draft: &ApplicationDraft,
    ) -> Result<LoanApplication, DraftStoreError>;
}

/// Accumulates step payloads into one draft and reconciles it with the
/// server-persisted row. Create-or-update is decided by whether a persisted
/// id exists yet. All writes go through the same sanitize pipeline, so the
/// explicit continue save and the debounced auto-save cannot drift apart.
#[derive(Debug)]
pub struct DraftCoordinator<S> {
    store: Arc<S>,
    accumulated: ApplicationDraft,
    persisted: Option<LoanApplication>,
    dirty: bool,
    last_error: Option<String>,
}

impl<S: DraftStore> DraftCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        DraftCoordinator {
            store,
            accumulated: ApplicationDraft::default(),
            persisted: None,
            dirty: false,
            last_error: None,
        }
    }

    /// Pick up where a stored draft left off.
    pub fn resume(store: Arc<S>, application: LoanApplication) -> Self {
        DraftCoordinator {
            store,
            accumulated: application.draft(),
            persisted: Some(application),
            dirty: false,
            last_error: None,
        }
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.accumulated
    }

    pub fn application(&self) -> Option<&LoanApplication> {
        self.persisted.as_ref()
    }

    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.persisted.as_ref().map(|application| &application.id)
    }

    /// Local edits not yet confirmed by the store.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Message of the most recent failed save, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fold a step payload into the accumulated draft. Blank strings and
    /// client-sent metric values are dropped before the merge.
    pub fn apply(&mut self, patch: ApplicationDraft) {
        self.accumulated = std::mem::take(&mut self.accumulated).merged(patch.sanitized());
        self.dirty = true;
    }

    /// Persist the accumulated draft: create on the first save (always as a
    /// draft), update afterwards. On success the local state is reconciled to
    /// the stored row; on failure local edits are kept and the coordinator
    /// stays dirty with the error exposed.
    pub fn save(&mut self) -> Result<LoanApplication, DraftStoreError> {
        let mut outbound = self.accumulated.clone().sanitized();

        let result = match self.application_id().cloned() {
            None => {
                outbound.status = Some(ApplicationStatus::Draft);
                self.store.create(&outbound)
            }
            Some(id) => self.store.update(&id, &outbound),
        };

        match result {
            Ok(saved) => {
                self.accumulated = saved.draft();
                self.persisted = Some(saved.clone());
                self.dirty = false;
                self.last_error = None;
                Ok(saved)
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

/// Wizard position plus draft persistence, composed so that moving forward
/// always persists first and a failed save leaves the position untouched.
#[derive(Debug)]
pub struct WizardSession<S> {
    wizard: WizardState,
    drafts: DraftCoordinator<S>,
}

impl<S: DraftStore> WizardSession<S> {
    pub fn new(store: Arc<S>) -> Self {
        WizardSession {
            wizard: WizardState::new(),
            drafts: DraftCoordinator::new(store),
        }
    }

    pub fn resume(store: Arc<S>, application: LoanApplication) -> Self {
        let wizard = WizardState::resumed_after(application.current_step);
        WizardSession {
            wizard,
            drafts: DraftCoordinator::resume(store, application),
        }
    }

    pub fn wizard(&self) -> &WizardState {
        &self.wizard
    }

    pub fn drafts(&self) -> &DraftCoordinator<S> {
        &self.drafts
    }

    pub fn drafts_mut(&mut self) -> &mut DraftCoordinator<S> {
        &mut self.drafts
    }

    /// Persist the step payload, then advance. The payload is stamped with
    /// the step being completed so the stored row can resume the wizard.
    pub fn continue_step(
        &mut self,
        mut patch: ApplicationDraft,
    ) -> Result<LoanApplication, DraftStoreError> {
        patch.current_step = Some(self.wizard.current());
        self.drafts.apply(patch);
        let saved = self.drafts.save()?;
        self.wizard = self.wizard.advanced();
        Ok(saved)
    }

    /// Step back with a best-effort save of pending edits.
    pub fn back(&mut self) {
        self.save_best_effort("back");
        self.wizard = self.wizard.stepped_back();
    }

    /// Jump to a previously reached step, saving pending edits best-effort
    /// first.
    pub fn jump_to(&mut self, step: WizardStep) -> Result<(), WizardError> {
        self.save_best_effort("jump");
        self.wizard = self.wizard.jumped_to(step)?;
        Ok(())
    }

    /// Final-step submission: flips the status to submitted and persists.
    /// One-way; the server enforces that the transition happens only once.
    pub fn submit(&mut self) -> Result<LoanApplication, DraftStoreError> {
        let patch = ApplicationDraft {
            status: Some(ApplicationStatus::Submitted),
            current_step: Some(self.wizard.current()),
            ..ApplicationDraft::default()
        };
        self.drafts.apply(patch);
        self.drafts.save()
    }

    fn save_best_effort(&mut self, action: &str) {
        if !self.drafts.is_dirty() {
            return;
        }
        if let Err(err) = self.drafts.save() {
            warn!(error = %err, action, "best-effort draft save failed");
        }
    }
}

/// Single-owner handle for the debounced auto-save task. Scheduling cancels
/// any pending run, so only the latest accumulated state ever reaches the
/// store; dropping the handle cancels outright, so a torn-down form can never
/// save behind the borrower's back.
#[derive(Debug, Default)]
pub struct AutoSaveTimer {
    delay: Option<Duration>,
    pending: Option<JoinHandle<()>>,
}

impl AutoSaveTimer {
    pub fn new() -> Self {
        AutoSaveTimer {
            delay: None,
            pending: None,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        AutoSaveTimer {
            delay: Some(delay),
            pending: None,
        }
    }

    /// Arm (or re-arm) the timer; fires once after the debounce window passes
    /// without another schedule call.
    pub fn schedule<S>(&mut self, coordinator: Arc<Mutex<DraftCoordinator<S>>>)
    where
        S: DraftStore + 'static,
    {
        self.cancel();
        let delay = self.delay.unwrap_or(AUTO_SAVE_DEBOUNCE);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut drafts = match coordinator.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if !drafts.is_dirty() {
                return;
            }
            if let Err(err) = drafts.save() {
                warn!(error = %err, "auto-save failed");
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for AutoSaveTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
