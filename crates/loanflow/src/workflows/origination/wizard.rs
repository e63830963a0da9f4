use serde::Serialize;

use super::domain::WizardStep;
use super::validation::StepValidation;

/// Display state of a step relative to the borrower's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Completed,
    Current,
    Upcoming,
}

/// Raised when a jump targets a step the borrower has not reached yet.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("step `{}` has not been reached yet", .0.label())]
    StepNotReached(WizardStep),
}

/// Position tracker for the seven-step wizard. Values are immutable;
/// transitions hand back the successor state instead of mutating in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardState {
    current: WizardStep,
    max_reached: WizardStep,
    visited: [bool; 7],
    show_validation_errors: bool,
}

impl WizardState {
    pub fn new() -> Self {
        let mut visited = [false; 7];
        visited[0] = true;
        WizardState {
            current: WizardStep::FIRST,
            max_reached: WizardStep::FIRST,
            visited,
            show_validation_errors: false,
        }
    }

    /// Rebuild a session position from the step a stored draft last
    /// completed: the borrower resumes on the following step and every step
    /// up to it counts as reached.
    pub fn resumed_after(completed: WizardStep) -> Self {
        let resume_at = completed.next();
        let mut visited = [false; 7];
        for step in WizardStep::ALL {
            if step.number() <= resume_at.number() {
                visited[(step.number() - 1) as usize] = true;
            }
        }
        WizardState {
            current: resume_at,
            max_reached: resume_at,
            visited,
            show_validation_errors: true,
        }
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    pub fn max_reached(&self) -> WizardStep {
        self.max_reached
    }

    pub fn shows_validation_errors(&self) -> bool {
        self.show_validation_errors
    }

    pub fn has_visited(&self, step: WizardStep) -> bool {
        self.visited[(step.number() - 1) as usize]
    }

    /// Move forward one step (clamped at the final step), raising the
    /// high-water mark. The step being left is marked visited and validation
    /// decorations are enabled from here on.
    pub fn advanced(self) -> Self {
        let mut next = self.visiting_current();
        next.current = self.current.next();
        if next.current.number() > next.max_reached.number() {
            next.max_reached = next.current;
        }
        next.show_validation_errors = true;
        next
    }

    /// Move back one step (clamped at the first step).
    pub fn stepped_back(self) -> Self {
        let mut next = self.visiting_current();
        next.current = self.current.previous();
        next.show_validation_errors = true;
        next
    }

    /// Jump directly to any previously reached step. The high-water mark is
    /// never lowered.
    pub fn jumped_to(self, step: WizardStep) -> Result<Self, WizardError> {
        if step.number() > self.max_reached.number() {
            return Err(WizardError::StepNotReached(step));
        }
        let mut next = self.visiting_current();
        next.current = step;
        Ok(next)
    }

    fn visiting_current(self) -> Self {
        let mut next = self;
        next.visited[(self.current.number() - 1) as usize] = true;
        next
    }

    pub fn step_status(&self, step: WizardStep) -> StepStatus {
        if self.current.number() > step.number() {
            StepStatus::Completed
        } else if self.current == step {
            StepStatus::Current
        } else {
            StepStatus::Upcoming
        }
    }

    /// Whether the step should be decorated as having missing fields: only
    /// steps already passed, or the current step once the borrower has tried
    /// to leave a step at least once. A fresh first step is never flagged.
    pub fn flags_missing_fields(&self, validation: &StepValidation) -> bool {
        if validation.is_complete {
            return false;
        }
        match self.step_status(validation.step) {
            StepStatus::Completed => true,
            StepStatus::Current => self.show_validation_errors,
            StepStatus::Upcoming => false,
        }
    }
}

impl Default for WizardState {
    fn default() -> Self {
        WizardState::new()
    }
}
