//! WizardController — owns the answers and the cursor into the step list.
//!
//! Every operation is synchronous and runs to completion. Draft writes are
//! handed to the session's [`DraftWriter`] and never awaited here.

use chrono::Utc;

use super::draft::DraftWriter;
use super::model::{AnswerModel, AnswerUpdate};
use super::record::FinishedRecord;
use super::steps::{StepId, clamp_position, resolve};
use super::validate::validate;
use crate::error::StepError;

/// Outcome of [`WizardController::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Moved forward; carries the new current step.
    Moved(StepId),
    /// Validation failed for the step being left. Position is unchanged.
    Blocked(StepError),
    /// The review step was confirmed.
    Completed(Box<FinishedRecord>),
    /// The wizard had already completed; nothing happened.
    AlreadyCompleted,
}

/// Position within the active step list, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    /// Percentage through the list, clamped to 0..=100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.current * 100) / self.total;
        pct.min(100) as u8
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}

pub struct WizardController {
    answers: AnswerModel,
    steps: Vec<StepId>,
    position: usize,
    completed: bool,
    error: Option<StepError>,
    draft: Option<DraftWriter>,
}

impl WizardController {
    /// Start at the first step with `answers` and no draft persistence.
    pub fn new(answers: AnswerModel) -> Self {
        let steps = resolve(&answers);
        Self {
            answers,
            steps,
            position: 0,
            completed: false,
            error: None,
            draft: None,
        }
    }

    /// Start at the first step, saving every mutation through `draft`.
    pub fn with_draft(answers: AnswerModel, draft: DraftWriter) -> Self {
        Self {
            draft: Some(draft),
            ..Self::new(answers)
        }
    }

    pub fn answers(&self) -> &AnswerModel {
        &self.answers
    }

    pub fn steps(&self) -> &[StepId] {
        &self.steps
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// The error from the last blocked advance, if nothing has happened since.
    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    pub fn current_step(&self) -> StepId {
        self.steps
            .get(self.position)
            .copied()
            .unwrap_or(StepId::Review)
    }

    pub fn progress(&self) -> Progress {
        let total = self.steps.len();
        let current = if self.completed {
            total
        } else {
            self.position + 1
        };
        Progress { current, total }
    }

    /// Apply a field update, re-derive the step list and queue a draft save.
    ///
    /// Returns `false` if the wizard has already completed.
    pub fn mutate(&mut self, update: AnswerUpdate) -> bool {
        if self.completed {
            tracing::debug!(field = update.field(), "Ignoring update after completion");
            return false;
        }
        let field = update.field();
        self.error = None;
        self.answers.apply(update);
        self.steps = resolve(&self.answers);

        let before = self.position;
        self.position = clamp_position(self.position, self.steps.len());
        if before != self.position {
            tracing::debug!(from = before, to = self.position, "Step list shrank, position clamped");
        }

        if let Some(draft) = &self.draft {
            draft.save(&self.answers);
        }
        tracing::debug!(field, steps = self.steps.len(), position = self.position, "Answer updated");
        true
    }

    /// Validate the current step and move forward, or finish on review.
    pub fn advance(&mut self) -> Advance {
        if self.completed {
            tracing::debug!("Ignoring advance after completion");
            return Advance::AlreadyCompleted;
        }
        let step = self.current_step();
        if let Err(e) = validate(step, &self.answers) {
            tracing::debug!(%step, position = self.position, error = %e, "Advance blocked");
            self.error = Some(e.clone());
            return Advance::Blocked(e);
        }
        self.error = None;

        if self.position + 1 >= self.steps.len() {
            self.completed = true;
            let record = FinishedRecord::from_answers(self.answers.clone(), Utc::now());
            tracing::debug!(steps = self.steps.len(), "Wizard completed");
            return Advance::Completed(Box::new(record));
        }

        self.position += 1;
        let next = self.current_step();
        tracing::debug!(from = %step, to = %next, position = self.position, "Advanced");
        Advance::Moved(next)
    }

    /// Step back without validating. Returns whether the position changed.
    pub fn retreat(&mut self) -> bool {
        if self.completed {
            tracing::debug!("Ignoring retreat after completion");
            return false;
        }
        self.error = None;
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        tracing::debug!(position = self.position, step = %self.current_step(), "Went back");
        true
    }

    /// Jump to `step` from the review screen. Anywhere else, or for a step
    /// that isn't active, this does nothing.
    pub fn jump(&mut self, step: StepId) -> bool {
        if self.completed {
            tracing::debug!(%step, "Ignoring jump after completion");
            return false;
        }
        self.error = None;
        if !self.current_step().is_terminal() {
            tracing::debug!(%step, from = %self.current_step(), "Jump only allowed from review");
            return false;
        }
        match self.steps.iter().position(|s| *s == step) {
            Some(index) => {
                self.position = index;
                tracing::debug!(%step, position = index, "Jumped to step");
                true
            }
            None => {
                tracing::debug!(%step, "Jump target not in active steps");
                false
            }
        }
    }

    /// Queue deletion of the saved draft.
    pub fn discard_draft(&self) {
        if let Some(draft) = &self.draft {
            draft.clear();
        }
    }

    /// Handle to the draft writer, if this session persists drafts.
    pub fn draft_writer(&self) -> Option<&DraftWriter> {
        self.draft.as_ref()
    }
}
