//! Planting wizard — a branching, multi-step questionnaire that collects
//! everything needed to register a planting area.
//!
//! The active step list is re-derived from the answers after every change,
//! so branch steps appear and disappear as the user answers. Progress is
//! saved as a draft per user, and the finished record is handed to a
//! [`RecordSink`](crate::store::RecordSink) once the review step is confirmed.

pub mod catalog;
pub mod controller;
pub mod draft;
pub mod manager;
pub mod model;
pub mod record;
pub mod routes;
pub mod steps;
pub mod validate;

pub use catalog::{StepPrompt, SummaryLine, prompt_for, review_summary};
pub use controller::{Advance, Progress, WizardController};
pub use draft::{DraftKey, DraftPersistence, DraftStore, DraftWriter, SettingsDraftStore};
pub use manager::{AdvanceResponse, WizardManager, WizardSessions, WizardStatus};
pub use model::{AnswerModel, AnswerUpdate, AreaUnit, parse_decimal_input};
pub use record::{FieldTask, FinishedRecord, PlantingArea, to_hectares};
pub use routes::{WizardRouteState, wizard_routes};
pub use steps::{StepId, resolve};
pub use validate::validate;
