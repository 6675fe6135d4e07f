//! Finished record emitted on completion, and the entities derived from it.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{AnswerModel, AreaUnit, GeoPoint};
use super::steps::{StepId, resolve};

const SQUARE_METERS_PER_HECTARE: Decimal = dec!(10000);

/// Name used when neither a location label nor a crop was given.
pub const UNNAMED_AREA: &str = "Unnamed area";

/// Convert an area to hectares, rounding square-meter conversions to two
/// decimal places.
pub fn to_hectares(value: Decimal, unit: AreaUnit) -> Decimal {
    match unit {
        AreaUnit::Hectares => value,
        AreaUnit::SquareMeters => (value / SQUARE_METERS_PER_HECTARE)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    }
}

/// Everything the user answered plus the fields downstream consumers need.
///
/// Built once, when the review step is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedRecord {
    pub answers: AnswerModel,
    /// The step list that was active at completion.
    pub steps: Vec<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_hectares: Option<Decimal>,
    pub display_name: String,
    pub irrigation_used: bool,
    /// Soil correction is still pending and the user asked to be reminded.
    pub soil_reminder_due: bool,
    pub completed_at: DateTime<Utc>,
}

impl FinishedRecord {
    pub fn from_answers(answers: AnswerModel, completed_at: DateTime<Utc>) -> Self {
        let area_hectares = answers
            .area
            .value
            .map(|v| to_hectares(v, answers.area.unit));

        let display_name = non_blank(answers.location.label.as_deref())
            .or_else(|| non_blank(answers.crop.as_deref()))
            .unwrap_or(UNNAMED_AREA)
            .to_string();

        let irrigation_used = answers.irrigation.used == Some(true);
        let soil_reminder_due = answers.soil.correction_done == Some(false) && answers.soil.reminder;

        Self {
            steps: resolve(&answers),
            area_hectares,
            display_name,
            irrigation_used,
            soil_reminder_due,
            completed_at,
            answers,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Lifecycle status of a registered planting area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaStatus {
    Registered,
}

/// A planting area registered from a finished wizard run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantingArea {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub crop: Option<String>,
    pub hectares: Option<Decimal>,
    pub irrigation_used: bool,
    pub status: AreaStatus,
    /// Cultivation progress percentage, 0 at registration.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
}

impl PlantingArea {
    pub fn from_record(user_id: &str, record: &FinishedRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: record.display_name.clone(),
            crop: record.answers.crop.clone(),
            hectares: record.area_hectares,
            irrigation_used: record.irrigation_used,
            status: AreaStatus::Registered,
            progress: 0,
            created_at: record.completed_at,
            geo: record.answers.location.geo,
        }
    }
}

/// A follow-up task attached to a planting area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTask {
    pub id: Uuid,
    pub area_id: Uuid,
    pub title: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

impl FieldTask {
    /// Reminder to finish soil correction for `area`.
    pub fn soil_correction(area: &PlantingArea, pending_items: &[String]) -> Self {
        let title = if pending_items.is_empty() {
            "Correct the soil".to_string()
        } else {
            format!("Correct the soil: {}", pending_items.join(", "))
        };
        Self {
            id: Uuid::new_v4(),
            area_id: area.id,
            title,
            done: false,
            created_at: area.created_at,
        }
    }
}
