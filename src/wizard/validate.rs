//! Per-step validation rules.
//!
//! Each step owns its own rule and only looks at the fields that step asks
//! for. Validation never mutates the answers.

use rust_decimal::Decimal;

use super::model::{AnswerModel, FertilizerKind};
use super::steps::StepId;
use crate::error::StepError;

/// Check whether the answers allow leaving `step`.
pub fn validate(step: StepId, answers: &AnswerModel) -> Result<(), StepError> {
    match step {
        StepId::Area => positive(
            answers.area.value,
            "Enter the area size.",
            "Enter a number greater than 0.",
        ),
        StepId::Crop => text(answers.crop.as_deref(), "Tell us the crop (e.g. Arugula)."),
        StepId::Soil => choice(answers.soil.correction_done, "Choose an option."),
        StepId::SoilPendingItems | StepId::SoilReminder | StepId::Review => Ok(()),
        StepId::PlantingMethod => choice(answers.planting.method, "Choose row or bed."),
        StepId::Irrigation => {
            let used = required(answers.irrigation.used, "Choose yes or no.")?;
            if used {
                choice(answers.irrigation.kind, "Select the irrigation type.")?;
            }
            Ok(())
        }
        StepId::Fertigation => choice(answers.fertigation, "Choose an option."),
        StepId::PropagationMethod => choice(answers.propagation.method, "Choose seed or seedling."),
        StepId::SeedBrand => text(answers.propagation.seed.brand.as_deref(), "Enter the seed brand."),
        StepId::SeedVariety => text(answers.propagation.seed.variety.as_deref(), "Enter the variety."),
        StepId::SeedSubstrate => text(
            answers.propagation.seed.substrate.as_deref(),
            "Enter the substrate.",
        ),
        StepId::SeedTray => choice(answers.propagation.seed.tray, "Choose the tray."),
        StepId::SeedlingVariety => text(
            answers.propagation.seedling.variety.as_deref(),
            "Enter the seedling variety.",
        ),
        StepId::SeedlingSupplier => text(
            answers.propagation.seedling.supplier.as_deref(),
            "Enter the supplier.",
        ),
        StepId::SeedlingTray => choice(answers.propagation.seedling.tray, "Choose the tray."),
        StepId::Location => text(
            answers.location.label.as_deref(),
            "Enter the location (plot/lot).",
        ),
        StepId::Materials => choice(answers.materials.status, "Choose an option."),
        StepId::Fertilizer => {
            let kind = required(answers.fertilizer.kind, "Choose an option.")?;
            if kind == FertilizerKind::AlreadyOwned {
                text(
                    answers.fertilizer.description.as_deref(),
                    "Describe the fertilizer you have.",
                )?;
            }
            Ok(())
        }
    }
}

fn positive(value: Option<Decimal>, missing: &str, out_of_range: &str) -> Result<(), StepError> {
    match value {
        None => Err(StepError::missing(missing)),
        Some(v) if v <= Decimal::ZERO => Err(StepError::out_of_range(out_of_range)),
        Some(_) => Ok(()),
    }
}

fn text(value: Option<&str>, missing: &str) -> Result<(), StepError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(StepError::missing(missing)),
    }
}

fn required<T>(value: Option<T>, missing: &str) -> Result<T, StepError> {
    value.ok_or_else(|| StepError::missing(missing))
}

fn choice<T>(value: Option<T>, missing: &str) -> Result<(), StepError> {
    required(value, missing).map(|_| ())
}
