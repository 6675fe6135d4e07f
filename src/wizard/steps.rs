//! Step identifiers and the resolver that derives the active step list.

use serde::{Deserialize, Serialize};

use super::model::{AnswerModel, PropagationMethod};

/// One question screen in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Area,
    Crop,
    Soil,
    SoilPendingItems,
    SoilReminder,
    PlantingMethod,
    Irrigation,
    Fertigation,
    PropagationMethod,
    SeedBrand,
    SeedVariety,
    SeedSubstrate,
    SeedTray,
    SeedlingVariety,
    SeedlingSupplier,
    SeedlingTray,
    Location,
    Materials,
    Fertilizer,
    Review,
}

impl StepId {
    /// Every step identifier, in backbone order.
    pub const ALL: [StepId; 20] = [
        StepId::Area,
        StepId::Crop,
        StepId::Soil,
        StepId::SoilPendingItems,
        StepId::SoilReminder,
        StepId::PlantingMethod,
        StepId::Irrigation,
        StepId::Fertigation,
        StepId::PropagationMethod,
        StepId::SeedBrand,
        StepId::SeedVariety,
        StepId::SeedSubstrate,
        StepId::SeedTray,
        StepId::SeedlingVariety,
        StepId::SeedlingSupplier,
        StepId::SeedlingTray,
        StepId::Location,
        StepId::Materials,
        StepId::Fertilizer,
        StepId::Review,
    ];

    /// Whether this is the final confirmation step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Review)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Area => "area",
            Self::Crop => "crop",
            Self::Soil => "soil",
            Self::SoilPendingItems => "soil_pending_items",
            Self::SoilReminder => "soil_reminder",
            Self::PlantingMethod => "planting_method",
            Self::Irrigation => "irrigation",
            Self::Fertigation => "fertigation",
            Self::PropagationMethod => "propagation_method",
            Self::SeedBrand => "seed_brand",
            Self::SeedVariety => "seed_variety",
            Self::SeedSubstrate => "seed_substrate",
            Self::SeedTray => "seed_tray",
            Self::SeedlingVariety => "seedling_variety",
            Self::SeedlingSupplier => "seedling_supplier",
            Self::SeedlingTray => "seedling_tray",
            Self::Location => "location",
            Self::Materials => "materials",
            Self::Fertilizer => "fertilizer",
            Self::Review => "review",
        };
        write!(f, "{s}")
    }
}

const SOIL_BRANCH: [StepId; 2] = [StepId::SoilPendingItems, StepId::SoilReminder];

const SEED_BRANCH: [StepId; 4] = [
    StepId::SeedBrand,
    StepId::SeedVariety,
    StepId::SeedSubstrate,
    StepId::SeedTray,
];

const SEEDLING_BRANCH: [StepId; 3] = [
    StepId::SeedlingVariety,
    StepId::SeedlingSupplier,
    StepId::SeedlingTray,
];

/// Derive the ordered list of active steps from an answer snapshot.
///
/// Pure and total: any snapshot, however incomplete, yields a list ending in
/// [`StepId::Review`]. An unanswered branch condition omits the branch.
pub fn resolve(answers: &AnswerModel) -> Vec<StepId> {
    let mut steps = vec![StepId::Area, StepId::Crop, StepId::Soil];

    if answers.soil.correction_done == Some(false) {
        steps.extend(SOIL_BRANCH);
    }

    steps.extend([
        StepId::PlantingMethod,
        StepId::Irrigation,
        StepId::Fertigation,
        StepId::PropagationMethod,
    ]);

    match answers.propagation.method {
        Some(PropagationMethod::Seed) => steps.extend(SEED_BRANCH),
        Some(PropagationMethod::Seedling) => steps.extend(SEEDLING_BRANCH),
        None => {}
    }

    steps.extend([
        StepId::Location,
        StepId::Materials,
        StepId::Fertilizer,
        StepId::Review,
    ]);
    steps
}

/// Clamp a position into a list of `len` steps. An empty list pins to 0.
pub fn clamp_position(position: usize, len: usize) -> usize {
    if position >= len {
        len.saturating_sub(1)
    } else {
        position
    }
}
