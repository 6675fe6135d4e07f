//! Question text, hints, and answer suggestions for each step, plus the
//! review summary.

use serde::Serialize;

use super::model::{
    AnswerModel, FertigationChoice, FertilizerKind, IrrigationKind, MaterialsStatus,
    PlantingMethod, PropagationMethod,
};
use super::steps::StepId;

pub const CROP_SUGGESTIONS: &[&str] = &["Arugula", "Lettuce", "Tomato", "Chives", "Kale", "Cilantro"];
pub const SOIL_PENDING_ITEMS: &[&str] = &["Soil analysis", "Lime", "Gypsum", "Other"];
pub const TRAY_SIZES: &[u32] = &[128, 200, 288];
pub const MATERIAL_ITEMS: &[&str] = &["Seed/Seedling", "Substrate", "Tray", "Hose/Pipe", "Valve"];

/// What the presentation layer shows for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPrompt {
    pub step: StepId,
    pub question: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Build the prompt for `step`. Variety suggestions depend on the crop.
pub fn prompt_for(step: StepId, answers: &AnswerModel) -> StepPrompt {
    let (question, hint) = question_for(step);
    let suggestions = match step {
        StepId::Crop => owned(CROP_SUGGESTIONS),
        StepId::SoilPendingItems => owned(SOIL_PENDING_ITEMS),
        StepId::SeedVariety => seed_varieties(answers.crop.as_deref()),
        StepId::SeedlingVariety => seedling_varieties(answers.crop.as_deref()),
        StepId::SeedTray | StepId::SeedlingTray => {
            TRAY_SIZES.iter().map(|t| format!("{t} cells")).collect()
        }
        StepId::Materials => owned(MATERIAL_ITEMS),
        _ => Vec::new(),
    };
    StepPrompt {
        step,
        question,
        hint,
        suggestions,
    }
}

fn question_for(step: StepId) -> (&'static str, Option<&'static str>) {
    match step {
        StepId::Area => (
            "How big is the area you want to plant?",
            Some("A rough estimate is fine."),
        ),
        StepId::Crop => ("What are you going to plant?", Some("E.g. Arugula, Lettuce, Tomato.")),
        StepId::Soil => (
            "Have you corrected the soil yet?",
            Some("If not, we can remind you."),
        ),
        StepId::SoilPendingItems => (
            "What's still missing for the soil correction?",
            Some("Mark what's missing (optional)."),
        ),
        StepId::SoilReminder => (
            "Want a reminder to do the correction?",
            Some("We can remind you later; it won't block the registration."),
        ),
        StepId::PlantingMethod => ("How are you going to plant?", None),
        StepId::Irrigation => ("Will you use irrigation?", None),
        StepId::Fertigation => (
            "Do you want to use fertigation?",
            Some("Mixing fertilizer into the irrigation water."),
        ),
        StepId::PropagationMethod => ("Seed or seedling?", None),
        StepId::SeedBrand => ("Which seed brand?", None),
        StepId::SeedVariety => ("Which variety?", None),
        StepId::SeedSubstrate => ("Which substrate?", Some("Substrate used to germinate the seed.")),
        StepId::SeedTray => ("Which tray?", None),
        StepId::SeedlingVariety => ("Which seedling variety?", None),
        StepId::SeedlingSupplier => ("Who supplies the seedlings?", None),
        StepId::SeedlingTray => ("Which seedling tray?", None),
        StepId::Location => (
            "Where is this area?",
            Some("The name you use for it on the farm is enough."),
        ),
        StepId::Materials => ("Have you bought the materials?", None),
        StepId::Fertilizer => ("Which fertilizer will you use at planting?", None),
        StepId::Review => (
            "Check everything before saving",
            Some("You can edit it later."),
        ),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn crop_matches(crop: &str, names: &[&str]) -> bool {
    let lower = crop.to_lowercase();
    names.iter().any(|n| lower.contains(n))
}

fn seed_varieties(crop: Option<&str>) -> Vec<String> {
    let Some(crop) = crop.filter(|c| !c.trim().is_empty()) else {
        return owned(&["Variety 1", "Variety 2", "Variety 3"]);
    };
    if crop_matches(crop, &["arugula", "rocket"]) {
        owned(&["Broadleaf", "Wild", "Astro"])
    } else if crop_matches(crop, &["lettuce"]) {
        owned(&["Crisphead", "Iceberg", "Butterhead"])
    } else if crop_matches(crop, &["tomato"]) {
        owned(&["Santa Clara", "Cherry", "Italian"])
    } else {
        owned(&["Variety A", "Variety B", "Variety C"])
    }
}

fn seedling_varieties(crop: Option<&str>) -> Vec<String> {
    let Some(crop) = crop.filter(|c| !c.trim().is_empty()) else {
        return owned(&["Standard", "Premium"]);
    };
    if crop_matches(crop, &["arugula", "rocket"]) {
        owned(&["Broadleaf", "Wild"])
    } else if crop_matches(crop, &["lettuce"]) {
        owned(&["Crisphead", "Iceberg"])
    } else if crop_matches(crop, &["tomato"]) {
        owned(&["Santa Clara", "Cherry"])
    } else {
        owned(&["Variety A", "Variety B"])
    }
}

/// One line of the review screen, with the step to jump to for editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub title: &'static str,
    pub value: String,
    pub edit: StepId,
}

const EMPTY: &str = "—";

/// Summarize the answers for the review step.
///
/// Lines only reference steps present in `steps`, so every `edit` target is
/// a valid jump.
pub fn review_summary(answers: &AnswerModel, steps: &[StepId]) -> Vec<SummaryLine> {
    let mut lines = Vec::new();
    let mut push = |title: &'static str, value: Option<String>, edit: StepId| {
        if steps.contains(&edit) {
            lines.push(SummaryLine {
                title,
                value: value.unwrap_or_else(|| EMPTY.to_string()),
                edit,
            });
        }
    };

    push(
        "Area",
        answers
            .area
            .value
            .map(|v| format!("{} {}", v.normalize(), answers.area.unit)),
        StepId::Area,
    );
    push("Crop", text(answers.crop.as_deref()), StepId::Crop);
    push(
        "Soil correction",
        answers
            .soil
            .correction_done
            .map(|done| if done { "Done" } else { "Not yet" }.to_string()),
        StepId::Soil,
    );
    push(
        "Pending soil items",
        list(&answers.soil.pending_items),
        StepId::SoilPendingItems,
    );
    push(
        "Planting",
        answers.planting.method.map(|m| match m {
            PlantingMethod::Row => match text(answers.planting.dimensions.as_deref()) {
                Some(dims) => format!("Row – {dims}"),
                None => "Row".to_string(),
            },
            PlantingMethod::Bed => "Bed".to_string(),
        }),
        StepId::PlantingMethod,
    );
    push(
        "Irrigation",
        answers.irrigation.used.map(|used| {
            if !used {
                return "No".to_string();
            }
            match answers.irrigation.kind {
                Some(IrrigationKind::Drip) => "Yes – drip".to_string(),
                Some(IrrigationKind::Sprinkler) => "Yes – sprinkler".to_string(),
                Some(IrrigationKind::Other) => "Yes – other".to_string(),
                None => "Yes".to_string(),
            }
        }),
        StepId::Irrigation,
    );
    push(
        "Fertigation",
        answers.fertigation.map(|f| {
            match f {
                FertigationChoice::Yes => "Yes",
                FertigationChoice::No => "No",
                FertigationChoice::NotSure => "Not sure",
            }
            .to_string()
        }),
        StepId::Fertigation,
    );
    push(
        "Propagation",
        answers.propagation.method.map(|m| {
            match m {
                PropagationMethod::Seed => "Seed",
                PropagationMethod::Seedling => "Seedling",
            }
            .to_string()
        }),
        StepId::PropagationMethod,
    );
    push(
        "Location",
        text(answers.location.label.as_deref()),
        StepId::Location,
    );
    push(
        "Materials",
        answers.materials.status.map(|s| match s {
            MaterialsStatus::Purchased => match list(&answers.materials.items) {
                Some(items) => format!("Purchased – {items}"),
                None => "Purchased".to_string(),
            },
            MaterialsStatus::NotPurchased => "Not yet".to_string(),
        }),
        StepId::Materials,
    );
    push(
        "Fertilizer",
        answers.fertilizer.kind.map(|k| match k {
            FertilizerKind::Granular => "Granular".to_string(),
            FertilizerKind::Organic => "Organic".to_string(),
            FertilizerKind::AlreadyOwned => match text(answers.fertilizer.description.as_deref()) {
                Some(desc) => format!("Already owned – {desc}"),
                None => "Already owned".to_string(),
            },
        }),
        StepId::Fertilizer,
    );

    lines
}

fn text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}
