//! Answer model and the typed field updates that mutate it.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit the user entered the planting area in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AreaUnit {
    #[default]
    #[serde(rename = "m2", alias = "m²")]
    SquareMeters,
    #[serde(rename = "ha")]
    Hectares,
}

impl std::fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SquareMeters => write!(f, "m²"),
            Self::Hectares => write!(f, "ha"),
        }
    }
}

impl FromStr for AreaUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m2" | "m²" => Ok(Self::SquareMeters),
            "ha" => Ok(Self::Hectares),
            other => Err(format!("unknown area unit: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantingMethod {
    /// Furrows.
    Row,
    /// Raised beds.
    Bed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationKind {
    Drip,
    Sprinkler,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FertigationChoice {
    Yes,
    No,
    /// The user doesn't know what fertigation is.
    NotSure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMethod {
    Seed,
    Seedling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialsStatus {
    Purchased,
    NotPurchased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FertilizerKind {
    Granular,
    Organic,
    /// The user already has fertilizer on hand and describes it.
    AlreadyOwned,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaAnswer {
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub unit: AreaUnit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilAnswer {
    /// `None` means the user hasn't answered yet, which is not the same as "no".
    #[serde(default)]
    pub correction_done: Option<bool>,
    #[serde(default)]
    pub pending_items: Vec<String>,
    #[serde(default)]
    pub reminder: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlantingAnswer {
    #[serde(default)]
    pub method: Option<PlantingMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrrigationAnswer {
    #[serde(default)]
    pub used: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<IrrigationKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedDetails {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub substrate: Option<String>,
    #[serde(default)]
    pub tray: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedlingDetails {
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub tray: Option<u32>,
}

/// Seed and seedling details are kept side by side so switching methods
/// back and forth doesn't lose what was typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropagationAnswer {
    #[serde(default)]
    pub method: Option<PropagationMethod>,
    #[serde(default)]
    pub seed: SeedDetails,
    #[serde(default)]
    pub seedling: SeedlingDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationAnswer {
    /// Plot or lot label, e.g. "A-01".
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialsAnswer {
    #[serde(default)]
    pub status: Option<MaterialsStatus>,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FertilizerAnswer {
    #[serde(default)]
    pub kind: Option<FertilizerKind>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The partially filled planting record built up by the wizard.
///
/// Every field is optional. Which ones are required depends on the step
/// being left, see [`super::validate`]. Values from a branch that is no
/// longer active are kept as-is and simply ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerModel {
    #[serde(default)]
    pub area: AreaAnswer,
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub soil: SoilAnswer,
    #[serde(default)]
    pub planting: PlantingAnswer,
    #[serde(default)]
    pub irrigation: IrrigationAnswer,
    #[serde(default)]
    pub fertigation: Option<FertigationChoice>,
    #[serde(default)]
    pub propagation: PropagationAnswer,
    #[serde(default)]
    pub location: LocationAnswer,
    #[serde(default)]
    pub materials: MaterialsAnswer,
    #[serde(default)]
    pub fertilizer: FertilizerAnswer,
}

/// A single-field update coming from the presentation layer.
///
/// Serialized as `{"field": "<name>", "value": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum AnswerUpdate {
    AreaValue(Option<Decimal>),
    /// Raw text from a numeric input; coerced with [`parse_decimal_input`].
    AreaInput(String),
    AreaUnit(AreaUnit),
    Crop(Option<String>),
    SoilCorrectionDone(Option<bool>),
    ToggleSoilPendingItem(String),
    SoilReminder(bool),
    PlantingMethod(Option<PlantingMethod>),
    PlantingDimensions(Option<String>),
    IrrigationUsed(Option<bool>),
    IrrigationKind(Option<IrrigationKind>),
    Fertigation(Option<FertigationChoice>),
    PropagationMethod(Option<PropagationMethod>),
    SeedBrand(Option<String>),
    SeedVariety(Option<String>),
    SeedSubstrate(Option<String>),
    SeedTray(Option<u32>),
    SeedlingVariety(Option<String>),
    SeedlingSupplier(Option<String>),
    SeedlingTray(Option<u32>),
    LocationLabel(Option<String>),
    LocationGeo(Option<GeoPoint>),
    MaterialsStatus(Option<MaterialsStatus>),
    ToggleMaterialItem(String),
    FertilizerKind(Option<FertilizerKind>),
    FertilizerDescription(Option<String>),
}

impl AnswerUpdate {
    /// Field name as it appears on the wire, used for logging.
    pub fn field(&self) -> &'static str {
        match self {
            Self::AreaValue(_) => "area_value",
            Self::AreaInput(_) => "area_input",
            Self::AreaUnit(_) => "area_unit",
            Self::Crop(_) => "crop",
            Self::SoilCorrectionDone(_) => "soil_correction_done",
            Self::ToggleSoilPendingItem(_) => "toggle_soil_pending_item",
            Self::SoilReminder(_) => "soil_reminder",
            Self::PlantingMethod(_) => "planting_method",
            Self::PlantingDimensions(_) => "planting_dimensions",
            Self::IrrigationUsed(_) => "irrigation_used",
            Self::IrrigationKind(_) => "irrigation_kind",
            Self::Fertigation(_) => "fertigation",
            Self::PropagationMethod(_) => "propagation_method",
            Self::SeedBrand(_) => "seed_brand",
            Self::SeedVariety(_) => "seed_variety",
            Self::SeedSubstrate(_) => "seed_substrate",
            Self::SeedTray(_) => "seed_tray",
            Self::SeedlingVariety(_) => "seedling_variety",
            Self::SeedlingSupplier(_) => "seedling_supplier",
            Self::SeedlingTray(_) => "seedling_tray",
            Self::LocationLabel(_) => "location_label",
            Self::LocationGeo(_) => "location_geo",
            Self::MaterialsStatus(_) => "materials_status",
            Self::ToggleMaterialItem(_) => "toggle_material_item",
            Self::FertilizerKind(_) => "fertilizer_kind",
            Self::FertilizerDescription(_) => "fertilizer_description",
        }
    }
}

impl AnswerModel {
    /// Apply a field update in place.
    pub fn apply(&mut self, update: AnswerUpdate) {
        match update {
            AnswerUpdate::AreaValue(value) => self.area.value = value,
            AnswerUpdate::AreaInput(raw) => self.area.value = parse_decimal_input(&raw),
            AnswerUpdate::AreaUnit(unit) => self.area.unit = unit,
            AnswerUpdate::Crop(crop) => self.crop = crop,
            AnswerUpdate::SoilCorrectionDone(done) => self.soil.correction_done = done,
            AnswerUpdate::ToggleSoilPendingItem(item) => toggle(&mut self.soil.pending_items, item),
            AnswerUpdate::SoilReminder(on) => self.soil.reminder = on,
            AnswerUpdate::PlantingMethod(method) => self.planting.method = method,
            AnswerUpdate::PlantingDimensions(dims) => self.planting.dimensions = dims,
            AnswerUpdate::IrrigationUsed(used) => {
                self.irrigation.used = used;
                if used == Some(false) {
                    self.irrigation.kind = None;
                }
            }
            AnswerUpdate::IrrigationKind(kind) => self.irrigation.kind = kind,
            AnswerUpdate::Fertigation(choice) => self.fertigation = choice,
            AnswerUpdate::PropagationMethod(method) => self.propagation.method = method,
            AnswerUpdate::SeedBrand(v) => self.propagation.seed.brand = v,
            AnswerUpdate::SeedVariety(v) => self.propagation.seed.variety = v,
            AnswerUpdate::SeedSubstrate(v) => self.propagation.seed.substrate = v,
            AnswerUpdate::SeedTray(v) => self.propagation.seed.tray = v,
            AnswerUpdate::SeedlingVariety(v) => self.propagation.seedling.variety = v,
            AnswerUpdate::SeedlingSupplier(v) => self.propagation.seedling.supplier = v,
            AnswerUpdate::SeedlingTray(v) => self.propagation.seedling.tray = v,
            AnswerUpdate::LocationLabel(label) => self.location.label = label,
            AnswerUpdate::LocationGeo(geo) => self.location.geo = geo,
            AnswerUpdate::MaterialsStatus(status) => {
                self.materials.status = status;
                if status == Some(MaterialsStatus::NotPurchased) {
                    self.materials.items.clear();
                }
            }
            AnswerUpdate::ToggleMaterialItem(item) => toggle(&mut self.materials.items, item),
            AnswerUpdate::FertilizerKind(kind) => {
                self.fertilizer.kind = kind;
                if matches!(
                    kind,
                    Some(FertilizerKind::Granular) | Some(FertilizerKind::Organic)
                ) {
                    self.fertilizer.description = None;
                }
            }
            AnswerUpdate::FertilizerDescription(desc) => self.fertilizer.description = desc,
        }
    }
}

fn toggle(items: &mut Vec<String>, item: String) {
    if let Some(idx) = items.iter().position(|i| *i == item) {
        items.remove(idx);
    } else {
        items.push(item);
    }
}

/// Coerce numeric text input into a decimal.
///
/// A comma decimal separator is accepted, and blank input means "no value"
/// rather than zero. Anything unparsable is also treated as no value.
pub fn parse_decimal_input(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replace(',', ".");
    match Decimal::from_str(&normalized) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(input = %raw, error = %e, "Discarding unparsable numeric input");
            None
        }
    }
}

/// Settings keys used for wizard persistence.
pub mod settings_keys {
    /// Key for the list of registered planting areas.
    pub const PLANTING_AREAS: &str = "planting_areas";
    /// Key for the list of follow-up field tasks.
    pub const FIELD_TASKS: &str = "field_tasks";
    /// Default user ID (single-user deployments).
    pub const DEFAULT_USER: &str = "default";
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn default_model_is_empty() {
        let m = AnswerModel::default();
        assert!(m.area.value.is_none());
        assert_eq!(m.area.unit, AreaUnit::SquareMeters);
        assert!(m.crop.is_none());
        assert!(m.soil.correction_done.is_none());
        assert!(m.soil.pending_items.is_empty());
        assert!(!m.soil.reminder);
        assert!(m.propagation.method.is_none());
        assert!(m.fertilizer.kind.is_none());
    }

    #[test]
    fn decimal_input_accepts_comma_separator() {
        assert_eq!(parse_decimal_input("1,5"), Some(dec!(1.5)));
        assert_eq!(parse_decimal_input(" 600 "), Some(dec!(600)));
        assert_eq!(parse_decimal_input("0.25"), Some(dec!(0.25)));
    }

    #[test]
    fn decimal_input_empty_is_null_not_zero() {
        assert_eq!(parse_decimal_input(""), None);
        assert_eq!(parse_decimal_input("   "), None);
    }

    #[test]
    fn decimal_input_garbage_is_null() {
        assert_eq!(parse_decimal_input("abc"), None);
        assert_eq!(parse_decimal_input("1,2,3"), None);
    }

    #[test]
    fn area_input_update_coerces() {
        let mut m = AnswerModel::default();
        m.apply(AnswerUpdate::AreaInput("2,75".into()));
        assert_eq!(m.area.value, Some(dec!(2.75)));
        m.apply(AnswerUpdate::AreaInput(String::new()));
        assert_eq!(m.area.value, None);
    }

    #[test]
    fn toggles_add_and_remove() {
        let mut m = AnswerModel::default();
        m.apply(AnswerUpdate::ToggleSoilPendingItem("Lime".into()));
        m.apply(AnswerUpdate::ToggleSoilPendingItem("Gypsum".into()));
        assert_eq!(m.soil.pending_items, vec!["Lime", "Gypsum"]);
        m.apply(AnswerUpdate::ToggleSoilPendingItem("Lime".into()));
        assert_eq!(m.soil.pending_items, vec!["Gypsum"]);
    }

    #[test]
    fn irrigation_no_clears_kind() {
        let mut m = AnswerModel::default();
        m.apply(AnswerUpdate::IrrigationUsed(Some(true)));
        m.apply(AnswerUpdate::IrrigationKind(Some(IrrigationKind::Drip)));
        assert_eq!(m.irrigation.kind, Some(IrrigationKind::Drip));

        m.apply(AnswerUpdate::IrrigationUsed(Some(false)));
        assert_eq!(m.irrigation.used, Some(false));
        assert!(m.irrigation.kind.is_none());
    }

    #[test]
    fn materials_not_purchased_clears_items() {
        let mut m = AnswerModel::default();
        m.apply(AnswerUpdate::MaterialsStatus(Some(MaterialsStatus::Purchased)));
        m.apply(AnswerUpdate::ToggleMaterialItem("Substrate".into()));
        assert_eq!(m.materials.items.len(), 1);

        m.apply(AnswerUpdate::MaterialsStatus(Some(MaterialsStatus::NotPurchased)));
        assert!(m.materials.items.is_empty());
    }

    #[test]
    fn fertilizer_kind_change_clears_description_except_owned() {
        let mut m = AnswerModel::default();
        m.apply(AnswerUpdate::FertilizerKind(Some(FertilizerKind::AlreadyOwned)));
        m.apply(AnswerUpdate::FertilizerDescription(Some("04-14-08".into())));
        m.apply(AnswerUpdate::FertilizerKind(Some(FertilizerKind::AlreadyOwned)));
        assert_eq!(m.fertilizer.description.as_deref(), Some("04-14-08"));

        m.apply(AnswerUpdate::FertilizerKind(Some(FertilizerKind::Organic)));
        assert!(m.fertilizer.description.is_none());
    }

    #[test]
    fn switching_propagation_keeps_both_detail_sets() {
        let mut m = AnswerModel::default();
        m.apply(AnswerUpdate::PropagationMethod(Some(PropagationMethod::Seed)));
        m.apply(AnswerUpdate::SeedBrand(Some("Isla".into())));
        m.apply(AnswerUpdate::PropagationMethod(Some(PropagationMethod::Seedling)));
        m.apply(AnswerUpdate::SeedlingSupplier(Some("Nursery".into())));

        assert_eq!(m.propagation.seed.brand.as_deref(), Some("Isla"));
        assert_eq!(m.propagation.seedling.supplier.as_deref(), Some("Nursery"));
    }

    #[test]
    fn update_wire_format() {
        let update: AnswerUpdate =
            serde_json::from_str(r#"{"field": "soil_correction_done", "value": false}"#).unwrap();
        assert_eq!(update, AnswerUpdate::SoilCorrectionDone(Some(false)));

        let update: AnswerUpdate =
            serde_json::from_str(r#"{"field": "area_unit", "value": "m²"}"#).unwrap();
        assert_eq!(update, AnswerUpdate::AreaUnit(AreaUnit::SquareMeters));

        let update: AnswerUpdate =
            serde_json::from_str(r#"{"field": "area_value", "value": 600}"#).unwrap();
        assert_eq!(update, AnswerUpdate::AreaValue(Some(dec!(600))));

        let update: AnswerUpdate =
            serde_json::from_str(r#"{"field": "propagation_method", "value": null}"#).unwrap();
        assert_eq!(update, AnswerUpdate::PropagationMethod(None));
        assert_eq!(update.field(), "propagation_method");
    }

    #[test]
    fn area_unit_parsing() {
        assert_eq!("m²".parse::<AreaUnit>().unwrap(), AreaUnit::SquareMeters);
        assert_eq!("M2".parse::<AreaUnit>().unwrap(), AreaUnit::SquareMeters);
        assert_eq!("ha".parse::<AreaUnit>().unwrap(), AreaUnit::Hectares);
        assert!("acre".parse::<AreaUnit>().is_err());
    }

    #[test]
    fn model_tolerates_missing_sections() {
        let parsed: AnswerModel = serde_json::from_str(r#"{"crop": "Lettuce"}"#).unwrap();
        assert_eq!(parsed.crop.as_deref(), Some("Lettuce"));
        assert_eq!(parsed, AnswerModel {
            crop: Some("Lettuce".into()),
            ..Default::default()
        });
    }
}
