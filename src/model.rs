//! Data models for the sheet cutting optimization.
//!
//! This module defines the value objects created within a single optimization run:
//! - `CutRequest` / `UnitCut`: required pieces, before and after quantity expansion
//! - `Material`: the stock sheet definition supplied by the caller
//! - `PlacedCut` / `DroppedCut`: the outcome for each unit piece
//! - `CutPattern`, `CostAnalysis`, `OptimizationResult`: the serializable results

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry;
use crate::types::{BoundingBox, Dimensional, Positioned, Vec2, validation};

/// Validation error for caller-supplied input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid material: {0}")]
    InvalidMaterial(String),
}

/// A required rectangular piece, possibly needed several times.
///
/// One `CutRequest` with quantity N is logically N identical unit pieces.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "A",
    "width": 600.0,
    "height": 400.0,
    "quantity": 2,
    "description": "Side panel",
    "rotatable": true
}))]
pub struct CutRequest {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub rotatable: Option<bool>,
}

impl CutRequest {
    /// Creates a plain request without display metadata.
    pub fn new(id: impl Into<String>, width: f64, height: f64, quantity: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            quantity,
            description: String::new(),
            color: None,
            priority: None,
            rotatable: None,
        }
    }

    /// Checks dimensions, quantity and identifier.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidIdentifier(
                "cut id must not be empty".to_string(),
            ));
        }
        validation::validate_positive(self.width, &format!("Width of cut '{}'", self.id))
            .map_err(ValidationError::InvalidDimension)?;
        validation::validate_positive(self.height, &format!("Height of cut '{}'", self.id))
            .map_err(ValidationError::InvalidDimension)?;
        if self.quantity == 0 {
            return Err(ValidationError::InvalidQuantity(format!(
                "quantity of cut '{}' must be at least 1",
                self.id
            )));
        }
        Ok(())
    }

    /// Expands the request into `quantity` unit pieces with ids `{id}-1 .. {id}-N`.
    pub fn expand(&self) -> Vec<UnitCut> {
        (1..=self.quantity)
            .map(|index| UnitCut {
                id: format!("{}-{}", self.id, index),
                original_id: self.id.clone(),
                width: self.width,
                height: self.height,
                description: self.description.clone(),
                color: self.color.clone(),
                priority: self.priority,
                rotatable: self.rotatable.unwrap_or(true),
            })
            .collect()
    }

    /// Area of a single piece of this request.
    pub fn unit_area(&self) -> f64 {
        geometry::area(self.width, self.height)
    }
}

/// A single piece of a `CutRequest` (quantity = 1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UnitCut {
    pub id: String,
    pub original_id: String,
    pub width: f64,
    pub height: f64,
    pub description: String,
    pub color: Option<String>,
    pub priority: Option<u32>,
    pub rotatable: bool,
}

impl Dimensional for UnitCut {
    fn dimensions(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Stock sheet definition, read-only for the duration of a run.
///
/// # Fields
/// * `width`, `height`, `thickness`, `kerf` - Millimeters
/// * `cost_per_m2` - Price of one square meter of sheet
/// * `material_type` - Free-form label ("MDF", "Plywood", ...)
/// * `density` - Optional density in g/cm³ for mass estimates
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "width": 2440.0,
    "height": 1220.0,
    "thickness": 18.0,
    "cost_per_m2": 500.0,
    "kerf": 3.0,
    "material_type": "MDF"
}))]
pub struct Material {
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
    pub cost_per_m2: f64,
    pub kerf: f64,
    #[serde(default)]
    pub material_type: String,
    #[serde(default)]
    pub density: Option<f64>,
}

impl Material {
    /// Checks all measures; a kerf of zero is rejected as well.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = ValidationError::InvalidMaterial;
        validation::validate_positive(self.width, "Sheet width").map_err(invalid)?;
        validation::validate_positive(self.height, "Sheet height").map_err(invalid)?;
        validation::validate_positive(self.thickness, "Sheet thickness").map_err(invalid)?;
        validation::validate_positive(self.kerf, "Kerf").map_err(invalid)?;
        validation::validate_non_negative(self.cost_per_m2, "Cost per m²").map_err(invalid)?;
        if let Some(density) = self.density {
            validation::validate_positive(density, "Density").map_err(invalid)?;
        }
        Ok(())
    }

    #[inline]
    pub fn sheet_dims(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Area of one sheet in mm².
    #[inline]
    pub fn sheet_area(&self) -> f64 {
        geometry::area(self.width, self.height)
    }

    /// Area of one sheet in m².
    #[inline]
    pub fn sheet_area_m2(&self) -> f64 {
        geometry::area_to_square_meters(self.sheet_area())
    }
}

/// A unit piece assigned to a position on one of the pattern's sheets.
///
/// `width`/`height` are the effective dimensions, i.e. already swapped when
/// `rotated` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlacedCut {
    pub id: String,
    pub original_id: String,
    pub sheet_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotated: bool,
    pub description: String,
    pub color: Option<String>,
}

impl PlacedCut {
    /// Places `unit` at `position` on sheet `sheet_index`.
    pub fn new(unit: &UnitCut, sheet_index: usize, position: Vec2, rotated: bool) -> Self {
        let dims = if rotated {
            unit.dimensions().swapped()
        } else {
            unit.dimensions()
        };
        Self {
            id: unit.id.clone(),
            original_id: unit.original_id.clone(),
            sheet_index,
            x: position.x,
            y: position.y,
            width: dims.x,
            height: dims.y,
            rotated,
            description: unit.description.clone(),
            color: unit.color.clone(),
        }
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(self.position(), self.dimensions())
    }
}

impl Positioned for PlacedCut {
    fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Dimensional for PlacedCut {
    fn dimensions(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Why a unit piece is missing from a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The piece is larger than the sheet in every admissible orientation.
    ExceedsSheet,
    /// The piece fits dimensionally but no position was found on an empty sheet.
    NoPositionOnEmptySheet,
}

impl DropReason {
    pub fn code(&self) -> &'static str {
        match self {
            DropReason::ExceedsSheet => "exceeds_sheet",
            DropReason::NoPositionOnEmptySheet => "no_position_on_empty_sheet",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::ExceedsSheet => {
                write!(f, "Piece is larger than the sheet in every allowed orientation")
            }
            DropReason::NoPositionOnEmptySheet => {
                write!(f, "No admissible position found even on an empty sheet")
            }
        }
    }
}

/// A unit piece that could not be placed, kept as an inspectable diagnostic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DroppedCut {
    pub cut: UnitCut,
    pub reason: DropReason,
}

/// Ordering applied to the unit pieces before greedy placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortStrategy {
    /// Descending area (First-Fit-Decreasing); the default.
    Area,
    Width,
    Height,
    Perimeter,
    /// Keep the caller's order, used for randomized exploration.
    AsGiven,
}

impl SortStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            SortStrategy::Area => "area",
            SortStrategy::Width => "width",
            SortStrategy::Height => "height",
            SortStrategy::Perimeter => "perimeter",
            SortStrategy::AsGiven => "as_given",
        }
    }
}

/// Result of packing a set of unit pieces onto one or more sheets.
///
/// Invariants: `efficiency + waste == 100`, placed cuts on the same sheet
/// keep the kerf clearance, and every placed cut stays inside the sheet.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CutPattern {
    pub strategy: SortStrategy,
    pub sheet_width: f64,
    pub sheet_height: f64,
    pub cuts: Vec<PlacedCut>,
    pub dropped: Vec<DroppedCut>,
    /// Percentage of the purchased sheet area covered by pieces (0..=100).
    pub efficiency: f64,
    /// `100 - efficiency`.
    pub waste: f64,
    pub sheets_needed: usize,
    pub total_material_area: f64,
    pub total_used_area: f64,
    pub total_waste_area: f64,
}

impl CutPattern {
    /// Builds a pattern from placements and derives all aggregate metrics.
    pub fn from_placements(
        strategy: SortStrategy,
        material: &Material,
        cuts: Vec<PlacedCut>,
        dropped: Vec<DroppedCut>,
    ) -> Self {
        let sheets_needed = cuts
            .iter()
            .map(|cut| cut.sheet_index + 1)
            .max()
            .unwrap_or(0);
        let total_material_area = material.sheet_area() * sheets_needed as f64;
        let total_used_area: f64 = cuts.iter().map(|cut| cut.area()).sum();
        let efficiency = if total_material_area > 0.0 {
            (total_used_area / total_material_area * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Self {
            strategy,
            sheet_width: material.width,
            sheet_height: material.height,
            cuts,
            dropped,
            efficiency,
            waste: 100.0 - efficiency,
            sheets_needed,
            total_material_area,
            total_used_area,
            total_waste_area: (total_material_area - total_used_area).max(0.0),
        }
    }

    /// Pattern without any placed piece.
    pub fn empty(strategy: SortStrategy, material: &Material) -> Self {
        Self::from_placements(strategy, material, Vec::new(), Vec::new())
    }

    /// Placed cuts on the given sheet, in placement order.
    pub fn cuts_on_sheet(&self, sheet_index: usize) -> impl Iterator<Item = &PlacedCut> {
        self.cuts
            .iter()
            .filter(move |cut| cut.sheet_index == sheet_index)
    }

    /// Indicates whether every requested piece was placed.
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Cost breakdown of a pattern, derived from the pattern and its material.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CostAnalysis {
    pub material_cost: f64,
    /// Informational: already contained in `material_cost`.
    pub waste_cost: f64,
    pub total_cost: f64,
    pub cost_per_cut: f64,
    pub savings: f64,
    pub baseline_efficiency: f64,
    pub traditional_sheets: usize,
    pub traditional_cost: f64,
    pub material_mass_kg: Option<f64>,
}

/// Aggregate returned by `optimize`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OptimizationResult {
    pub pattern: CutPattern,
    /// Best first, at most the configured number of alternatives.
    pub alternatives: Vec<CutPattern>,
    pub cost_analysis: CostAnalysis,
    pub recommendations: Vec<String>,
    pub is_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON_GENERAL;

    fn board() -> Material {
        Material {
            width: 2440.0,
            height: 1220.0,
            thickness: 18.0,
            cost_per_m2: 500.0,
            kerf: 3.0,
            material_type: "MDF".to_string(),
            density: None,
        }
    }

    #[test]
    fn expand_produces_distinct_ids_with_shared_prefix() {
        let request = CutRequest::new("A", 600.0, 400.0, 3);
        let units = request.expand();

        assert_eq!(units.len(), 3);
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["A-1", "A-2", "A-3"]);
        assert!(units.iter().all(|u| u.original_id == "A"));
        assert!(units.iter().all(|u| u.rotatable));
    }

    #[test]
    fn expand_carries_rotation_flag() {
        let mut request = CutRequest::new("G", 300.0, 200.0, 2);
        request.rotatable = Some(false);
        assert!(request.expand().iter().all(|u| !u.rotatable));
    }

    #[test]
    fn cut_request_validation() {
        assert!(CutRequest::new("A", 600.0, 400.0, 1).validate().is_ok());
        assert!(matches!(
            CutRequest::new("A", 0.0, 400.0, 1).validate(),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            CutRequest::new("A", 600.0, -1.0, 1).validate(),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            CutRequest::new("A", 600.0, 400.0, 0).validate(),
            Err(ValidationError::InvalidQuantity(_))
        ));
        assert!(matches!(
            CutRequest::new("  ", 600.0, 400.0, 1).validate(),
            Err(ValidationError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn material_validation_rejects_non_positive_kerf() {
        assert!(board().validate().is_ok());

        let mut no_kerf = board();
        no_kerf.kerf = 0.0;
        assert!(matches!(
            no_kerf.validate(),
            Err(ValidationError::InvalidMaterial(_))
        ));

        let mut negative_cost = board();
        negative_cost.cost_per_m2 = -1.0;
        assert!(negative_cost.validate().is_err());

        let mut bad_density = board();
        bad_density.density = Some(0.0);
        assert!(bad_density.validate().is_err());
    }

    #[test]
    fn placed_cut_swaps_dimensions_when_rotated() {
        let unit = CutRequest::new("B", 300.0, 200.0, 1).expand().remove(0);
        let placed = PlacedCut::new(&unit, 0, Vec2::new(10.0, 20.0), true);

        assert_eq!(placed.width, 200.0);
        assert_eq!(placed.height, 300.0);
        assert!(placed.rotated);
        assert_eq!(placed.original_id, "B");
    }

    #[test]
    fn empty_pattern_metrics() {
        let pattern = CutPattern::empty(SortStrategy::Area, &board());
        assert_eq!(pattern.sheets_needed, 0);
        assert_eq!(pattern.efficiency, 0.0);
        assert!((pattern.efficiency + pattern.waste - 100.0).abs() < EPSILON_GENERAL);
        assert_eq!(pattern.total_waste_area, 0.0);
    }

    #[test]
    fn pattern_metrics_from_placements() {
        let material = board();
        let unit = CutRequest::new("A", 1220.0, 1220.0, 1).expand().remove(0);
        let cuts = vec![PlacedCut::new(&unit, 0, Vec2::zero(), false)];
        let pattern = CutPattern::from_placements(SortStrategy::Area, &material, cuts, Vec::new());

        assert_eq!(pattern.sheets_needed, 1);
        assert!((pattern.efficiency - 50.0).abs() < EPSILON_GENERAL);
        assert!((pattern.waste - 50.0).abs() < EPSILON_GENERAL);
        assert!((pattern.total_waste_area - 1_488_400.0).abs() < EPSILON_GENERAL);
        assert_eq!(pattern.cuts_on_sheet(0).count(), 1);
        assert!(pattern.is_complete());
    }

    #[test]
    fn drop_reason_codes_are_stable() {
        assert_eq!(DropReason::ExceedsSheet.code(), "exceeds_sheet");
        assert_eq!(
            DropReason::NoPositionOnEmptySheet.code(),
            "no_position_on_empty_sheet"
        );
    }
}
