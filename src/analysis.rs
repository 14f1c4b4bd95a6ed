//! Cost breakdown and rule-based improvement suggestions for a cut pattern.

use crate::geometry::{area_to_square_meters, mass_grams};
use crate::model::{CostAnalysis, CutPattern, CutRequest, Material};

/// Below this efficiency (percent) more aggressive rotation is suggested.
const EFFICIENCY_TARGET: f64 = 80.0;
/// Above this waste (percent) the kerf/tolerance settings should be reviewed.
const WASTE_LIMIT: f64 = 20.0;
/// Pieces below this area (mm²) count as small.
const SMALL_CUT_AREA: f64 = 50_000.0;
/// Share of small requests above which batching is suggested.
const SMALL_CUT_RATIO: f64 = 0.3;
/// Jobs needing more sheets than this should be split.
const MAX_SHEETS_PER_BATCH: usize = 3;

/// Derives the cost analysis of a pattern.
///
/// The waste cost is informational only: it is already contained in the
/// material cost because whole sheets are purchased. Savings compare against
/// a traditional layout reaching `baseline_efficiency` (0.0 to 1.0) and are
/// never negative.
///
/// # Parameters
/// * `pattern` - The pattern to evaluate
/// * `material` - Sheet definition the pattern was generated for
/// * `baseline_efficiency` - Efficiency assumed for the traditional process
pub fn analyze_costs(
    pattern: &CutPattern,
    material: &Material,
    baseline_efficiency: f64,
) -> CostAnalysis {
    let sheet_cost = material.sheet_area_m2() * material.cost_per_m2;
    let material_cost = sheet_cost * pattern.sheets_needed as f64;
    let waste_cost = area_to_square_meters(pattern.total_waste_area) * material.cost_per_m2;
    let total_cost = material_cost;

    let cost_per_cut = if pattern.cuts.is_empty() {
        0.0
    } else {
        total_cost / pattern.cuts.len() as f64
    };

    let traditional_capacity = material.sheet_area() * baseline_efficiency;
    let traditional_sheets = if pattern.total_used_area > 0.0 && traditional_capacity > 0.0 {
        (pattern.total_used_area / traditional_capacity).ceil() as usize
    } else {
        0
    };
    let traditional_cost = sheet_cost * traditional_sheets as f64;

    let material_mass_kg = material.density.map(|density| {
        mass_grams(pattern.total_material_area, material.thickness, density) / 1000.0
    });

    CostAnalysis {
        material_cost,
        waste_cost,
        total_cost,
        cost_per_cut,
        savings: (traditional_cost - total_cost).max(0.0),
        baseline_efficiency,
        traditional_sheets,
        traditional_cost,
        material_mass_kg,
    }
}

/// Builds the list of improvement suggestions for a pattern.
///
/// Every applicable rule fires, always in the same order. The small-cut rule
/// counts the original requests, not the expanded pieces. A run without any
/// requested piece gets no suggestions.
pub fn recommendations(pattern: &CutPattern, requests: &[CutRequest]) -> Vec<String> {
    let mut out = Vec::new();
    if pattern.cuts.is_empty() && pattern.dropped.is_empty() {
        return out;
    }

    if pattern.efficiency < EFFICIENCY_TARGET {
        out.push(format!(
            "Efficiency is {:.1}%: allow rotation on more pieces to fill gaps more tightly.",
            pattern.efficiency
        ));
    }

    if pattern.waste > WASTE_LIMIT {
        out.push(format!(
            "Waste is {:.1}%: review the kerf and tolerance settings for this material.",
            pattern.waste
        ));
    }

    if !requests.is_empty() {
        let small = requests
            .iter()
            .filter(|request| request.unit_area() < SMALL_CUT_AREA)
            .count();
        if small as f64 / requests.len() as f64 > SMALL_CUT_RATIO {
            out.push(format!(
                "{} of {} requested cuts are small (< {:.0} mm²): batch them together or cut them from offcuts.",
                small,
                requests.len(),
                SMALL_CUT_AREA
            ));
        }
    }

    if pattern.sheets_needed > MAX_SHEETS_PER_BATCH {
        out.push(format!(
            "The job needs {} sheets: split it into smaller batches.",
            pattern.sheets_needed
        ));
    }

    if !pattern.dropped.is_empty() {
        out.push(format!(
            "{} piece(s) cannot fit the sheet in any allowed orientation: check their dimensions, rotation or the sheet size.",
            pattern.dropped.len()
        ));
    }

    out
}
