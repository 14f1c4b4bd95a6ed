//! Geometric helper functions for sheet layouts.
//!
//! Pure numeric helpers (area, perimeter, unit conversion, mass) plus the
//! kerf-aware collision test used by the placement engine. All lengths are
//! millimeters unless a function name says otherwise.

use crate::model::PlacedCut;
use crate::types::{BoundingBox, EPSILON_GENERAL, Vec2};

const MM2_PER_M2: f64 = 1_000_000.0;

/// Area of a `w` × `h` rectangle.
#[inline]
pub fn area(w: f64, h: f64) -> f64 {
    w * h
}

/// Perimeter of a `w` × `h` rectangle.
#[inline]
pub fn perimeter(w: f64, h: f64) -> f64 {
    2.0 * (w + h)
}

/// Converts square millimeters into square meters.
///
/// # Example
/// ```
/// use cut_it_now::geometry::area_to_square_meters;
///
/// assert_eq!(area_to_square_meters(2_976_800.0), 2.9768);
/// ```
#[inline]
pub fn area_to_square_meters(mm2: f64) -> f64 {
    mm2 / MM2_PER_M2
}

/// Converts square meters into square millimeters.
#[inline]
pub fn square_meters_to_area(m2: f64) -> f64 {
    m2 * MM2_PER_M2
}

/// Mass in grams of a plate with the given area and thickness.
///
/// `area_mm2 * thickness_mm / 1000` is the volume in cm³, which is then
/// multiplied by the density in g/cm³.
///
/// # Parameters
/// * `area_mm2` - Plate area in mm²
/// * `thickness_mm` - Plate thickness in mm
/// * `density_g_per_cm3` - Material density
#[inline]
pub fn mass_grams(area_mm2: f64, thickness_mm: f64, density_g_per_cm3: f64) -> f64 {
    (area_mm2 * thickness_mm / 1000.0) * density_g_per_cm3
}

/// Checks whether a candidate rectangle collides with an already placed cut
/// once the kerf clearance is enforced.
///
/// # Parameters
/// * `candidate` - Rectangle under consideration, on the same sheet as `placed`
/// * `placed` - Cut already on the sheet
/// * `kerf` - Blade width that must separate adjacent pieces
///
/// # Returns
/// `true` if the rectangles overlap or are closer than `kerf`, otherwise `false`
pub fn collides_with_kerf(candidate: &BoundingBox, placed: &PlacedCut, kerf: f64) -> bool {
    candidate.intersects_with_clearance(&placed.bounding_box(), kerf)
}

/// Checks whether two placed cuts collide once the kerf clearance is enforced.
///
/// Cuts on different sheets never collide.
pub fn intersects_with_kerf(a: &PlacedCut, b: &PlacedCut, kerf: f64) -> bool {
    if a.sheet_index != b.sheet_index {
        return false;
    }
    collides_with_kerf(&a.bounding_box(), b, kerf)
}

/// Checks whether a `dims` rectangle at `position` stays within the sheet.
#[inline]
pub fn fits_on_sheet(position: Vec2, dims: Vec2, sheet: Vec2) -> bool {
    position.x >= -EPSILON_GENERAL
        && position.y >= -EPSILON_GENERAL
        && position.x + dims.x <= sheet.x + EPSILON_GENERAL
        && position.y + dims.y <= sheet.y + EPSILON_GENERAL
}
