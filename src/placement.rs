//! Bottom-Left Fill placement on a single sheet.
//!
//! Candidate anchors are the sheet origin plus, for every cut already on the
//! sheet, the point right of it and the point below it (each offset by the
//! kerf). Anchors are tried lowest-first, then leftmost-first; the unrotated
//! orientation is scanned completely before the rotated one. The first
//! admissible anchor wins, so the result is greedy and not globally optimal.

use std::cmp::Ordering;

use crate::geometry::{collides_with_kerf, fits_on_sheet, intersects_with_kerf};
use crate::model::{CutPattern, PlacedCut};
use crate::types::{BoundingBox, EPSILON_GENERAL, Vec2};

/// Position and orientation chosen for a piece.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Vec2,
    pub rotated: bool,
}

/// Finds the first admissible position for a `dims` piece on a sheet.
///
/// # Parameters
/// * `dims` - Unrotated width/height of the piece
/// * `sheet` - Sheet width/height
/// * `kerf` - Clearance required between neighbouring pieces
/// * `placed` - Cuts already on this sheet
/// * `allow_rotation` - Whether the 90° orientation may be tried
///
/// # Returns
/// `Some(Placement)` on success, `None` if the caller has to open a new sheet
pub fn find_position(
    dims: Vec2,
    sheet: Vec2,
    kerf: f64,
    placed: &[PlacedCut],
    allow_rotation: bool,
) -> Option<Placement> {
    let candidates = candidate_positions(sheet, kerf, placed);

    if let Some(position) = scan(&candidates, dims, sheet, kerf, placed) {
        return Some(Placement {
            position,
            rotated: false,
        });
    }

    if allow_rotation && (dims.x - dims.y).abs() > EPSILON_GENERAL {
        if let Some(position) = scan(&candidates, dims.swapped(), sheet, kerf, placed) {
            return Some(Placement {
                position,
                rotated: true,
            });
        }
    }

    None
}

/// Checks whether a piece could be placed on an empty sheet in any allowed orientation.
pub fn fits_empty_sheet(dims: Vec2, sheet: Vec2, allow_rotation: bool) -> bool {
    dims.fits_within(&sheet, EPSILON_GENERAL)
        || (allow_rotation && dims.swapped().fits_within(&sheet, EPSILON_GENERAL))
}

/// Generates the sorted candidate anchors (ascending y, then ascending x).
fn candidate_positions(sheet: Vec2, kerf: f64, placed: &[PlacedCut]) -> Vec<Vec2> {
    let mut candidates = Vec::with_capacity(1 + placed.len() * 2);
    candidates.push(Vec2::zero());

    for p in placed {
        candidates.push(Vec2::new(p.x + p.width + kerf, p.y));
        candidates.push(Vec2::new(p.x, p.y + p.height + kerf));
    }

    candidates.retain(|c| c.x < sheet.x && c.y < sheet.y);
    candidates.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });
    candidates.dedup_by(|a, b| {
        (a.x - b.x).abs() < EPSILON_GENERAL && (a.y - b.y).abs() < EPSILON_GENERAL
    });
    candidates
}

fn scan(
    candidates: &[Vec2],
    dims: Vec2,
    sheet: Vec2,
    kerf: f64,
    placed: &[PlacedCut],
) -> Option<Vec2> {
    candidates
        .iter()
        .copied()
        .find(|&position| is_admissible(position, dims, sheet, kerf, placed))
}

fn is_admissible(
    position: Vec2,
    dims: Vec2,
    sheet: Vec2,
    kerf: f64,
    placed: &[PlacedCut],
) -> bool {
    if !fits_on_sheet(position, dims, sheet) {
        return false;
    }
    let candidate = BoundingBox::from_position_and_dims(position, dims);
    !placed.iter().any(|p| collides_with_kerf(&candidate, p, kerf))
}

/// A layout problem found when checking a pattern against its material.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutConflict {
    /// The cut extends beyond the sheet edges.
    OutOfBounds { cut_id: String },
    /// Two cuts on the same sheet overlap or violate the kerf clearance.
    KerfViolation { first: String, second: String },
}

impl std::fmt::Display for LayoutConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutConflict::OutOfBounds { cut_id } => {
                write!(f, "Cut {} extends beyond the sheet", cut_id)
            }
            LayoutConflict::KerfViolation { first, second } => {
                write!(f, "Cuts {} and {} overlap or violate the kerf", first, second)
            }
        }
    }
}

/// Checks a (possibly externally supplied) pattern for bound and kerf violations.
pub fn find_conflicts(pattern: &CutPattern, sheet: Vec2, kerf: f64) -> Vec<LayoutConflict> {
    let mut conflicts = Vec::new();

    for (idx, cut) in pattern.cuts.iter().enumerate() {
        if !cut.bounding_box().inside_sheet(&sheet) {
            conflicts.push(LayoutConflict::OutOfBounds {
                cut_id: cut.id.clone(),
            });
        }
        for other in &pattern.cuts[idx + 1..] {
            if intersects_with_kerf(cut, other, kerf) {
                conflicts.push(LayoutConflict::KerfViolation {
                    first: cut.id.clone(),
                    second: other.id.clone(),
                });
            }
        }
    }

    conflicts
}
