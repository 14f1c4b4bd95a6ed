//! Optimization logic for laying out rectangular cuts on stock sheets.
//!
//! This module orchestrates the placement engine over a full cut list:
//! - Quantity expansion into unit pieces
//! - Greedy multi-sheet pattern generation (First-Fit-Decreasing by default)
//! - Comparison of alternative sort strategies
//! - Seeded randomized refinement of the piece order
//!
//! All functions are synchronous and share no state between calls.

use std::cmp::Ordering;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::analysis::{analyze_costs, recommendations};
use crate::model::{
    CutPattern, CutRequest, DropReason, DroppedCut, Material, OptimizationResult, PlacedCut,
    SortStrategy, UnitCut, ValidationError,
};
use crate::placement::{fits_empty_sheet, find_position};
use crate::types::{Dimensional, EPSILON_GENERAL};

/// Configuration for the cutting optimizer.
#[derive(Copy, Clone, Debug)]
pub struct CuttingConfig {
    /// Global switch for 90° rotation; a cut's own `rotatable = false` still wins.
    pub allow_rotation: bool,
    /// Efficiency assumed for a traditional manual layout (0.0 to 1.0).
    pub baseline_efficiency: f64,
    /// Maximum number of alternative patterns reported.
    pub max_alternatives: usize,
    /// Default number of trials for randomized refinement.
    pub refine_generations: usize,
}

impl CuttingConfig {
    pub const DEFAULT_ALLOW_ROTATION: bool = true;
    pub const DEFAULT_BASELINE_EFFICIENCY: f64 = 0.70;
    pub const DEFAULT_MAX_ALTERNATIVES: usize = 3;
    pub const DEFAULT_REFINE_GENERATIONS: usize = 50;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> CuttingConfigBuilder {
        CuttingConfigBuilder::default()
    }
}

impl Default for CuttingConfig {
    fn default() -> Self {
        Self {
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
            baseline_efficiency: Self::DEFAULT_BASELINE_EFFICIENCY,
            max_alternatives: Self::DEFAULT_MAX_ALTERNATIVES,
            refine_generations: Self::DEFAULT_REFINE_GENERATIONS,
        }
    }
}

/// Builder for `CuttingConfig`.
#[derive(Clone, Debug, Default)]
pub struct CuttingConfigBuilder {
    config: CuttingConfig,
}

impl CuttingConfigBuilder {
    pub fn allow_rotation(mut self, allow: bool) -> Self {
        self.config.allow_rotation = allow;
        self
    }

    pub fn baseline_efficiency(mut self, ratio: f64) -> Self {
        self.config.baseline_efficiency = ratio;
        self
    }

    pub fn max_alternatives(mut self, count: usize) -> Self {
        self.config.max_alternatives = count;
        self
    }

    pub fn refine_generations(mut self, generations: usize) -> Self {
        self.config.refine_generations = generations;
        self
    }

    pub fn build(self) -> CuttingConfig {
        self.config
    }
}

/// Events emitted while a pattern is generated, for live visualization.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type")]
pub enum OptimizeEvent {
    /// A new sheet received its first cut.
    SheetStarted {
        sheet_index: usize,
        width: f64,
        height: f64,
    },
    /// A cut was placed.
    CutPlaced {
        sheet_index: usize,
        id: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotated: bool,
    },
    /// A cut could not be placed at all.
    CutDropped {
        id: String,
        width: f64,
        height: f64,
        reason_code: String,
        reason_text: String,
    },
    /// Pattern generation finished.
    Finished {
        sheets: usize,
        placed: usize,
        dropped: usize,
        efficiency: f64,
    },
}

/// Strategies tried by the comparator in addition to the primary area order.
const ALTERNATIVE_STRATEGIES: [SortStrategy; 3] = [
    SortStrategy::Width,
    SortStrategy::Height,
    SortStrategy::Perimeter,
];

/// Validates the material and every cut request.
pub fn validate_input(cuts: &[CutRequest], material: &Material) -> Result<(), ValidationError> {
    material.validate()?;
    for cut in cuts {
        cut.validate()?;
    }
    Ok(())
}

/// Expands every request into its unit pieces, keeping request order.
pub fn expand_cuts(cuts: &[CutRequest]) -> Vec<UnitCut> {
    cuts.iter().flat_map(CutRequest::expand).collect()
}

/// Sorts unit pieces in place, descending by the strategy's key.
///
/// The sort is stable, so equal keys keep the incoming order.
pub fn sort_units(units: &mut [UnitCut], strategy: SortStrategy) {
    let key: fn(&UnitCut) -> f64 = match strategy {
        SortStrategy::Area => |u: &UnitCut| u.area(),
        SortStrategy::Width => |u: &UnitCut| u.width,
        SortStrategy::Height => |u: &UnitCut| u.height,
        SortStrategy::Perimeter => |u: &UnitCut| u.perimeter(),
        SortStrategy::AsGiven => return,
    };
    units.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Packs unit pieces across as many sheets as needed.
///
/// # Parameters
/// * `units` - Pieces to place; re-ordered according to `strategy` first
/// * `material` - Sheet definition (dimensions and kerf)
/// * `strategy` - Sort order applied before greedy placement
/// * `config` - Optimizer configuration
pub fn generate_pattern(
    units: &[UnitCut],
    material: &Material,
    strategy: SortStrategy,
    config: &CuttingConfig,
) -> CutPattern {
    generate_pattern_with_progress(units, material, strategy, config, |_| {})
}

/// Like `generate_pattern`, with a callback for every significant step.
///
/// Only the current sheet receives new pieces. When a piece does not fit,
/// the current sheet is closed and the piece is retried once on a fresh
/// sheet. Pieces that cannot fit even an empty sheet are reported in
/// `CutPattern::dropped` instead of aborting the run.
pub fn generate_pattern_with_progress(
    units: &[UnitCut],
    material: &Material,
    strategy: SortStrategy,
    config: &CuttingConfig,
    mut on_event: impl FnMut(&OptimizeEvent),
) -> CutPattern {
    let mut ordered = units.to_vec();
    sort_units(&mut ordered, strategy);

    let sheet = material.sheet_dims();
    let kerf = material.kerf;

    let mut closed: Vec<PlacedCut> = Vec::with_capacity(ordered.len());
    let mut current: Vec<PlacedCut> = Vec::new();
    let mut dropped: Vec<DroppedCut> = Vec::new();
    let mut sheet_index = 0usize;

    for unit in ordered {
        let allow_rotation = config.allow_rotation && unit.rotatable;
        let dims = unit.dimensions();

        if !fits_empty_sheet(dims, sheet, allow_rotation) {
            drop_cut(&mut dropped, unit, DropReason::ExceedsSheet, &mut on_event);
            continue;
        }

        let placement = match find_position(dims, sheet, kerf, &current, allow_rotation) {
            Some(placement) => placement,
            None if current.is_empty() => {
                drop_cut(
                    &mut dropped,
                    unit,
                    DropReason::NoPositionOnEmptySheet,
                    &mut on_event,
                );
                continue;
            }
            None => {
                closed.append(&mut current);
                sheet_index += 1;
                match find_position(dims, sheet, kerf, &current, allow_rotation) {
                    Some(placement) => placement,
                    None => {
                        drop_cut(
                            &mut dropped,
                            unit,
                            DropReason::NoPositionOnEmptySheet,
                            &mut on_event,
                        );
                        continue;
                    }
                }
            }
        };

        if current.is_empty() {
            on_event(&OptimizeEvent::SheetStarted {
                sheet_index,
                width: material.width,
                height: material.height,
            });
        }

        let cut = PlacedCut::new(&unit, sheet_index, placement.position, placement.rotated);
        on_event(&OptimizeEvent::CutPlaced {
            sheet_index,
            id: cut.id.clone(),
            x: cut.x,
            y: cut.y,
            width: cut.width,
            height: cut.height,
            rotated: cut.rotated,
        });
        current.push(cut);
    }

    closed.append(&mut current);
    let pattern = CutPattern::from_placements(strategy, material, closed, dropped);

    on_event(&OptimizeEvent::Finished {
        sheets: pattern.sheets_needed,
        placed: pattern.cuts.len(),
        dropped: pattern.dropped.len(),
        efficiency: pattern.efficiency,
    });
    pattern
}

fn drop_cut(
    dropped: &mut Vec<DroppedCut>,
    unit: UnitCut,
    reason: DropReason,
    on_event: &mut impl FnMut(&OptimizeEvent),
) {
    log::warn!(
        "Cut {} ({} x {}) dropped: {}",
        unit.id,
        unit.width,
        unit.height,
        reason
    );
    on_event(&OptimizeEvent::CutDropped {
        id: unit.id.clone(),
        width: unit.width,
        height: unit.height,
        reason_code: reason.code().to_string(),
        reason_text: reason.to_string(),
    });
    dropped.push(DroppedCut { cut: unit, reason });
}

/// Runs the alternative sort strategies and returns the best ones, best first.
///
/// Patterns without any efficiency are discarded; at most
/// `config.max_alternatives` patterns are returned.
pub fn compare_strategies(
    units: &[UnitCut],
    material: &Material,
    config: &CuttingConfig,
) -> Vec<CutPattern> {
    let mut patterns: Vec<CutPattern> = ALTERNATIVE_STRATEGIES
        .iter()
        .map(|&strategy| {
            let pattern = generate_pattern(units, material, strategy, config);
            log::debug!(
                "Strategy {}: {} sheets, {:.2}% efficiency",
                strategy.label(),
                pattern.sheets_needed,
                pattern.efficiency
            );
            pattern
        })
        .filter(|pattern| pattern.efficiency > 0.0)
        .collect();

    patterns.sort_by(|a, b| {
        b.efficiency
            .partial_cmp(&a.efficiency)
            .unwrap_or(Ordering::Equal)
    });
    patterns.truncate(config.max_alternatives);
    patterns
}

/// Main entry point: optimizes a cut list with the default configuration.
///
/// # Parameters
/// * `cuts` - Required cuts with quantities
/// * `material` - Stock sheet definition
///
/// # Returns
/// `OptimizationResult` with primary pattern, alternatives, cost analysis and
/// recommendations, or a `ValidationError` for invalid input. An empty cut
/// list yields an empty pattern rather than an error.
///
/// # Example
/// ```
/// use cut_it_now::model::{CutRequest, Material};
/// use cut_it_now::optimizer::optimize;
///
/// let material = Material {
///     width: 2440.0,
///     height: 1220.0,
///     thickness: 18.0,
///     cost_per_m2: 500.0,
///     kerf: 3.0,
///     material_type: "MDF".to_string(),
///     density: None,
/// };
/// let cuts = vec![CutRequest::new("A", 600.0, 400.0, 2)];
/// let result = optimize(&cuts, &material).unwrap();
/// assert_eq!(result.pattern.cuts.len(), 2);
/// ```
pub fn optimize(
    cuts: &[CutRequest],
    material: &Material,
) -> Result<OptimizationResult, ValidationError> {
    optimize_with_config(cuts, material, &CuttingConfig::default())
}

/// Optimization with a custom configuration.
pub fn optimize_with_config(
    cuts: &[CutRequest],
    material: &Material,
    config: &CuttingConfig,
) -> Result<OptimizationResult, ValidationError> {
    optimize_with_progress(cuts, material, config, |_| {})
}

/// Optimization with a live-progress callback for the primary pattern.
pub fn optimize_with_progress(
    cuts: &[CutRequest],
    material: &Material,
    config: &CuttingConfig,
    on_event: impl FnMut(&OptimizeEvent),
) -> Result<OptimizationResult, ValidationError> {
    validate_input(cuts, material)?;

    let units = expand_cuts(cuts);
    let pattern =
        generate_pattern_with_progress(&units, material, SortStrategy::Area, config, on_event);
    let alternatives = compare_strategies(&units, material, config);
    let cost_analysis = analyze_costs(&pattern, material, config.baseline_efficiency);
    let recommendations = recommendations(&pattern, cuts);

    log::info!(
        "Optimized {} cuts: {} sheets, {:.2}% efficiency, {} dropped",
        units.len(),
        pattern.sheets_needed,
        pattern.efficiency,
        pattern.dropped.len()
    );

    Ok(OptimizationResult {
        is_complete: pattern.is_complete(),
        pattern,
        alternatives,
        cost_analysis,
        recommendations,
    })
}

/// Randomized refinement with the default configuration.
///
/// See `genetic_refine_with_config`.
pub fn genetic_refine(
    cuts: &[CutRequest],
    material: &Material,
    generations: usize,
    seed: Option<u64>,
) -> Result<CutPattern, ValidationError> {
    genetic_refine_with_config(cuts, material, generations, seed, &CuttingConfig::default())
}

/// Explores random piece orders and keeps the most efficient pattern.
///
/// Every generation shuffles the unit pieces and packs them in that order.
/// A trial replaces the best-so-far only when it is strictly more efficient,
/// so the deterministic primary pattern is returned unless beaten. With a
/// fixed `seed` the result is reproducible; without one the generator is
/// seeded from the operating system. `generations` bounds the run time.
pub fn genetic_refine_with_config(
    cuts: &[CutRequest],
    material: &Material,
    generations: usize,
    seed: Option<u64>,
    config: &CuttingConfig,
) -> Result<CutPattern, ValidationError> {
    validate_input(cuts, material)?;

    let mut order = expand_cuts(cuts);
    let mut best = generate_pattern(&order, material, SortStrategy::Area, config);
    if order.len() < 2 {
        return Ok(best);
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    for generation in 0..generations {
        order.shuffle(&mut rng);
        let candidate = generate_pattern(&order, material, SortStrategy::AsGiven, config);
        if candidate.efficiency > best.efficiency + EPSILON_GENERAL {
            log::debug!(
                "Generation {}: efficiency improved {:.2}% -> {:.2}%",
                generation,
                best.efficiency,
                candidate.efficiency
            );
            best = candidate;
        }
    }

    Ok(best)
}
