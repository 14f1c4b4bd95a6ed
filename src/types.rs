//! Common types and traits for 2D sheet geometry.
//!
//! This module defines the reusable value types and trait abstractions
//! shared by the placement engine, the pattern generator and the analyzers.

use std::ops::Add;

/// Global numerical tolerance for floating-point comparisons (in millimeters).
///
/// Used for bound checks, overlap tests and area comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 2D vector or point on a sheet.
///
/// Used for positions and dimensions. The origin is the top-left corner of
/// the sheet, `x` grows to the right and `y` grows along the sheet height.
///
/// # Examples
/// ```
/// use cut_it_now::types::Vec2;
///
/// let position = Vec2::new(10.0, 20.0);
/// let dims = Vec2::new(600.0, 400.0);
/// let far_corner = position + dims;
/// assert_eq!(far_corner, Vec2::new(610.0, 420.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Creates a new 2D vector.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a zero vector (sheet origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Area spanned by the vector when used as a dimension.
    #[inline]
    pub fn area(&self) -> f64 {
        self.x * self.y
    }

    /// Returns the vector with both components swapped (90° rotation of a dimension).
    #[inline]
    pub const fn swapped(&self) -> Self {
        Self::new(self.y, self.x)
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `container` - The outer vector (e.g., sheet dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, container: &Self, tolerance: f64) -> bool {
        self.x <= container.x + tolerance && self.y <= container.y + tolerance
    }
}

impl Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Trait for objects with 2D dimensions.
pub trait Dimensional {
    /// Returns the (effective) dimensions of the object.
    fn dimensions(&self) -> Vec2;

    /// Calculates the area.
    fn area(&self) -> f64 {
        self.dimensions().area()
    }

    /// Calculates the perimeter.
    fn perimeter(&self) -> f64 {
        let dims = self.dimensions();
        crate::geometry::perimeter(dims.x, dims.y)
    }
}

/// Trait for objects with a position on a sheet.
pub trait Positioned {
    /// Returns the position (top-left corner).
    fn position(&self) -> Vec2;
}

/// Axis-aligned rectangle on a sheet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec2,
    /// Maximum corner (position + dimensions)
    pub max: Vec2,
}

impl BoundingBox {
    /// Creates a bounding box from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec2, dims: Vec2) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks whether two rectangles violate the required clearance.
    ///
    /// They are separated when one's far edge plus `clearance` does not pass
    /// the other's near edge on at least one axis, checked in both directions.
    #[inline]
    pub fn intersects_with_clearance(&self, other: &Self, clearance: f64) -> bool {
        let eps = EPSILON_GENERAL;
        !(self.max.x + clearance <= other.min.x + eps
            || other.max.x + clearance <= self.min.x + eps
            || self.max.y + clearance <= other.min.y + eps
            || other.max.y + clearance <= self.min.y + eps)
    }

    /// Checks whether the box lies inside a sheet anchored at the origin.
    #[inline]
    pub fn inside_sheet(&self, sheet: &Vec2) -> bool {
        self.min.x >= -EPSILON_GENERAL
            && self.min.y >= -EPSILON_GENERAL
            && self.max.fits_within(sheet, EPSILON_GENERAL)
    }
}

/// Validation helpers shared by the input models.
pub mod validation {

    /// Validates a strictly positive, finite measure.
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_positive(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates a finite measure that may be zero (e.g. a price).
    pub fn validate_non_negative(value: f64, name: &str) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{} must be a finite number, got: {}", name, value));
        }
        if value < 0.0 {
            return Err(format!("{} must not be negative, got: {}", name, value));
        }
        Ok(())
    }
}
