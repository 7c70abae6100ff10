//! Common value types for box and product geometry.
//!
//! `Dimensions` is the only way lengths enter the engine. Its constructor
//! rejects non-positive and non-finite values, so every triple that reaches
//! the packing code is already known to be valid.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::geometry;
use crate::model::ValidationError;

/// Three positive edge lengths (height, width, length).
///
/// The order of the edges carries no meaning for packing: items may be
/// rotated into any of their six orientations.
///
/// # Examples
/// ```
/// use packaging_optimizer::types::Dimensions;
///
/// let dims = Dimensions::new(5.0, 10.0, 3.0).unwrap();
/// assert_eq!(dims.volume(), 150.0);
/// assert!(Dimensions::new(0.0, 10.0, 3.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawDimensions")]
#[schema(example = json!({ "height": 30.0, "width": 40.0, "length": 80.0 }))]
pub struct Dimensions {
    height: f64,
    width: f64,
    length: f64,
}

impl Dimensions {
    /// Creates a validated dimension triple.
    pub fn new(height: f64, width: f64, length: f64) -> Result<Self, ValidationError> {
        validate_edge(height, "height")?;
        validate_edge(width, "width")?;
        validate_edge(length, "length")?;
        let dims = Self {
            height,
            width,
            length,
        };
        // Capacity arithmetic needs a finite volume.
        if !dims.volume().is_finite() {
            return Err(ValidationError::InvalidDimension(format!(
                "volume of {} x {} x {} is not representable",
                height, width, length
            )));
        }
        Ok(dims)
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Converts to tuple format (height, width, length).
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.height, self.width, self.length)
    }

    /// Edges sorted ascending, i.e. the orientation-independent shape.
    pub fn sorted_edges(&self) -> [f64; 3] {
        let mut edges = [self.height, self.width, self.length];
        edges.sort_by(f64::total_cmp);
        edges
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        geometry::volume(self)
    }

    /// Checks whether `self` fits inside `container` under some axis permutation.
    #[inline]
    pub fn fits_within(&self, container: &Self) -> bool {
        geometry::fits(self, container)
    }
}

#[derive(Deserialize)]
struct RawDimensions {
    height: f64,
    width: f64,
    length: f64,
}

impl TryFrom<RawDimensions> for Dimensions {
    type Error = ValidationError;

    fn try_from(raw: RawDimensions) -> Result<Self, Self::Error> {
        Self::new(raw.height, raw.width, raw.length)
    }
}

fn validate_edge(value: f64, name: &str) -> Result<(), ValidationError> {
    if value.is_nan() || value.is_infinite() || value <= 0.0 {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be a positive finite number, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Trait for anything with a spatial extent.
///
/// Products and box templates both implement it, so the engine can ask
/// either one for its volume or test a fit without caring which is which.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Dimensions;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }

    /// Checks if this object fits in the given container under any rotation.
    fn fits_in(&self, container: &impl Dimensional) -> bool {
        self.dimensions().fits_within(&container.dimensions())
    }
}

impl Dimensional for Dimensions {
    fn dimensions(&self) -> Dimensions {
        *self
    }
}
