//! Geometric helpers for the packing heuristic.
//!
//! The engine never solves an actual 3D layout. Feasibility is approximated in
//! two steps:
//! - a dimension pre-check (`fits`): the item's sorted edges must each be no
//!   longer than the container's sorted edges,
//! - a capacity check on volume sums (`waste_after`): the volume still free in
//!   a partially filled box must cover the item's volume.
//!
//! Both are necessary, neither is sufficient. The outputs of the service depend
//! on this exact pair of checks, so a stricter solver must not replace them.

use crate::types::Dimensions;

/// Volume of a dimension triple.
#[inline]
pub fn volume(dims: &Dimensions) -> f64 {
    dims.height() * dims.width() * dims.length()
}

/// Checks whether `item` fits into `container` under some axis permutation.
///
/// Both triples are sorted ascending and compared element-wise.
///
/// # Examples
/// ```
/// use packaging_optimizer::geometry::fits;
/// use packaging_optimizer::types::Dimensions;
///
/// let item = Dimensions::new(80.0, 30.0, 40.0).unwrap();
/// let container = Dimensions::new(30.0, 40.0, 80.0).unwrap();
/// assert!(fits(&item, &container));
/// ```
pub fn fits(item: &Dimensions, container: &Dimensions) -> bool {
    let item_edges = item.sorted_edges();
    let container_edges = container.sorted_edges();

    item_edges
        .iter()
        .zip(container_edges.iter())
        .all(|(i, c)| i <= c)
}

/// Volume left over after adding `item_volume` to a box of `capacity` that
/// already holds `used` volume.
///
/// Returns `None` if the item would exceed the capacity.
#[inline]
pub fn waste_after(capacity: f64, used: f64, item_volume: f64) -> Option<f64> {
    if used + item_volume <= capacity {
        Some(capacity - used - item_volume)
    } else {
        None
    }
}
