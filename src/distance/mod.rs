//! Distance computation for similarity search.

pub mod scalar;

pub use scalar::{dot_product, euclidean_distance};

use crate::error::{QuiverDbError, Result};
use serde::{Deserialize, Serialize};

/// Supported distance metrics for similarity search.
///
/// Matches the space types accepted at index creation: `"L2"` maps to
/// [`DistanceMetric::Euclidean`], `"IP"` to [`DistanceMetric::InnerProduct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean (L2) distance: sqrt(sum((a[i] - b[i])^2))
    Euclidean,
    /// Negative dot product: -dot(a, b)
    /// Negated for min-heap compatibility (larger dot = smaller distance).
    InnerProduct,
}

impl DistanceMetric {
    /// Parse a space type string from index settings.
    pub fn from_space_type(space: &str) -> Result<Self> {
        match space {
            "L2" => Ok(DistanceMetric::Euclidean),
            "IP" => Ok(DistanceMetric::InnerProduct),
            other => Err(QuiverDbError::bad_request(format!(
                "unknown space type: {other} (expected \"IP\" or \"L2\")"
            ))),
        }
    }

    /// Compute the distance between two vectors using this metric.
    ///
    /// # Panics
    /// Panics if the vectors have different dimensions.
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::InnerProduct => -dot_product(a, b),
        }
    }
}
