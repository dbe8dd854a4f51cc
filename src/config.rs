use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hull::{HullOptions, HullType};

pub const DEFAULT_SPEED_KMH: f64 = 48.28;
pub const DEFAULT_ALPHA: f64 = 30.0;
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Settings for an [`IsochroneGenerator`](crate::IsochroneGenerator).
///
/// Every field has a default, so partial configs deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Speed (km/h) used for segments without a readable speed limit.
    pub default_speed_kmh: f64,
    /// Concavity of the alpha-shape boundary. 0 yields the convex hull.
    pub alpha: f64,
    /// Boundary strategy used when a call does not pick one.
    pub hull_type: HullType,
    /// Number of computed isochrones kept for reuse.
    pub cache_capacity: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_speed_kmh: DEFAULT_SPEED_KMH,
            alpha: DEFAULT_ALPHA,
            hull_type: HullType::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl GeneratorConfig {
    pub fn with_default_speed(mut self, default_speed_kmh: f64) -> Self {
        self.default_speed_kmh = default_speed_kmh;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_hull_type(mut self, hull_type: HullType) -> Self {
        self.hull_type = hull_type;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn hull_options(&self) -> HullOptions {
        HullOptions {
            hull_type: self.hull_type,
            alpha: self.alpha,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.default_speed_kmh.is_finite() && self.default_speed_kmh > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "default speed must be positive, got {}",
                self.default_speed_kmh
            )));
        }
        self.hull_options().validate()
    }
}
