//! Peak, minimum and average demand of a load profile, before and after dispatch.
use crate::load_profile::{HOURS_PER_DAY, LoadProfile};
use crate::units::{Dimensionless, Energy, Power};
use serde::Serialize;

/// Summary statistics for a daily load profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadMetrics {
    /// The highest hourly load
    pub peak: Power,
    /// The lowest hourly load
    pub min: Power,
    /// The mean hourly load
    pub average: Power,
    /// Energy consumed over the day
    pub daily_energy: Energy,
    /// Average load as a percentage of peak load. Undefined when the peak is zero.
    pub load_factor: Option<Dimensionless>,
}

impl LoadMetrics {
    /// Calculate metrics for a load profile
    pub fn from_profile(profile: &LoadProfile) -> Self {
        let peak = profile.iter().fold(Power(0.0), Power::max);
        let min = profile.iter().fold(Power(f64::INFINITY), Power::min);
        #[allow(clippy::cast_precision_loss)]
        let average = profile.iter().sum::<Power>() / Dimensionless(HOURS_PER_DAY as f64);
        let load_factor =
            (peak > Power(0.0)).then(|| average / peak * Dimensionless(100.0));

        Self {
            peak,
            min,
            average,
            daily_energy: profile.daily_energy(),
            load_factor,
        }
    }
}

/// A comparison of the load before and after dispatch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadComparison {
    /// Metrics for the original load
    pub original: LoadMetrics,
    /// Metrics for the load after dispatch
    pub modified: LoadMetrics,
}

impl LoadComparison {
    /// Compare two load profiles
    pub fn new(original: &LoadProfile, modified: &LoadProfile) -> Self {
        Self {
            original: LoadMetrics::from_profile(original),
            modified: LoadMetrics::from_profile(modified),
        }
    }

    /// Reduction in peak load. Negative if dispatch raised the peak.
    pub fn peak_reduction(&self) -> Power {
        self.original.peak - self.modified.peak
    }

    /// Change in load factor, in percentage points. Undefined if either load factor is.
    pub fn load_factor_improvement(&self) -> Option<Dimensionless> {
        Some(self.modified.load_factor? - self.original.load_factor?)
    }
}
