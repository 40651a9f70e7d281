//! Hourly load profiles and the generation of representative profiles from named patterns.
use crate::units::{Energy, Hours, Power};
use anyhow::{Result, ensure};
use serde::Serialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The number of hourly values in a load profile
pub const HOURS_PER_DAY: usize = 24;

/// The number of days per month assumed when converting monthly consumption to a daily figure
const DAYS_PER_MONTH: f64 = 30.0;

/// Relative hourly weights for the day/evening double-peak pattern
const DAY_EVENING_PEAK_WEIGHTS: [f64; HOURS_PER_DAY] = [
    15.0, 10.0, 8.0, 7.0, 10.0, // 00:00-04:59
    20.0, 30.0, 45.0, 65.0, 80.0, // 05:00-09:59
    90.0, 95.0, 85.0, 75.0, 60.0, // 10:00-14:59
    55.0, 65.0, 80.0, 100.0, 90.0, // 15:00-19:59
    70.0, 50.0, 35.0, 20.0, // 20:00-23:59
];

/// Relative hourly weights for the balanced pattern
const BALANCED_WEIGHTS: [f64; HOURS_PER_DAY] = [
    50.0, 48.0, 47.0, 46.0, 45.0, // 00:00-04:59
    46.0, 47.0, 48.0, 49.0, 50.0, // 05:00-09:59
    52.0, 53.0, 54.0, 55.0, 54.0, // 10:00-14:59
    53.0, 52.0, 51.0, 50.0, 50.0, // 15:00-19:59
    51.0, 52.0, 51.0, 50.0, // 20:00-23:59
];

/// Relative hourly weights for the night peak pattern
const NIGHT_PEAK_WEIGHTS: [f64; HOURS_PER_DAY] = [
    90.0, 95.0, 100.0, 90.0, 85.0, // 00:00-04:59
    70.0, 60.0, 50.0, 40.0, 35.0, // 05:00-09:59
    30.0, 25.0, 30.0, 35.0, 40.0, // 10:00-14:59
    45.0, 50.0, 55.0, 65.0, 70.0, // 15:00-19:59
    75.0, 80.0, 85.0, 90.0, // 20:00-23:59
];

/// A load profile for a single representative day, with one average power value per hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LoadProfile([Power; HOURS_PER_DAY]);

impl LoadProfile {
    /// Create a new [`LoadProfile`] from hourly power values.
    ///
    /// # Returns
    ///
    /// An error if there are not exactly 24 values or any value is negative or non-finite.
    pub fn new(values: &[Power]) -> Result<Self> {
        let values: [Power; HOURS_PER_DAY] = values.try_into().map_err(|_| {
            anyhow::anyhow!(
                "Load profile must have exactly {HOURS_PER_DAY} hourly values (got {})",
                values.len()
            )
        })?;
        for (hour, value) in values.iter().enumerate() {
            ensure!(
                value.is_finite() && *value >= Power(0.0),
                "Load for hour {hour} must be a finite number greater than or equal to zero \
                (got {value})"
            );
        }

        Ok(Self(values))
    }

    /// Create a profile with the same load in every hour
    pub fn flat(load: Power) -> Result<Self> {
        Self::new(&[load; HOURS_PER_DAY])
    }

    /// Wrap values which are already known to be valid
    pub(crate) fn from_valid(values: [Power; HOURS_PER_DAY]) -> Self {
        debug_assert!(values.iter().all(|value| *value >= Power(0.0)));
        Self(values)
    }

    /// The load in the given hour of the day
    pub fn get(&self, hour: usize) -> Power {
        self.0[hour]
    }

    /// The hourly values
    pub fn values(&self) -> &[Power; HOURS_PER_DAY] {
        &self.0
    }

    /// Iterate over the hourly values
    pub fn iter(&self) -> impl Iterator<Item = Power> + '_ {
        self.0.iter().copied()
    }

    /// Whether every hourly value is zero
    pub fn is_all_zero(&self) -> bool {
        self.iter().all(|value| value == Power(0.0))
    }

    /// Energy consumed over the day
    pub fn daily_energy(&self) -> Energy {
        self.iter().map(|value| value * Hours(1.0)).sum()
    }
}

/// A named shape for a synthesised daily load profile
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Default,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum LoadPattern {
    /// Two peaks, one during the day and one in the early evening, with low demand overnight.
    ///
    /// Typical of residential and commercial sites.
    #[default]
    #[string = "day_evening_peak"]
    DayEveningPeak,
    /// Demand is almost constant throughout the day (e.g. factories running around the clock)
    #[string = "balanced"]
    Balanced,
    /// High demand overnight and lower demand during the day
    #[string = "night_peak"]
    NightPeak,
}

impl LoadPattern {
    /// The relative weight of each hour of the day for this pattern
    fn weights(self) -> &'static [f64; HOURS_PER_DAY] {
        match self {
            LoadPattern::DayEveningPeak => &DAY_EVENING_PEAK_WEIGHTS,
            LoadPattern::Balanced => &BALANCED_WEIGHTS,
            LoadPattern::NightPeak => &NIGHT_PEAK_WEIGHTS,
        }
    }
}

/// Generate a representative daily load profile.
///
/// The pattern's weights are scaled so that the profile's daily energy equals the monthly
/// consumption divided by 30.
///
/// # Arguments
///
/// * `pattern` - The shape of the profile
/// * `monthly_consumption` - Energy consumed per month
pub fn generate_load_profile(
    pattern: LoadPattern,
    monthly_consumption: Energy,
) -> Result<LoadProfile> {
    ensure!(
        monthly_consumption.is_finite() && monthly_consumption >= Energy(0.0),
        "monthly_consumption must be a finite number greater than or equal to zero"
    );

    let daily_consumption = monthly_consumption.value() / DAYS_PER_MONTH;
    let weights = pattern.weights();
    let total_weight: f64 = weights.iter().sum();
    let values = (*weights).map(|weight| Power(weight / total_weight * daily_consumption));

    Ok(LoadProfile::from_valid(values))
}
