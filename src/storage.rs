//! The physical parameters of the storage system.
use crate::input::{check_positive, deserialise_proportion_nonzero};
use crate::units::{Dimensionless, Energy, Hours, Power};
use anyhow::{Result, bail};
use serde::Deserialize;

/// The storage parameters as they appear in the scenario file.
///
/// The size of the system is given either by its rated power and capacity or by a number of
/// identical cabinets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageRaw {
    /// Rated power of the whole system
    pub power: Option<Power>,
    /// Usable energy capacity of the whole system
    pub capacity: Option<Energy>,
    /// Number of cabinets
    pub cabinet_count: Option<u32>,
    /// Rated power of a single cabinet
    pub cabinet_power: Option<Power>,
    /// Usable capacity of a single cabinet
    pub cabinet_capacity: Option<Energy>,
    /// Fraction of grid energy which is stored when charging
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub charging_efficiency: Dimensionless,
    /// Fraction of stored energy which is delivered when discharging
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub discharging_efficiency: Dimensionless,
}

/// Parameters for the storage system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageConfig {
    /// Rated charge/discharge power
    pub power: Power,
    /// Usable energy capacity when new
    pub capacity: Energy,
    /// Fraction of grid energy which is stored when charging
    pub charging_efficiency: Dimensionless,
    /// Fraction of stored energy which is delivered when discharging
    pub discharging_efficiency: Dimensionless,
}

impl StorageConfig {
    /// Build a configuration from a number of identical cabinets
    pub fn from_cabinets(
        cabinet_count: u32,
        cabinet_power: Power,
        cabinet_capacity: Energy,
        charging_efficiency: Dimensionless,
        discharging_efficiency: Dimensionless,
    ) -> Self {
        let count = Dimensionless(f64::from(cabinet_count));
        Self {
            power: count * cabinet_power,
            capacity: count * cabinet_capacity,
            charging_efficiency,
            discharging_efficiency,
        }
    }

    /// How long the system can discharge at rated power
    pub fn duration(&self) -> Hours {
        self.capacity / self.power
    }

    /// The round-trip efficiency
    pub fn round_trip_efficiency(&self) -> Dimensionless {
        self.charging_efficiency * self.discharging_efficiency
    }

    /// Capacity which can be delivered back to the grid after losses
    pub fn effective_capacity(&self) -> Energy {
        self.capacity * self.round_trip_efficiency()
    }

    /// Check that power and capacity are valid
    fn validate(&self) -> Result<()> {
        check_positive("storage.power", self.power.value())?;
        check_positive("storage.capacity", self.capacity.value())?;

        Ok(())
    }
}

impl TryFrom<StorageRaw> for StorageConfig {
    type Error = anyhow::Error;

    fn try_from(raw: StorageRaw) -> Result<Self> {
        let config = match raw {
            StorageRaw {
                power: Some(power),
                capacity: Some(capacity),
                cabinet_count: None,
                cabinet_power: None,
                cabinet_capacity: None,
                ..
            } => StorageConfig {
                power,
                capacity,
                charging_efficiency: raw.charging_efficiency,
                discharging_efficiency: raw.discharging_efficiency,
            },
            StorageRaw {
                power: None,
                capacity: None,
                cabinet_count: Some(count),
                cabinet_power: Some(cabinet_power),
                cabinet_capacity: Some(cabinet_capacity),
                ..
            } => {
                check_positive("storage.cabinet_count", f64::from(count))?;
                check_positive("storage.cabinet_power", cabinet_power.value())?;
                check_positive("storage.cabinet_capacity", cabinet_capacity.value())?;
                StorageConfig::from_cabinets(
                    count,
                    cabinet_power,
                    cabinet_capacity,
                    raw.charging_efficiency,
                    raw.discharging_efficiency,
                )
            }
            _ => bail!(
                "storage must specify either power and capacity, or cabinet_count, \
                cabinet_power and cabinet_capacity"
            ),
        };
        config.validate()?;

        Ok(config)
    }
}
