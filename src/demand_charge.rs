//! Demand charges: the effect of a change in peak load on the monthly capacity bill.
use crate::input::check_non_negative;
use crate::units::{Dimensionless, Money, MoneyPerPower, Power};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The number of billing months in a year
const MONTHS_PER_YEAR: f64 = 12.0;

/// The demand charge section of a scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemandChargeConfig {
    /// Whether demand charges apply
    #[serde(default)]
    pub enabled: bool,
    /// Charge per kW of peak demand per month
    #[serde(default)]
    pub rate: MoneyPerPower,
}

impl DemandChargeConfig {
    /// Check that the rate is valid
    pub fn validate(&self) -> Result<()> {
        check_non_negative("demand_charge.rate", self.rate.value())
    }
}

/// The effect of dispatch on demand charges.
///
/// Positive values are savings; negative values are a rise in cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DemandChargeImpact {
    /// Change in the monthly bill
    pub monthly: Money,
    /// Change in the annual bill
    pub annual: Money,
}

/// Calculate the demand charge impact of a reduction in peak load
///
/// # Arguments
///
/// * `peak_reduction` - Original peak minus modified peak (negative if the peak rose)
/// * `config` - Whether demand charges apply and at what rate
pub fn demand_charge_impact(
    peak_reduction: Power,
    config: &DemandChargeConfig,
) -> DemandChargeImpact {
    if !config.enabled {
        return DemandChargeImpact::default();
    }

    let monthly = peak_reduction * config.rate;
    DemandChargeImpact {
        monthly,
        annual: monthly * Dimensionless(MONTHS_PER_YEAR),
    }
}
