//! Fixtures for tests

use crate::demand_charge::DemandChargeConfig;
use crate::dispatch::{CycleConfig, DispatchConfig, DispatchMode};
use crate::load_profile::LoadProfile;
use crate::scenario::{LoadSource, Scenario};
use crate::storage::StorageConfig;
use crate::tariff::{Tariff, TierSchedule, TimeOfDay, TimeRange};
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy, MoneyPerPower, Power};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A tier active for a single range of whole hours
fn tier(price: f64, start: u16, end: u16) -> TierSchedule {
    TierSchedule {
        price: MoneyPerEnergy(price),
        periods: vec![TimeRange::new(
            TimeOfDay::new(start, 0).unwrap(),
            TimeOfDay::new(end, 0).unwrap(),
        )],
    }
}

#[fixture]
pub fn tariff() -> Tariff {
    Tariff {
        sharp_peak: tier(1.2, 17, 19),
        peak: tier(0.95, 8, 11),
        flat: TierSchedule {
            price: MoneyPerEnergy(0.65),
            periods: vec![
                TimeRange::new(
                    TimeOfDay::new(11, 0).unwrap(),
                    TimeOfDay::new(17, 0).unwrap(),
                ),
                TimeRange::new(
                    TimeOfDay::new(19, 0).unwrap(),
                    TimeOfDay::new(23, 0).unwrap(),
                ),
            ],
        },
        valley: tier(0.35, 7, 8),
        deep_valley: tier(0.2, 23, 7),
    }
}

#[fixture]
pub fn storage() -> StorageConfig {
    StorageConfig {
        power: Power(125.0),
        capacity: Energy(250.0),
        charging_efficiency: Dimensionless(0.95),
        discharging_efficiency: Dimensionless(0.95),
    }
}

/// A single-cycle scenario with a flat 50 kW load, charging at 23:00 and discharging at 17:00
#[fixture]
pub fn scenario(tariff: Tariff, storage: StorageConfig) -> Scenario {
    Scenario {
        capex: Money(260000.0),
        operation_years: 10,
        discount_rate: Dimensionless(0.06),
        opex_percent: Dimensionless(2.0),
        maintenance_cost: None,
        maintenance_cost_growth_rate: Dimensionless(0.03),
        warranty_period: 3,
        cycles_per_year: 330,
        capacity_degradation_rate: Dimensionless(0.02),
        battery_cycle_life: 6000,
        battery_replacement_cost: Money(120000.0),
        storage,
        tariff,
        dispatch: DispatchConfig {
            mode: DispatchMode::Single,
            first: CycleConfig {
                charge_start: Some(TimeOfDay::new(23, 0).unwrap()),
                discharge_start: Some(TimeOfDay::new(17, 0).unwrap()),
                ..Default::default()
            },
            second: CycleConfig::default(),
        },
        demand_charge: DemandChargeConfig {
            enabled: true,
            rate: MoneyPerPower(40.0),
        },
        load: LoadProfile::flat(Power(50.0)).unwrap(),
        load_source: LoadSource::Hourly,
    }
}
