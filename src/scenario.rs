//! Defines the `Scenario` struct, which represents the contents of a scenario directory.
//!
//! A scenario directory holds a `scenario.toml` file and, optionally, a `load_profile.csv` file
//! with the hourly load.
use crate::cash_flow::OperatingParameters;
use crate::demand_charge::DemandChargeConfig;
use crate::dispatch::DispatchConfig;
use crate::input::{check_non_negative, input_err_msg, read_csv, read_toml};
use crate::load_profile::{HOURS_PER_DAY, LoadPattern, LoadProfile, generate_load_profile};
use crate::storage::{StorageConfig, StorageRaw};
use crate::tariff::Tariff;
use crate::units::{Dimensionless, Energy, Money, Power};
use anyhow::{Context, Result, bail, ensure};
use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// The name of the main scenario file
pub const SCENARIO_FILE_NAME: &str = "scenario.toml";

/// The name of the optional hourly load file
pub const LOAD_PROFILE_FILE_NAME: &str = "load_profile.csv";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

define_unit_param_default!(default_discount_rate, Dimensionless, 0.06);
define_unit_param_default!(default_opex_percent, Dimensionless, 2.0);

/// The load section of the scenario file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// Explicit hourly load for a representative day
    pub hourly: Option<Vec<Power>>,
    /// Shape of the generated profile, if one is used
    #[serde(default)]
    pub pattern: LoadPattern,
    /// Monthly consumption used to scale the generated profile
    pub monthly_consumption: Option<Energy>,
    /// Whether a profile may be generated when no hourly load is given
    #[serde(default)]
    pub allow_generated_profile: bool,
}

/// Represents the contents of `scenario.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    capex: Money,
    operation_years: u32,
    #[serde(default = "default_discount_rate")]
    discount_rate: Dimensionless,
    #[serde(default = "default_opex_percent")]
    opex_percent: Dimensionless,
    maintenance_cost: Option<Money>,
    #[serde(default)]
    maintenance_cost_growth_rate: Dimensionless,
    #[serde(default)]
    warranty_period: u32,
    cycles_per_year: u32,
    #[serde(default)]
    capacity_degradation_rate: Dimensionless,
    battery_cycle_life: u32,
    #[serde(default)]
    battery_replacement_cost: Money,
    storage: StorageRaw,
    #[serde(default)]
    tariff: Tariff,
    #[serde(default)]
    dispatch: DispatchConfig,
    #[serde(default)]
    demand_charge: DemandChargeConfig,
    #[serde(default)]
    load: LoadConfig,
}

/// A row of `load_profile.csv`
#[derive(Debug, Deserialize, PartialEq)]
struct LoadProfileRow {
    hour: usize,
    load: Power,
}

/// Where the load profile for a scenario came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadSource {
    /// The `hourly` field of `scenario.toml`
    Hourly,
    /// `load_profile.csv`
    File,
    /// Generated from a pattern
    Generated(LoadPattern),
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadSource::Hourly => write!(f, "hourly values in {SCENARIO_FILE_NAME}"),
            LoadSource::File => write!(f, "{LOAD_PROFILE_FILE_NAME}"),
            LoadSource::Generated(_) => write!(f, "generated profile"),
        }
    }
}

/// A complete, validated scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Initial investment
    pub capex: Money,
    /// Number of years of operation
    pub operation_years: u32,
    /// Discount rate (as a fraction)
    pub discount_rate: Dimensionless,
    /// Annual maintenance cost as a percentage of capex, used when `maintenance_cost` is not given
    pub opex_percent: Dimensionless,
    /// Maintenance cost in the first year after the warranty period
    pub maintenance_cost: Option<Money>,
    /// Annual growth in maintenance cost (as a fraction)
    pub maintenance_cost_growth_rate: Dimensionless,
    /// Years of free maintenance
    pub warranty_period: u32,
    /// Operating days per year
    pub cycles_per_year: u32,
    /// Fraction of capacity lost each year
    pub capacity_degradation_rate: Dimensionless,
    /// Cycles after which the battery is replaced
    pub battery_cycle_life: u32,
    /// Cost of a replacement battery
    pub battery_replacement_cost: Money,
    /// The storage system
    pub storage: StorageConfig,
    /// The tariff
    pub tariff: Tariff,
    /// Dispatch schedule
    pub dispatch: DispatchConfig,
    /// Demand charges
    pub demand_charge: DemandChargeConfig,
    /// The load before dispatch
    pub load: LoadProfile,
    /// Where the load came from
    pub load_source: LoadSource,
}

/// Check that the `operation_years` parameter is valid
fn check_operation_years(value: u32) -> Result<()> {
    ensure!(value > 0, "operation_years cannot be zero");

    Ok(())
}

/// Check that the `cycles_per_year` parameter is valid
fn check_cycles_per_year(value: u32) -> Result<()> {
    ensure!(value > 0, "cycles_per_year cannot be zero");

    Ok(())
}

/// Check that the `battery_cycle_life` parameter is valid
fn check_battery_cycle_life(value: u32) -> Result<()> {
    ensure!(value > 0, "battery_cycle_life cannot be zero");

    Ok(())
}

/// Check that the `capacity_degradation_rate` parameter is valid
fn check_capacity_degradation_rate(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0) && value < Dimensionless(1.0),
        "capacity_degradation_rate must be at least zero and less than one (got {value})"
    );

    Ok(())
}

/// Read the hourly load from a CSV file.
///
/// The file must have exactly one row for each hour of the day.
fn read_load_profile_csv(file_path: &Path) -> Result<LoadProfile> {
    let rows: Vec<LoadProfileRow> = read_csv(file_path)?;
    ensure!(
        rows.len() == HOURS_PER_DAY,
        "Load profile must have exactly {HOURS_PER_DAY} rows (got {})",
        rows.len()
    );

    let mut values = [None; HOURS_PER_DAY];
    for row in rows {
        ensure!(
            row.hour < HOURS_PER_DAY,
            "Invalid hour {} (must be between 0 and 23)",
            row.hour
        );
        ensure!(
            values[row.hour].replace(row.load).is_none(),
            "Hour {} appears more than once",
            row.hour
        );
    }

    // All hours are present as there are 24 unique rows
    let values: Vec<Power> = values.into_iter().flatten().collect();
    LoadProfile::new(&values)
}

impl LoadConfig {
    /// Choose the load profile for a scenario.
    ///
    /// An explicit profile is used if one is given and is not all zero. Otherwise a profile is
    /// generated, but only if the scenario allows it.
    fn resolve(&self, from_file: Option<LoadProfile>) -> Result<(LoadProfile, LoadSource)> {
        let explicit = match (&self.hourly, from_file) {
            (Some(_), Some(_)) => bail!(
                "The load must be given either as load.hourly or in {LOAD_PROFILE_FILE_NAME}, \
                not both"
            ),
            (Some(hourly), None) => Some((
                LoadProfile::new(hourly).context("Invalid value for load.hourly")?,
                LoadSource::Hourly,
            )),
            (None, Some(profile)) => Some((profile, LoadSource::File)),
            (None, None) => None,
        };

        match explicit {
            Some((profile, source)) if !profile.is_all_zero() => Ok((profile, source)),
            _ => {
                ensure!(
                    self.allow_generated_profile,
                    "No load profile was given (or every value is zero). Set \
                    load.allow_generated_profile = true to use a generated profile instead."
                );
                let monthly_consumption = self.monthly_consumption.context(
                    "load.monthly_consumption must be given when generating a load profile",
                )?;
                warn!(
                    "No load profile given; generating a {} profile for a monthly consumption of \
                    {monthly_consumption} kWh",
                    self.pattern
                );
                let profile = generate_load_profile(self.pattern, monthly_consumption)
                    .context("Invalid value for load.monthly_consumption")?;

                Ok((profile, LoadSource::Generated(self.pattern)))
            }
        }
    }
}

impl ScenarioFile {
    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        // capex
        check_non_negative("capex", self.capex.value())?;

        // operation_years
        check_operation_years(self.operation_years)?;

        // discount_rate
        check_non_negative("discount_rate", self.discount_rate.value())?;

        // opex_percent
        check_non_negative("opex_percent", self.opex_percent.value())?;

        // maintenance_cost
        if let Some(maintenance_cost) = self.maintenance_cost {
            check_non_negative("maintenance_cost", maintenance_cost.value())?;
        }

        // maintenance_cost_growth_rate
        check_non_negative(
            "maintenance_cost_growth_rate",
            self.maintenance_cost_growth_rate.value(),
        )?;

        // cycles_per_year
        check_cycles_per_year(self.cycles_per_year)?;

        // capacity_degradation_rate
        check_capacity_degradation_rate(self.capacity_degradation_rate)?;

        // battery_cycle_life
        check_battery_cycle_life(self.battery_cycle_life)?;

        // battery_replacement_cost
        check_non_negative(
            "battery_replacement_cost",
            self.battery_replacement_cost.value(),
        )?;

        // storage is validated on conversion

        self.tariff.validate()?;
        self.dispatch.validate()?;
        self.demand_charge.validate()?;

        Ok(())
    }
}

impl Scenario {
    /// Read a scenario from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `scenario_dir` - Folder containing the scenario files
    ///
    /// # Returns
    ///
    /// The validated scenario or an error naming the file and field which are invalid
    pub fn from_path<P: AsRef<Path>>(scenario_dir: P) -> Result<Scenario> {
        let scenario_dir = scenario_dir.as_ref();
        let file_path = scenario_dir.join(SCENARIO_FILE_NAME);
        let scenario_file: ScenarioFile = read_toml(&file_path)?;

        let load_file_path = scenario_dir.join(LOAD_PROFILE_FILE_NAME);
        let load_from_file = if load_file_path.is_file() {
            Some(
                read_load_profile_csv(&load_file_path)
                    .with_context(|| input_err_msg(&load_file_path))?,
            )
        } else {
            None
        };

        Self::from_file(scenario_file, load_from_file).with_context(|| input_err_msg(&file_path))
    }

    /// Validate the contents of the scenario file and assemble the scenario
    fn from_file(file: ScenarioFile, load_from_file: Option<LoadProfile>) -> Result<Scenario> {
        file.validate()?;
        let storage = StorageConfig::try_from(file.storage)?;
        let (load, load_source) = file.load.resolve(load_from_file)?;
        info!("Using load from {load_source}");

        Ok(Scenario {
            capex: file.capex,
            operation_years: file.operation_years,
            discount_rate: file.discount_rate,
            opex_percent: file.opex_percent,
            maintenance_cost: file.maintenance_cost,
            maintenance_cost_growth_rate: file.maintenance_cost_growth_rate,
            warranty_period: file.warranty_period,
            cycles_per_year: file.cycles_per_year,
            capacity_degradation_rate: file.capacity_degradation_rate,
            battery_cycle_life: file.battery_cycle_life,
            battery_replacement_cost: file.battery_replacement_cost,
            storage,
            tariff: file.tariff,
            dispatch: file.dispatch,
            demand_charge: file.demand_charge,
            load,
            load_source,
        })
    }

    /// The maintenance cost in the first year after the warranty period.
    ///
    /// This is `maintenance_cost` if given, otherwise `opex_percent` of the capex.
    pub fn base_maintenance_cost(&self) -> Money {
        self.maintenance_cost
            .unwrap_or_else(|| self.capex * self.opex_percent / Dimensionless(100.0))
    }

    /// Operating parameters for the cash flow projection
    pub fn operating_parameters(&self, demand_charge_impact: Money) -> OperatingParameters {
        OperatingParameters {
            capex: self.capex,
            operation_years: self.operation_years,
            cycles_per_year: self.cycles_per_year,
            capacity_degradation_rate: self.capacity_degradation_rate,
            battery_cycle_life: self.battery_cycle_life,
            battery_replacement_cost: self.battery_replacement_cost,
            warranty_period: self.warranty_period,
            maintenance_cost: self.base_maintenance_cost(),
            maintenance_cost_growth_rate: self.maintenance_cost_growth_rate,
            demand_charge_impact,
        }
    }
}
