//! The module responsible for turning an appraisal into a report.
//!
//! The report is a TOML document with a flat table of headline metrics followed by tables for the
//! dispatch windows, the annual cash flows and (optionally) the hourly curves.
use crate::dispatch::Direction;
use crate::finance::CostCategory;
use crate::simulation::Appraisal;
use crate::tariff::PriceTier;
use crate::units::{Dimensionless, Energy, Hours, Money, MoneyPerEnergy, Power};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Headline metrics for a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    /// Net present value
    pub npv: Money,
    /// Internal rate of return (percent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Dimensionless>,
    /// Levelised cost of storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcos: Option<MoneyPerEnergy>,
    /// Payback period in years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_period: Option<u32>,
    /// Benefit-cost ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefit_cost_ratio: Option<Dimensionless>,
    /// Rated usable capacity
    pub rated_capacity: Energy,
    /// Capacity after round-trip losses
    pub effective_capacity: Energy,
    /// Energy drawn from the grid each day in the first year
    pub daily_charge_energy: Energy,
    /// Energy delivered to the grid each day in the first year
    pub daily_discharge_energy: Energy,
    /// Charging cost each day in the first year
    pub daily_charge_cost: Money,
    /// Discharge income each day in the first year
    pub daily_discharge_income: Money,
    /// Energy margin each day in the first year
    pub daily_revenue: Money,
    /// Operating days per year
    pub operation_days: u32,
    /// Energy drawn from the grid in the first year
    pub first_year_charge_energy: Energy,
    /// Energy delivered to the grid in the first year
    pub first_year_discharge_energy: Energy,
    /// Energy margin in the first year
    pub first_year_revenue: Money,
    /// Maintenance cost during the warranty period
    pub warranty_maintenance_cost: Money,
    /// Maintenance cost in the first year after the warranty period
    pub post_warranty_maintenance_cost: Money,
    /// Annual growth in maintenance cost
    pub maintenance_cost_growth_rate: Dimensionless,
    /// Year of the first battery replacement
    pub first_replacement_year: u32,
    /// Cycles since the last replacement at the end of the project
    pub total_cycles: u32,
    /// Capacity at the end of the project as a percentage of rated capacity
    pub current_capacity_percent: Dimensionless,
    /// Monthly change in demand charges (positive for savings)
    pub demand_charge_monthly_impact: Money,
    /// Annual change in demand charges (positive for savings)
    pub demand_charge_annual_impact: Money,
    /// Peak load before dispatch
    pub original_peak_load: Power,
    /// Peak load after dispatch
    pub modified_peak_load: Power,
    /// Reduction in peak load (negative if the peak rose)
    pub peak_load_reduction: Power,
    /// Minimum load before dispatch
    pub original_min_load: Power,
    /// Minimum load after dispatch
    pub modified_min_load: Power,
    /// Average load before dispatch
    pub original_average_load: Power,
    /// Average load after dispatch
    pub modified_average_load: Power,
    /// Daily consumption before dispatch
    pub original_daily_energy: Energy,
    /// Daily consumption after dispatch
    pub modified_daily_energy: Energy,
    /// Load factor before dispatch (percent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_load_factor: Option<Dimensionless>,
    /// Load factor after dispatch (percent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_load_factor: Option<Dimensionless>,
    /// Change in load factor (percentage points)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_factor_improvement: Option<Dimensionless>,
    /// Capacity in each year (starting from year 0) as a percentage of rated capacity
    pub capacity_percentages: Vec<Dimensionless>,
}

/// A dispatch window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRecord {
    /// Charge or discharge
    pub direction: Direction,
    /// Fractional start hour
    pub start: Hours,
    /// Start hour rounded down
    pub start_hour: usize,
    /// End hour rounded down
    pub end_hour: usize,
    /// Power
    pub power: Power,
    /// Overriding price tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_tier: Option<PriceTier>,
    /// Energy price
    pub price: MoneyPerEnergy,
}

/// A year of the cash flow projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRecord {
    /// Year (0 is the investment year)
    pub year: u32,
    /// Net cash flow
    pub net_cash_flow: Money,
    /// Energy margin
    pub revenue: Money,
    /// Maintenance cost
    pub maintenance_cost: Money,
    /// Battery replacement cost
    pub replacement_cost: Money,
    /// Change in demand charges
    pub demand_charge_impact: Money,
    /// Capacity as a percentage of rated capacity
    pub capacity_percent: Dimensionless,
}

/// Price and load for an hour of the day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourRecord {
    /// Hour of the day
    pub hour: usize,
    /// Active tariff tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<PriceTier>,
    /// Energy price
    pub price: MoneyPerEnergy,
    /// Load before dispatch
    pub original_load: Power,
    /// Load after dispatch
    pub modified_load: Power,
}

/// The complete report for a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Headline metrics
    pub metrics: MetricsRecord,
    /// Contribution of each cost category to the LCOS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcos_components: Option<IndexMap<CostCategory, MoneyPerEnergy>>,
    /// Dispatch windows
    pub windows: Vec<WindowRecord>,
    /// Annual cash flows
    pub cash_flows: Vec<YearRecord>,
    /// Hourly price and load curves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly: Option<Vec<HourRecord>>,
}

impl Report {
    /// Build a report from an appraisal
    ///
    /// # Arguments
    ///
    /// * `appraisal` - The appraisal results
    /// * `include_curves` - Whether to include hourly price and load curves
    pub fn new(appraisal: &Appraisal, include_curves: bool) -> Self {
        let metrics = &appraisal.metrics;
        let summary = &appraisal.projection.summary;
        let daily = &summary.first_year_daily;
        let load = &appraisal.load;

        let metrics_record = MetricsRecord {
            npv: metrics.npv,
            irr: metrics.irr,
            lcos: metrics.lcos.as_ref().map(|lcos| lcos.total),
            payback_period: metrics.payback_period,
            benefit_cost_ratio: metrics.benefit_cost_ratio,
            rated_capacity: summary.rated_capacity,
            effective_capacity: summary.effective_capacity,
            daily_charge_energy: daily.charge_energy,
            daily_discharge_energy: daily.discharge_energy,
            daily_charge_cost: daily.charge_cost,
            daily_discharge_income: daily.discharge_income,
            daily_revenue: daily.revenue(),
            operation_days: summary.operation_days,
            first_year_charge_energy: summary.first_year_charge_energy,
            first_year_discharge_energy: summary.first_year_discharge_energy,
            first_year_revenue: summary.first_year_revenue,
            warranty_maintenance_cost: summary.warranty_maintenance_cost,
            post_warranty_maintenance_cost: summary.post_warranty_maintenance_cost,
            maintenance_cost_growth_rate: summary.maintenance_cost_growth_rate,
            first_replacement_year: summary.first_replacement_year,
            total_cycles: summary.total_cycles,
            current_capacity_percent: summary.final_capacity_percent,
            demand_charge_monthly_impact: appraisal.demand_charge.monthly,
            demand_charge_annual_impact: appraisal.demand_charge.annual,
            original_peak_load: load.original.peak,
            modified_peak_load: load.modified.peak,
            peak_load_reduction: load.peak_reduction(),
            original_min_load: load.original.min,
            modified_min_load: load.modified.min,
            original_average_load: load.original.average,
            modified_average_load: load.modified.average,
            original_daily_energy: load.original.daily_energy,
            modified_daily_energy: load.modified.daily_energy,
            original_load_factor: load.original.load_factor,
            modified_load_factor: load.modified.load_factor,
            load_factor_improvement: load.load_factor_improvement(),
            capacity_percentages: summary.capacity_percentages.clone(),
        };

        let windows = appraisal
            .dispatch
            .plan
            .windows
            .iter()
            .map(|window| WindowRecord {
                direction: window.direction,
                start: window.start,
                start_hour: window.start_hour(),
                end_hour: window.end_hour(),
                power: window.power,
                price_tier: window.price_tier,
                price: window.price,
            })
            .collect();

        let investment_year = YearRecord {
            year: 0,
            net_cash_flow: appraisal.projection.cash_flows[0],
            revenue: Money(0.0),
            maintenance_cost: Money(0.0),
            replacement_cost: Money(0.0),
            demand_charge_impact: Money(0.0),
            capacity_percent: Dimensionless(100.0),
        };
        let cash_flows = std::iter::once(investment_year)
            .chain(appraisal.projection.years.iter().map(|year| YearRecord {
                year: year.year,
                net_cash_flow: year.net_cash_flow,
                revenue: year.revenue,
                maintenance_cost: year.maintenance_cost,
                replacement_cost: year.replacement_cost,
                demand_charge_impact: year.demand_charge_impact,
                capacity_percent: year.capacity_percent,
            }))
            .collect();

        let hourly = include_curves.then(|| {
            appraisal
                .prices
                .iter()
                .map(|hourly| HourRecord {
                    hour: hourly.hour,
                    tier: hourly.tier,
                    price: hourly.price,
                    original_load: appraisal.dispatch.original.get(hourly.hour),
                    modified_load: appraisal.dispatch.modified.get(hourly.hour),
                })
                .collect()
        });

        Self {
            metrics: metrics_record,
            lcos_components: metrics.lcos.as_ref().map(|lcos| lcos.components.clone()),
            windows,
            cash_flows,
            hourly,
        }
    }

    /// Render the report as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialise report")
    }

    /// Write the report to a file as TOML
    pub fn write_to_file(&self, file_path: &Path) -> Result<()> {
        fs::write(file_path, self.to_toml()?)
            .with_context(|| format!("Failed to write report to {}", file_path.display()))
    }
}
