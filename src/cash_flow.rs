//! Projection of the physical operation of the storage into annual cash flows.
//!
//! Year 0 holds the initial investment. Each later year earns the margin between discharge income
//! and charging cost on every operating day, less maintenance and any battery replacement. Capacity
//! degrades year on year until the battery is replaced.
use crate::dispatch::{Direction, DispatchPlan};
use crate::finance::AnnualCosts;
use crate::storage::StorageConfig;
use crate::units::{Dimensionless, Energy, Money};
use log::{debug, info};
use serde::Serialize;

/// Parameters governing the operation and cost of the storage over its lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingParameters {
    /// Initial investment
    pub capex: Money,
    /// Number of years of operation
    pub operation_years: u32,
    /// Number of operating days (one set of cycles each) per year
    pub cycles_per_year: u32,
    /// Fraction of capacity lost each year
    pub capacity_degradation_rate: Dimensionless,
    /// Number of cycles after which the battery must be replaced
    pub battery_cycle_life: u32,
    /// Cost of replacing the battery
    pub battery_replacement_cost: Money,
    /// Years during which maintenance is free
    pub warranty_period: u32,
    /// Maintenance cost in the first year after the warranty period
    pub maintenance_cost: Money,
    /// Annual growth in maintenance cost
    pub maintenance_cost_growth_rate: Dimensionless,
    /// Annual change in demand charges (positive for savings)
    pub demand_charge_impact: Money,
}

impl OperatingParameters {
    /// The maintenance cost for the given year.
    ///
    /// Zero within the warranty period, then growing at a fixed annual rate.
    pub fn maintenance_cost_in(&self, year: u32) -> Money {
        if year == 0 || year <= self.warranty_period {
            return Money(0.0);
        }

        let years_after_warranty = year - self.warranty_period - 1;
        let growth = (1.0 + self.maintenance_cost_growth_rate.value())
            .powf(f64::from(years_after_warranty));
        self.maintenance_cost * Dimensionless(growth)
    }

    /// The first year in which the battery is replaced, ignoring the project horizon
    pub fn first_replacement_year(&self) -> u32 {
        self.battery_cycle_life / self.cycles_per_year
    }
}

/// Energy flows and money for a single operating day
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyOperation {
    /// Energy drawn from the grid
    pub charge_energy: Energy,
    /// Energy delivered to the grid
    pub discharge_energy: Energy,
    /// Cost of the energy drawn from the grid
    pub charge_cost: Money,
    /// Income from the energy delivered to the grid
    pub discharge_income: Money,
}

impl DailyOperation {
    /// Calculate a day's operation for the given usable capacity.
    ///
    /// Each window stores the lesser of its nominal energy and its share of the usable capacity.
    pub fn new(plan: &DispatchPlan, storage: &StorageConfig, capacity: Energy) -> Self {
        let mut daily = Self::default();
        for window in &plan.windows {
            let share = window.power / storage.power;
            let stored = window.nominal_energy().min(capacity * share);
            match window.direction {
                Direction::Charge => {
                    let energy = stored / storage.charging_efficiency;
                    daily.charge_energy += energy;
                    daily.charge_cost += energy * window.price;
                }
                Direction::Discharge => {
                    let energy = stored * storage.discharging_efficiency;
                    daily.discharge_energy += energy;
                    daily.discharge_income += energy * window.price;
                }
            }
        }

        daily
    }

    /// Income less charging cost
    pub fn revenue(&self) -> Money {
        self.discharge_income - self.charge_cost
    }
}

/// The projection for a single year of operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearProjection {
    /// The year (1 is the first year of operation)
    pub year: u32,
    /// Usable capacity during the year
    pub capacity: Energy,
    /// A typical day's operation
    pub daily: DailyOperation,
    /// Energy margin over the whole year
    pub revenue: Money,
    /// Maintenance cost
    pub maintenance_cost: Money,
    /// Battery replacement cost (zero unless the battery was replaced this year)
    pub replacement_cost: Money,
    /// Change in demand charges
    pub demand_charge_impact: Money,
    /// Net cash flow for the year
    pub net_cash_flow: Money,
    /// Cycles since the last battery replacement, at the end of the year
    pub cycles_since_replacement: u32,
    /// Usable capacity after any replacement, as a percentage of rated capacity
    pub capacity_percent: Dimensionless,
}

impl YearProjection {
    /// Costs and discharged energy for the year
    pub fn annual_costs(&self, cycles_per_year: u32) -> AnnualCosts {
        let days = Dimensionless(f64::from(cycles_per_year));
        AnnualCosts {
            operation_and_maintenance: self.maintenance_cost,
            charging: self.daily.charge_cost * days,
            replacement: self.replacement_cost,
            discharged_energy: self.daily.discharge_energy * days,
        }
    }
}

/// A summary of the operation of the storage over the project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    /// Rated usable capacity
    pub rated_capacity: Energy,
    /// Capacity which can be delivered back after losses
    pub effective_capacity: Energy,
    /// Operation on a typical day in the first year
    pub first_year_daily: DailyOperation,
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
    /// Remaining capacity at the end of the project, as a percentage of rated capacity
    pub final_capacity_percent: Dimensionless,
    /// Capacity at the end of each year (starting from year 0) as a percentage of rated capacity
    pub capacity_percentages: Vec<Dimensionless>,
}

/// Annual cash flows and the operation behind them
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlowProjection {
    /// Net cash flow for years 0 to N
    pub cash_flows: Vec<Money>,
    /// Details for years 1 to N
    pub years: Vec<YearProjection>,
    /// Summary of operation
    pub summary: OperationSummary,
}

impl CashFlowProjection {
    /// Costs and discharged energy for years 1 to N
    pub fn annual_costs(&self) -> Vec<AnnualCosts> {
        let cycles_per_year = self.summary.operation_days;
        self.years
            .iter()
            .map(|year| year.annual_costs(cycles_per_year))
            .collect()
    }
}

/// Project cash flows over the lifetime of the storage
///
/// # Arguments
///
/// * `params` - Operating and cost parameters
/// * `storage` - The storage system
/// * `plan` - The daily dispatch plan, with prices for each window
pub fn project_cash_flows(
    params: &OperatingParameters,
    storage: &StorageConfig,
    plan: &DispatchPlan,
) -> CashFlowProjection {
    let percent_of_rated = |capacity: Energy| capacity / storage.capacity * Dimensionless(100.0);
    let days = Dimensionless(f64::from(params.cycles_per_year));

    let mut cash_flows = vec![-params.capex];
    let mut capacity_percentages = vec![Dimensionless(100.0)];
    let mut years = Vec::new();
    let mut capacity = storage.capacity;
    let mut cycles: u32 = 0;
    for year in 1..=params.operation_years {
        let daily = DailyOperation::new(plan, storage, capacity);
        let revenue = daily.revenue() * days;
        let maintenance_cost = params.maintenance_cost_in(year);
        let used_capacity = capacity;

        cycles += params.cycles_per_year;
        let replaced = cycles > params.battery_cycle_life;
        let replacement_cost = if replaced {
            info!("Battery replaced in year {year} after {cycles} cycles");
            cycles = 0;
            capacity = storage.capacity;
            params.battery_replacement_cost
        } else {
            Money(0.0)
        };

        let net_cash_flow =
            revenue - maintenance_cost - replacement_cost + params.demand_charge_impact;
        debug!("Year {year}: capacity {used_capacity} kWh, net cash flow {net_cash_flow}");

        let capacity_percent = percent_of_rated(capacity);
        years.push(YearProjection {
            year,
            capacity: used_capacity,
            daily,
            revenue,
            maintenance_cost,
            replacement_cost,
            demand_charge_impact: params.demand_charge_impact,
            net_cash_flow,
            cycles_since_replacement: cycles,
            capacity_percent,
        });
        cash_flows.push(net_cash_flow);
        capacity_percentages.push(capacity_percent);

        if !replaced {
            capacity = capacity * (Dimensionless(1.0) - params.capacity_degradation_rate);
        }
    }

    let first_year_daily = years.first().map_or_else(DailyOperation::default, |year| year.daily);
    let summary = OperationSummary {
        rated_capacity: storage.capacity,
        effective_capacity: storage.effective_capacity(),
        first_year_daily,
        operation_days: params.cycles_per_year,
        first_year_charge_energy: first_year_daily.charge_energy * days,
        first_year_discharge_energy: first_year_daily.discharge_energy * days,
        first_year_revenue: first_year_daily.revenue() * days,
        warranty_maintenance_cost: Money(0.0),
        post_warranty_maintenance_cost: params.maintenance_cost,
        maintenance_cost_growth_rate: params.maintenance_cost_growth_rate,
        first_replacement_year: params.first_replacement_year(),
        total_cycles: cycles,
        final_capacity_percent: percent_of_rated(capacity),
        capacity_percentages,
    };

    CashFlowProjection {
        cash_flows,
        years,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchMode, DispatchWindow};
    use crate::units::{Hours, MoneyPerEnergy, Power};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn storage() -> StorageConfig {
        StorageConfig {
            power: Power(125.0),
            capacity: Energy(250.0),
            charging_efficiency: Dimensionless(1.0),
            discharging_efficiency: Dimensionless(1.0),
        }
    }

    fn window(direction: Direction, start: f64, power: f64, price: f64) -> DispatchWindow {
        DispatchWindow {
            direction,
            start: Hours(start),
            power: Power(power),
            price_tier: None,
            price: MoneyPerEnergy(price),
        }
    }

    #[fixture]
    fn plan() -> DispatchPlan {
        DispatchPlan {
            mode: DispatchMode::Single,
            windows: vec![
                window(Direction::Charge, 2.0, 125.0, 0.2),
                window(Direction::Discharge, 18.0, 125.0, 1.0),
            ],
        }
    }

    #[fixture]
    fn params() -> OperatingParameters {
        OperatingParameters {
            capex: Money(100000.0),
            operation_years: 5,
            cycles_per_year: 300,
            capacity_degradation_rate: Dimensionless(0.0),
            battery_cycle_life: 6000,
            battery_replacement_cost: Money(50000.0),
            warranty_period: 2,
            maintenance_cost: Money(1000.0),
            maintenance_cost_growth_rate: Dimensionless(0.1),
            demand_charge_impact: Money(0.0),
        }
    }

    #[rstest]
    #[case(0, 0.0)]
    #[case(1, 0.0)]
    #[case(2, 0.0)]
    #[case(3, 1000.0)]
    #[case(4, 1100.0)]
    #[case(5, 1210.0)]
    fn test_maintenance_cost(
        params: OperatingParameters,
        #[case] year: u32,
        #[case] expected: f64,
    ) {
        assert_approx_eq!(
            Money,
            params.maintenance_cost_in(year),
            Money(expected),
            epsilon = 1e-9
        );
    }

    #[rstest]
    fn test_daily_operation(plan: DispatchPlan) {
        let storage = StorageConfig {
            charging_efficiency: Dimensionless(0.8),
            discharging_efficiency: Dimensionless(0.5),
            ..storage()
        };
        let daily = DailyOperation::new(&plan, &storage, Energy(250.0));
        assert_eq!(daily.charge_energy, Energy(312.5));
        assert_eq!(daily.discharge_energy, Energy(125.0));
        assert_approx_eq!(Money, daily.charge_cost, Money(62.5));
        assert_eq!(daily.discharge_income, Money(125.0));
        assert_approx_eq!(Money, daily.revenue(), Money(62.5));

        // Limited by degraded capacity
        let daily = DailyOperation::new(&plan, &storage, Energy(200.0));
        assert_eq!(daily.discharge_energy, Energy(100.0));
    }

    #[rstest]
    fn test_daily_operation_double_mode(storage: StorageConfig) {
        let plan = DispatchPlan {
            mode: DispatchMode::Double,
            windows: vec![
                window(Direction::Charge, 0.0, 62.5, 0.1),
                window(Direction::Discharge, 8.0, 62.5, 1.0),
                window(Direction::Charge, 12.0, 62.5, 0.5),
                window(Direction::Discharge, 18.0, 62.5, 1.0),
            ],
        };

        // Each window holds half of the usable capacity
        let daily = DailyOperation::new(&plan, &storage, Energy(200.0));
        assert_eq!(daily.charge_energy, Energy(200.0));
        assert_eq!(daily.discharge_energy, Energy(200.0));
        assert_approx_eq!(Money, daily.charge_cost, Money(60.0));
        assert_eq!(daily.discharge_income, Money(200.0));
    }

    #[rstest]
    fn test_project_cash_flows(
        params: OperatingParameters,
        storage: StorageConfig,
        plan: DispatchPlan,
    ) {
        let projection = project_cash_flows(&params, &storage, &plan);

        // Daily margin is 250 * (1.0 - 0.2) = 200
        assert_eq!(projection.cash_flows.len(), 6);
        assert_eq!(projection.cash_flows[0], Money(-100000.0));
        assert_approx_eq!(Money, projection.cash_flows[1], Money(60000.0), epsilon = 1e-9);
        assert_approx_eq!(Money, projection.cash_flows[3], Money(59000.0), epsilon = 1e-9);
        assert_approx_eq!(Money, projection.cash_flows[4], Money(58900.0), epsilon = 1e-9);

        let summary = &projection.summary;
        assert_eq!(summary.first_replacement_year, 20);
        assert_eq!(summary.total_cycles, 1500);
        assert_eq!(summary.first_year_discharge_energy, Energy(75000.0));
        assert_eq!(summary.capacity_percentages, vec![Dimensionless(100.0); 6]);
    }

    #[rstest]
    fn test_degradation_and_replacement(storage: StorageConfig, plan: DispatchPlan) {
        let params = OperatingParameters {
            capacity_degradation_rate: Dimensionless(0.5),
            battery_cycle_life: 500,
            ..params()
        };
        let projection = project_cash_flows(&params, &storage, &plan);
        let capacities: Vec<_> = projection.years.iter().map(|year| year.capacity).collect();

        // Replaced in years 2 and 4, so years 3 and 5 start from full capacity
        assert_eq!(
            capacities,
            [
                Energy(250.0),
                Energy(125.0),
                Energy(250.0),
                Energy(125.0),
                Energy(250.0)
            ]
        );
        let replacements: Vec<_> = projection
            .years
            .iter()
            .map(|year| year.replacement_cost)
            .collect();
        assert_eq!(
            replacements,
            [
                Money(0.0),
                Money(50000.0),
                Money(0.0),
                Money(50000.0),
                Money(0.0)
            ]
        );
        assert_eq!(projection.summary.first_replacement_year, 1);
        assert_eq!(projection.summary.total_cycles, 300);
        assert_eq!(
            projection.summary.capacity_percentages,
            [
                Dimensionless(100.0),
                Dimensionless(100.0),
                Dimensionless(100.0),
                Dimensionless(100.0),
                Dimensionless(100.0),
                Dimensionless(100.0)
            ]
        );
        assert_eq!(projection.summary.final_capacity_percent, Dimensionless(50.0));
    }

    #[rstest]
    fn test_demand_charge_included(storage: StorageConfig, plan: DispatchPlan) {
        let params = OperatingParameters {
            demand_charge_impact: Money(-60000.0),
            ..params()
        };
        let projection = project_cash_flows(&params, &storage, &plan);
        assert_approx_eq!(Money, projection.cash_flows[1], Money(0.0), epsilon = 1e-9);
    }

    #[rstest]
    fn test_annual_costs(params: OperatingParameters, storage: StorageConfig, plan: DispatchPlan) {
        let projection = project_cash_flows(&params, &storage, &plan);
        let costs = projection.annual_costs();
        assert_eq!(costs.len(), 5);
        assert_approx_eq!(Money, costs[0].charging, Money(15000.0), epsilon = 1e-9);
        assert_eq!(costs[0].discharged_energy, Energy(75000.0));
        assert_eq!(costs[2].operation_and_maintenance, Money(1000.0));
    }
}
