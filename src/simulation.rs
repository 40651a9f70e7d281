//! Functionality for running an appraisal of a scenario.
use crate::cash_flow::{CashFlowProjection, project_cash_flows};
use crate::demand_charge::{DemandChargeImpact, demand_charge_impact};
use crate::dispatch::{DispatchOutcome, simulate_dispatch};
use crate::finance::FinancialMetrics;
use crate::load_analysis::LoadComparison;
use crate::scenario::Scenario;
use crate::tariff::PriceCurve;
use log::info;

/// Everything calculated for a scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Appraisal {
    /// The tariff's price for each hour of the day
    pub prices: PriceCurve,
    /// The dispatch plan and its effect on the load
    pub dispatch: DispatchOutcome,
    /// Load metrics before and after dispatch
    pub load: LoadComparison,
    /// The effect of dispatch on demand charges
    pub demand_charge: DemandChargeImpact,
    /// Annual cash flows
    pub projection: CashFlowProjection,
    /// Investment metrics
    pub metrics: FinancialMetrics,
}

/// Run the appraisal.
///
/// The scenario is not modified and the same scenario always gives the same result.
///
/// # Arguments:
///
/// * `scenario` - The scenario to appraise
pub fn run(scenario: &Scenario) -> Appraisal {
    let prices = scenario.tariff.day_curve();

    info!("Simulating {} dispatch", scenario.dispatch.mode);
    let dispatch = simulate_dispatch(
        &scenario.load,
        &scenario.dispatch,
        scenario.storage.power,
        &scenario.tariff,
    );

    let load = LoadComparison::new(&dispatch.original, &dispatch.modified);
    info!(
        "Peak load {} kW before dispatch and {} kW after",
        load.original.peak, load.modified.peak
    );

    let demand_charge = demand_charge_impact(load.peak_reduction(), &scenario.demand_charge);

    info!(
        "Projecting cash flows over {} years",
        scenario.operation_years
    );
    let params = scenario.operating_parameters(demand_charge.annual);
    let projection = project_cash_flows(&params, &scenario.storage, &dispatch.plan);
    let metrics = FinancialMetrics::calculate(
        &projection.cash_flows,
        scenario.capex,
        &projection.annual_costs(),
        scenario.discount_rate,
    );
    info!("NPV: {}", metrics.npv);

    Appraisal {
        prices,
        dispatch,
        load,
        demand_charge,
        projection,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Direction, DispatchMode};
    use crate::fixture::scenario;
    use crate::units::{Hours, Money, MoneyPerPower, Power};
    use rstest::rstest;

    #[rstest]
    fn test_flat_load_single_cycle(scenario: Scenario) {
        let appraisal = run(&scenario);
        let modified = &appraisal.dispatch.modified;

        assert_eq!(modified.get(23), Power(175.0));
        assert_eq!(modified.get(17), Power(0.0));
        assert_eq!(appraisal.load.original.peak, Power(50.0));
        assert_eq!(appraisal.load.modified.peak, Power(175.0));
        assert_eq!(appraisal.load.peak_reduction(), Power(-125.0));
        assert_eq!(appraisal.demand_charge.monthly, Money(-5000.0));
        assert_eq!(appraisal.demand_charge.annual, Money(-60000.0));
        assert!(appraisal.demand_charge.annual < Money(0.0));
    }

    #[rstest]
    fn test_cash_flow_length(scenario: Scenario) {
        let appraisal = run(&scenario);
        assert_eq!(
            appraisal.projection.cash_flows.len(),
            scenario.operation_years as usize + 1
        );
        assert_eq!(appraisal.projection.cash_flows[0], -scenario.capex);
    }

    #[rstest]
    fn test_demand_charge_disabled(mut scenario: Scenario) {
        scenario.demand_charge.enabled = false;
        let appraisal = run(&scenario);
        assert_eq!(appraisal.demand_charge.annual, Money(0.0));

        scenario.demand_charge.enabled = true;
        scenario.demand_charge.rate = MoneyPerPower(10.0);
        let with_charge = run(&scenario);
        assert!(with_charge.metrics.npv < appraisal.metrics.npv);
    }

    #[rstest]
    fn test_double_mode(mut scenario: Scenario) {
        scenario.dispatch.mode = DispatchMode::Double;
        let appraisal = run(&scenario);
        let windows = &appraisal.dispatch.plan.windows;

        assert_eq!(windows.len(), 4);
        assert_eq!(
            windows
                .iter()
                .filter(|window| window.direction == Direction::Charge)
                .count(),
            2
        );
        assert!(windows.iter().all(|window| window.power == Power(62.5)));
        // The second charge follows the first discharge, which ends at 19:00
        assert!(windows[2].start >= Hours(19.0));
    }

    #[rstest]
    fn test_run_is_deterministic(scenario: Scenario) {
        let first = run(&scenario);
        let second = run(&scenario);
        assert_eq!(first, second);
        assert_eq!(
            first.metrics.npv.value().to_bits(),
            second.metrics.npv.value().to_bits()
        );
    }
}
