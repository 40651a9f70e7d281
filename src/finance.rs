//! General functions related to finance.
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy};
use indexmap::IndexMap;
use log::warn;
use serde::Serialize;
use serde_string_enum::SerializeLabeledStringEnum;
use strum::{EnumIter, IntoEnumIterator};

/// Lowest discount rate considered when searching for the IRR
const IRR_LOWER_BOUND: f64 = -0.99;

/// Highest discount rate considered when searching for the IRR
const IRR_UPPER_BOUND: f64 = 1.0;

/// Maximum number of bisection steps when searching for the IRR
const IRR_MAX_ITERATIONS: u32 = 1000;

/// The search for the IRR stops once the NPV is closer to zero than this
const IRR_TOLERANCE: f64 = 1e-4;

/// The factor by which an amount in the given year is multiplied to give its present value
pub fn discount_factor(discount_rate: Dimensionless, year: u32) -> Dimensionless {
    Dimensionless(1.0 / (1.0 + discount_rate.value()).powf(f64::from(year)))
}

/// The present value of an amount received in the given year
pub fn present_value(amount: Money, discount_rate: Dimensionless, year: u32) -> Money {
    amount / Dimensionless((1.0 + discount_rate.value()).powf(f64::from(year)))
}

/// Calculates the net present value of a series of annual cash flows.
///
/// The first element is for year 0 and is not discounted.
pub fn npv(cash_flows: &[Money], discount_rate: Dimensionless) -> Money {
    (0u32..)
        .zip(cash_flows)
        .map(|(year, cash_flow)| present_value(*cash_flow, discount_rate, year))
        .sum()
}

/// Calculates the internal rate of return by bisection.
///
/// Rates between -99% and 100% are searched.
///
/// # Returns
///
/// The IRR as a fraction, or `None` if the NPV does not change sign over the search range.
pub fn irr(cash_flows: &[Money]) -> Option<Dimensionless> {
    let npv_at = |rate: f64| npv(cash_flows, Dimensionless(rate)).value();

    let mut low = IRR_LOWER_BOUND;
    let mut high = IRR_UPPER_BOUND;
    let mut npv_low = npv_at(low);
    let npv_high = npv_at(high);
    if !npv_low.is_finite() || !npv_high.is_finite() {
        return None;
    }

    // An endpoint may itself be the root, but flows whose NPV is zero everywhere have no IRR
    match (npv_low.abs() > 0.0, npv_high.abs() > 0.0) {
        (false, false) => return None,
        (false, true) => return Some(Dimensionless(low)),
        (true, false) => return Some(Dimensionless(high)),
        (true, true) if (npv_low > 0.0) == (npv_high > 0.0) => return None,
        (true, true) => {}
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let npv_mid = npv_at(mid);
        if npv_mid.abs() < IRR_TOLERANCE {
            return Some(Dimensionless(mid));
        }

        if npv_low * npv_mid < 0.0 {
            high = mid;
        } else {
            low = mid;
            npv_low = npv_mid;
        }
    }

    Some(Dimensionless((low + high) / 2.0))
}

/// The first year in which the cumulative (undiscounted) cash flow is no longer negative.
///
/// Returns `None` if the investment is never paid back.
pub fn payback_period(cash_flows: &[Money]) -> Option<u32> {
    let mut cumulative = Money(0.0);
    for (year, cash_flow) in (0u32..).zip(cash_flows) {
        cumulative += *cash_flow;
        if cumulative >= Money(0.0) {
            return Some(year);
        }
    }

    None
}

/// Calculates the benefit-cost ratio.
///
/// This is the present value of the positive cash flows after year 0 divided by the initial
/// investment plus the present value of the negative cash flows after year 0. Returns `None` if
/// there are no costs.
pub fn benefit_cost_ratio(
    cash_flows: &[Money],
    discount_rate: Dimensionless,
) -> Option<Dimensionless> {
    let (initial, operating) = cash_flows.split_first()?;

    let mut benefits = Money(0.0);
    let mut costs = (-*initial).max(Money(0.0));
    for (year, cash_flow) in (1u32..).zip(operating) {
        let pv = present_value(*cash_flow, discount_rate, year);
        if pv > Money(0.0) {
            benefits += pv;
        } else {
            costs -= pv;
        }
    }

    (costs > Money(0.0)).then(|| benefits / costs)
}

/// The categories of cost which make up the levelised cost of storage
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
)]
pub enum CostCategory {
    /// Capital expenditure in year 0
    #[string = "initial_investment"]
    InitialInvestment,
    /// Operation and maintenance
    #[string = "operation_and_maintenance"]
    OperationAndMaintenance,
    /// Energy bought from the grid to charge the storage
    #[string = "charging"]
    Charging,
    /// Battery replacement
    #[string = "replacement"]
    Replacement,
}

/// Costs and discharged energy for a single year of operation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnnualCosts {
    /// Operation and maintenance cost
    pub operation_and_maintenance: Money,
    /// Cost of charging energy
    pub charging: Money,
    /// Replacement cost
    pub replacement: Money,
    /// Energy delivered to the grid
    pub discharged_energy: Energy,
}

impl AnnualCosts {
    /// The cost in a given category. There is no initial investment during operation.
    fn cost(&self, category: CostCategory) -> Money {
        match category {
            CostCategory::InitialInvestment => Money(0.0),
            CostCategory::OperationAndMaintenance => self.operation_and_maintenance,
            CostCategory::Charging => self.charging,
            CostCategory::Replacement => self.replacement,
        }
    }
}

/// The levelised cost of storage, broken down by category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lcos {
    /// Sum of all components
    pub total: MoneyPerEnergy,
    /// The contribution of each cost category
    pub components: IndexMap<CostCategory, MoneyPerEnergy>,
}

/// Calculates the levelised cost of storage.
///
/// This is the present value of all costs divided by the present value of the energy discharged.
///
/// # Arguments
///
/// * `capex` - Initial investment in year 0
/// * `years` - Costs and discharged energy for years 1 to N
/// * `discount_rate` - Discount rate for costs and energy
///
/// # Returns
///
/// The LCOS, or `None` if no energy is discharged.
pub fn lcos(capex: Money, years: &[AnnualCosts], discount_rate: Dimensionless) -> Option<Lcos> {
    let discounted_energy: Energy = (1u32..)
        .zip(years)
        .map(|(year, costs)| costs.discharged_energy * discount_factor(discount_rate, year))
        .sum();
    if discounted_energy <= Energy(0.0) {
        return None;
    }

    let components: IndexMap<_, _> = CostCategory::iter()
        .map(|category| {
            let discounted_cost = match category {
                CostCategory::InitialInvestment => capex,
                _ => (1u32..)
                    .zip(years)
                    .map(|(year, costs)| {
                        present_value(costs.cost(category), discount_rate, year)
                    })
                    .sum(),
            };
            (category, discounted_cost / discounted_energy)
        })
        .collect();
    let total = components.values().copied().sum();

    Some(Lcos { total, components })
}

/// Investment metrics for a series of cash flows
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialMetrics {
    /// Net present value
    pub npv: Money,
    /// Internal rate of return, as a percentage
    pub irr: Option<Dimensionless>,
    /// Years until the investment is paid back
    pub payback_period: Option<u32>,
    /// Levelised cost of storage
    pub lcos: Option<Lcos>,
    /// Benefit-cost ratio
    pub benefit_cost_ratio: Option<Dimensionless>,
}

impl FinancialMetrics {
    /// Calculate all metrics
    ///
    /// # Arguments
    ///
    /// * `cash_flows` - Net cash flow for years 0 to N
    /// * `capex` - Initial investment
    /// * `years` - Costs and discharged energy for years 1 to N
    /// * `discount_rate` - Discount rate
    pub fn calculate(
        cash_flows: &[Money],
        capex: Money,
        years: &[AnnualCosts],
        discount_rate: Dimensionless,
    ) -> Self {
        let irr = irr(cash_flows).map(|rate| rate * Dimensionless(100.0));
        if irr.is_none() {
            warn!("The IRR is undefined: NPV does not change sign between -99% and 100%");
        }

        let lcos = lcos(capex, years, discount_rate);
        if lcos.is_none() {
            warn!("The LCOS is undefined as no energy is discharged");
        }

        Self {
            npv: npv(cash_flows, discount_rate),
            irr,
            payback_period: payback_period(cash_flows),
            lcos,
            benefit_cost_ratio: benefit_cost_ratio(cash_flows, discount_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn money(values: &[f64]) -> Vec<Money> {
        values.iter().copied().map(Money).collect()
    }

    #[rstest]
    #[case(&[-1000.0, 300.0, 400.0, 500.0])]
    #[case(&[-260000.0, 12345.678, 0.1, -7.7, 98765.4321])]
    #[case(&[])]
    fn test_npv_zero_rate(#[case] cash_flows: &[f64]) {
        let expected: f64 = cash_flows.iter().sum();
        assert_eq!(npv(&money(cash_flows), Dimensionless(0.0)), Money(expected));
    }

    #[test]
    fn test_npv() {
        let cash_flows = money(&[-1000.0, 1100.0]);
        assert_approx_eq!(Money, npv(&cash_flows, Dimensionless(0.1)), Money(0.0), epsilon = 1e-9);

        let cash_flows = money(&[-100.0, 50.0, 50.0, 50.0]);
        assert_approx_eq!(
            Money,
            npv(&cash_flows, Dimensionless(0.05)),
            Money(36.162_401_468_523_91),
            epsilon = 1e-9
        );
    }

    #[rstest]
    #[case(0.08, 10)]
    #[case(0.15, 20)]
    #[case(0.0, 5)]
    #[case(-0.05, 8)]
    fn test_irr_round_trip(#[case] rate: f64, #[case] years: u32) {
        // An annuity whose NPV at `rate` is zero
        let annual = if rate == 0.0 {
            1000.0 / f64::from(years)
        } else {
            1000.0 * rate / (1.0 - (1.0 + rate).powf(-f64::from(years)))
        };
        let mut cash_flows = vec![Money(-1000.0)];
        cash_flows.extend((0..years).map(|_| Money(annual)));

        let result = irr(&cash_flows).unwrap();
        assert_approx_eq!(Dimensionless, result, Dimensionless(rate), epsilon = 1e-3);
    }

    #[rstest]
    #[case(&[-1000.0, -10.0, -10.0])]
    #[case(&[1000.0, 10.0, 10.0])]
    #[case(&[0.0, 0.0])]
    #[case(&[0.0, 0.0, 0.0, 0.0])]
    fn test_irr_no_sign_change(#[case] cash_flows: &[f64]) {
        assert_eq!(irr(&money(cash_flows)), None);
    }

    #[test]
    fn test_irr_root_at_upper_bound() {
        // NPV is exactly zero at a rate of 100%
        assert_eq!(
            irr(&money(&[-1.0, 2.0])),
            Some(Dimensionless(IRR_UPPER_BOUND))
        );
    }

    #[rstest]
    #[case(&[-1000.0, 400.0, 400.0, 400.0], Some(3))]
    #[case(&[-1000.0, 500.0, 500.0, 500.0], Some(2))]
    #[case(&[-1000.0, 100.0, 100.0], None)]
    #[case(&[0.0, -5.0], Some(0))]
    #[case(&[], None)]
    fn test_payback_period(#[case] cash_flows: &[f64], #[case] expected: Option<u32>) {
        assert_eq!(payback_period(&money(cash_flows)), expected);
    }

    #[test]
    fn test_benefit_cost_ratio() {
        let cash_flows = money(&[-1000.0, 600.0, -100.0, 600.0]);
        assert_approx_eq!(
            Dimensionless,
            benefit_cost_ratio(&cash_flows, Dimensionless(0.0)).unwrap(),
            Dimensionless(1200.0 / 1100.0)
        );

        let cash_flows = money(&[0.0, 5.0]);
        assert_eq!(benefit_cost_ratio(&cash_flows, Dimensionless(0.1)), None);
    }

    fn annual_costs() -> Vec<AnnualCosts> {
        (1..=10)
            .map(|year| AnnualCosts {
                operation_and_maintenance: Money(1000.0 + f64::from(year) * 13.7),
                charging: Money(9876.5),
                replacement: if year == 6 { Money(50000.0) } else { Money(0.0) },
                discharged_energy: Energy(80000.0 - f64::from(year) * 500.0),
            })
            .collect()
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.06)]
    #[case(0.123)]
    fn test_lcos_components_sum_to_total(#[case] discount_rate: f64) {
        let result = lcos(Money(260000.0), &annual_costs(), Dimensionless(discount_rate)).unwrap();
        assert_eq!(result.components.len(), 4);
        let sum: MoneyPerEnergy = result.components.values().copied().sum();
        assert_approx_eq!(MoneyPerEnergy, sum, result.total, epsilon = 1e-6);
    }

    #[test]
    fn test_lcos_undiscounted() {
        let years = vec![
            AnnualCosts {
                operation_and_maintenance: Money(100.0),
                charging: Money(200.0),
                replacement: Money(0.0),
                discharged_energy: Energy(1000.0),
            };
            2
        ];
        let result = lcos(Money(1000.0), &years, Dimensionless(0.0)).unwrap();
        assert_eq!(
            result.components[&CostCategory::InitialInvestment],
            MoneyPerEnergy(0.5)
        );
        assert_eq!(
            result.components[&CostCategory::OperationAndMaintenance],
            MoneyPerEnergy(0.1)
        );
        assert_eq!(result.components[&CostCategory::Charging], MoneyPerEnergy(0.2));
        assert_eq!(result.components[&CostCategory::Replacement], MoneyPerEnergy(0.0));
        assert_approx_eq!(MoneyPerEnergy, result.total, MoneyPerEnergy(0.8));
    }

    #[test]
    fn test_lcos_no_energy() {
        let years = vec![AnnualCosts::default(); 5];
        assert_eq!(lcos(Money(1000.0), &years, Dimensionless(0.05)), None);
    }

    #[test]
    fn test_financial_metrics() {
        let cash_flows = money(&[-1000.0, 600.0, 600.0]);
        let years = vec![
            AnnualCosts {
                discharged_energy: Energy(100.0),
                ..Default::default()
            };
            2
        ];
        let metrics =
            FinancialMetrics::calculate(&cash_flows, Money(1000.0), &years, Dimensionless(0.0));
        assert_eq!(metrics.npv, Money(200.0));
        assert_eq!(metrics.payback_period, Some(2));
        assert!(metrics.irr.unwrap() > Dimensionless(10.0));
        assert_approx_eq!(
            MoneyPerEnergy,
            metrics.lcos.unwrap().total,
            MoneyPerEnergy(5.0)
        );
        assert_approx_eq!(
            Dimensionless,
            metrics.benefit_cost_ratio.unwrap(),
            Dimensionless(1.2)
        );
    }
}
