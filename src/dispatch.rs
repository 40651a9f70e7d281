//! Code for scheduling charge and discharge events and applying them to a load profile.
//!
//! Each event lasts a fixed number of whole hours. An event which starts part way through an hour
//! is spread over the two hourly buckets it overlaps.
use crate::load_profile::{HOURS_PER_DAY, LoadProfile};
use crate::tariff::{PriceCurve, PriceTier, Tariff, TimeOfDay};
use crate::units::{Dimensionless, Energy, Hours, MoneyPerEnergy, Power};
use anyhow::{Result, ensure};
use log::{debug, info};
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt;

/// The number of whole hours for which each charge or discharge event runs (i.e. 0.5C)
pub const EVENT_HOURS: u32 = 2;

/// How many charge/discharge cycles are run each day
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum DispatchMode {
    /// One cycle per day at full rated power
    #[default]
    #[string = "single"]
    Single,
    /// Two cycles per day, each at half rated power
    #[string = "double"]
    Double,
}

/// Whether the storage draws from or delivers to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum)]
pub enum Direction {
    /// Energy flows into the storage
    #[string = "charge"]
    Charge,
    /// Energy flows out of the storage
    #[string = "discharge"]
    Discharge,
}

/// Start times and price overrides for one charge/discharge cycle
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    /// When charging starts
    pub charge_start: Option<TimeOfDay>,
    /// When discharging starts
    pub discharge_start: Option<TimeOfDay>,
    /// Price the charge window at this tier instead of the hourly tariff
    pub charge_price_tier: Option<PriceTier>,
    /// Price the discharge window at this tier instead of the hourly tariff
    pub discharge_price_tier: Option<PriceTier>,
}

/// The dispatch section of a scenario
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Single or double cycling
    #[serde(default)]
    pub mode: DispatchMode,
    /// The first (or only) cycle
    #[serde(default)]
    pub first: CycleConfig,
    /// The second cycle, used in double mode only
    #[serde(default)]
    pub second: CycleConfig,
}

impl DispatchConfig {
    /// Check that all configured start times lie within the day
    pub fn validate(&self) -> Result<()> {
        for (name, cycle) in [("first", &self.first), ("second", &self.second)] {
            for (field, start) in [
                ("charge_start", cycle.charge_start),
                ("discharge_start", cycle.discharge_start),
            ] {
                if let Some(start) = start {
                    ensure!(
                        !start.is_end_of_day(),
                        "dispatch.{name}.{field} must be earlier than 24:00"
                    );
                }
            }
        }

        Ok(())
    }
}

/// Where an unconfigured cycle starts by default
struct CycleDefaults {
    charge_tier: PriceTier,
    charge_fallback_hour: usize,
    discharge_tier: PriceTier,
    discharge_fallback_hour: usize,
}

const FIRST_CYCLE_DEFAULTS: CycleDefaults = CycleDefaults {
    charge_tier: PriceTier::DeepValley,
    charge_fallback_hour: 11,
    discharge_tier: PriceTier::SharpPeak,
    discharge_fallback_hour: 17,
};

const SECOND_CYCLE_DEFAULTS: CycleDefaults = CycleDefaults {
    charge_tier: PriceTier::Valley,
    charge_fallback_hour: 10,
    discharge_tier: PriceTier::Peak,
    discharge_fallback_hour: 21,
};

/// The start times used for one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleAnchors {
    /// Fractional hour at which charging starts
    pub charge_start: Hours,
    /// Fractional hour at which discharging starts
    pub discharge_start: Hours,
}

impl CycleAnchors {
    /// Take the configured start times, falling back to the first range of the relevant tariff
    /// tier and then to a fixed hour.
    fn resolve(config: &CycleConfig, tariff: &Tariff, defaults: &CycleDefaults) -> Self {
        let anchor = |configured: Option<TimeOfDay>, tier, fallback_hour| {
            let time = configured
                .or_else(|| tariff.first_start(tier))
                .unwrap_or_else(|| TimeOfDay::from_hour(fallback_hour));
            Hours(time.hours() % 24.0)
        };

        Self {
            charge_start: anchor(
                config.charge_start,
                defaults.charge_tier,
                defaults.charge_fallback_hour,
            ),
            discharge_start: anchor(
                config.discharge_start,
                defaults.discharge_tier,
                defaults.discharge_fallback_hour,
            ),
        }
    }
}

/// A single scheduled charge or discharge event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchWindow {
    /// Charge or discharge
    pub direction: Direction,
    /// Fractional hour of the day at which the event starts, in [0, 24)
    pub start: Hours,
    /// Power drawn or delivered
    pub power: Power,
    /// Tier used to price the window, if overridden
    pub price_tier: Option<PriceTier>,
    /// Energy price for the window
    pub price: MoneyPerEnergy,
}

impl DispatchWindow {
    /// How long the event lasts
    pub fn duration(&self) -> Hours {
        Hours(f64::from(EVENT_HOURS))
    }

    /// The hour of the day at which the event ends, wrapping past midnight
    pub fn end(&self) -> Hours {
        Hours((self.start + self.duration()).value() % 24.0)
    }

    /// Energy moved at the grid connection if the event runs at full power for its duration
    pub fn nominal_energy(&self) -> Energy {
        self.power * self.duration()
    }

    /// The start, rounded down to a whole hour for display
    pub fn start_hour(&self) -> usize {
        floor_hour(self.start.value())
    }

    /// The end, rounded down to a whole hour for display
    pub fn end_hour(&self) -> usize {
        floor_hour(self.end().value())
    }

    /// The share of the event falling in each hourly bucket it touches
    fn bucket_shares(&self) -> Vec<(usize, f64)> {
        bucket_shares(self.start.value(), EVENT_HOURS)
    }

    /// Add (charge) or subtract (discharge) this event's power from the load in each bucket.
    ///
    /// Discharging never takes a bucket below zero.
    fn apply(&self, loads: &mut [Power; HOURS_PER_DAY]) {
        for (hour, share) in self.bucket_shares() {
            let delta = self.power * Dimensionless(share);
            loads[hour] = match self.direction {
                Direction::Charge => loads[hour] + delta,
                Direction::Discharge => (loads[hour] - delta).max(Power(0.0)),
            };
        }
    }
}

impl fmt::Display for DispatchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:00-{:02}:00 at {} kW",
            self.direction,
            self.start_hour(),
            self.end_hour(),
            self.power
        )
    }
}

/// Round a fractional hour down to a whole hour of the day
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_hour(hour: f64) -> usize {
    (hour.floor() as usize) % HOURS_PER_DAY
}

/// Split an event into per-bucket shares of its power.
///
/// For each whole hour `k` of the event, `t = (start + k) mod 24`. If `t` falls on an hour
/// boundary the whole hour goes to bucket `t`; otherwise `1 - frac(t)` goes to `floor(t)` and
/// `frac(t)` to the following bucket.
fn bucket_shares(start: f64, hours: u32) -> Vec<(usize, f64)> {
    let mut shares = Vec::new();
    for k in 0..hours {
        let time = (start + f64::from(k)) % 24.0;
        let hour = floor_hour(time);
        let frac = time - time.floor();
        if frac > 0.0 {
            shares.push((hour, 1.0 - frac));
            shares.push(((hour + 1) % HOURS_PER_DAY, frac));
        } else {
            shares.push((hour, 1.0));
        }
    }

    shares
}

/// The energy-weighted mean price over the buckets an event touches
fn window_price(start: Hours, prices: &PriceCurve) -> MoneyPerEnergy {
    let shares = bucket_shares(start.value(), EVENT_HOURS);
    let total: f64 = shares.iter().map(|(_, share)| share).sum();
    let weighted: MoneyPerEnergy = shares
        .iter()
        .map(|(hour, share)| prices.price(*hour) * Dimensionless(*share))
        .sum();

    weighted / Dimensionless(total)
}

/// The ordered set of windows for one day
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    /// Single or double cycling
    pub mode: DispatchMode,
    /// Windows in the order they are applied (charge, discharge, charge, discharge)
    pub windows: Vec<DispatchWindow>,
}

impl DispatchPlan {
    /// Build the plan for a day.
    ///
    /// In double mode, each cycle runs at half rated power and a window which would start before
    /// the previous window has ended is moved forward to that window's end.
    ///
    /// # Arguments
    ///
    /// * `config` - Configured start times and price overrides
    /// * `rated_power` - The rated power of the storage
    /// * `tariff` - Tariff used for default start times and window prices
    pub fn build(config: &DispatchConfig, rated_power: Power, tariff: &Tariff) -> Self {
        let prices = tariff.day_curve();
        let window = |direction, start: Hours, power, price_tier: Option<PriceTier>| {
            let price = price_tier.map_or_else(
                || window_price(start, &prices),
                |tier| tariff.price_of(tier),
            );
            DispatchWindow {
                direction,
                start,
                power,
                price_tier,
                price,
            }
        };

        let first = CycleAnchors::resolve(&config.first, tariff, &FIRST_CYCLE_DEFAULTS);
        let windows = match config.mode {
            DispatchMode::Single => vec![
                window(
                    Direction::Charge,
                    first.charge_start,
                    rated_power,
                    config.first.charge_price_tier,
                ),
                window(
                    Direction::Discharge,
                    first.discharge_start,
                    rated_power,
                    config.first.discharge_price_tier,
                ),
            ],
            DispatchMode::Double => {
                let power = rated_power * Dimensionless(0.5);
                let second = CycleAnchors::resolve(&config.second, tariff, &SECOND_CYCLE_DEFAULTS);

                let first_charge = window(
                    Direction::Charge,
                    first.charge_start,
                    power,
                    config.first.charge_price_tier,
                );
                let first_discharge = window(
                    Direction::Discharge,
                    first.discharge_start,
                    power,
                    config.first.discharge_price_tier,
                );

                // Starts are chained through the day without wrapping, so a window which follows
                // one running past midnight is pushed into the next day
                let second_charge_start = clamp_start(
                    second.charge_start,
                    first_discharge.start + first_discharge.duration(),
                    "second charge",
                );
                let second_charge = window(
                    Direction::Charge,
                    wrap_hour(second_charge_start),
                    power,
                    config.second.charge_price_tier,
                );
                let second_discharge_start = clamp_start(
                    second.discharge_start,
                    second_charge_start + second_charge.duration(),
                    "second discharge",
                );
                let second_discharge = window(
                    Direction::Discharge,
                    wrap_hour(second_discharge_start),
                    power,
                    config.second.discharge_price_tier,
                );

                vec![first_charge, first_discharge, second_charge, second_discharge]
            }
        };

        for window in &windows {
            debug!("Dispatch window: {window} (price {})", window.price);
        }

        Self {
            mode: config.mode,
            windows,
        }
    }

    /// Iterate over the windows in the given direction
    pub fn windows_in(&self, direction: Direction) -> impl Iterator<Item = &DispatchWindow> {
        self.windows
            .iter()
            .filter(move |window| window.direction == direction)
    }

    /// Apply every window in order to a load profile
    pub fn apply(&self, load: &LoadProfile) -> LoadProfile {
        let mut loads = *load.values();
        for window in &self.windows {
            window.apply(&mut loads);
        }

        LoadProfile::from_valid(loads)
    }
}

/// Move `start` forward to `previous_end` if it would otherwise start earlier.
///
/// `previous_end` is not wrapped, so the result may lie beyond 24:00.
fn clamp_start(start: Hours, previous_end: Hours, name: &str) -> Hours {
    if start < previous_end {
        info!(
            "Moving {name} start from {} to {} so that it follows the previous window",
            start,
            wrap_hour(previous_end)
        );
        previous_end
    } else {
        start
    }
}

/// Bring an hour into the range [0, 24)
fn wrap_hour(hour: Hours) -> Hours {
    Hours(hour.value() % 24.0)
}

/// The result of dispatching storage against a load profile
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// The load before dispatch
    pub original: LoadProfile,
    /// The load after dispatch
    pub modified: LoadProfile,
    /// The windows actually used
    pub plan: DispatchPlan,
}

/// Build a dispatch plan and apply it to a load profile
pub fn simulate_dispatch(
    load: &LoadProfile,
    config: &DispatchConfig,
    rated_power: Power,
    tariff: &Tariff,
) -> DispatchOutcome {
    let plan = DispatchPlan::build(config, rated_power, tariff);
    let modified = plan.apply(load);

    DispatchOutcome {
        original: load.clone(),
        modified,
        plan,
    }
}
