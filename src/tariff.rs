//! Time-of-use tariffs and the resolution of a time of day to its price tier.
//!
//! A tariff assigns a price to each of five tiers, each of which is active during one or more
//! time ranges. Ranges whose end is at or before their start wrap past midnight. Where ranges of
//! different tiers overlap, the tier with the highest priority wins, in the order sharp peak,
//! peak, flat, valley, deep valley.
use crate::load_profile::HOURS_PER_DAY;
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

/// Number of minutes in a day
const MINUTES_PER_DAY: u16 = 24 * 60;

/// A time of day, stored as minutes since midnight.
///
/// Values range from 00:00 to 24:00 inclusive; 24:00 is only meaningful as the end of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Midnight at the start of the day
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Create a time of day from hours and minutes
    pub fn new(hours: u16, minutes: u16) -> Result<Self> {
        ensure!(minutes < 60, "Invalid minutes value: {minutes}");
        let total = u32::from(hours) * 60 + u32::from(minutes);
        ensure!(
            total <= u32::from(MINUTES_PER_DAY),
            "Time of day must not be later than 24:00"
        );

        Ok(Self(u16::try_from(total)?))
    }

    /// The time at the start of the given hour of the day (0-24)
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_hour(hour: usize) -> Self {
        debug_assert!(hour <= HOURS_PER_DAY);
        Self((hour * 60) as u16)
    }

    /// Minutes elapsed since midnight
    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Fractional hours elapsed since midnight (e.g. 11:30 is 11.5)
    pub fn hours(self) -> f64 {
        f64::from(self.0) / 60.0
    }

    /// Whether this is the 24:00 end-of-day marker
    pub fn is_end_of_day(self) -> bool {
        self.0 == MINUTES_PER_DAY
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hours, minutes) = s
            .trim()
            .split(':')
            .collect_tuple()
            .with_context(|| format!("Invalid time '{s}': should be in the form HH:MM"))?;
        let hours = hours
            .parse()
            .with_context(|| format!("Invalid hours in time '{s}'"))?;
        let minutes = minutes
            .parse()
            .with_context(|| format!("Invalid minutes in time '{s}'"))?;

        TimeOfDay::new(hours, minutes).with_context(|| format!("Invalid time '{s}'"))
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D>(deserialiser: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserialiser)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serialiser: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialiser.collect_str(self)
    }
}

/// A range of time within a day.
///
/// The start is inclusive and the end exclusive. If `end` is at or before `start` the range wraps
/// past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeRange {
    /// Inclusive.
    pub start: TimeOfDay,
    /// Exclusive.
    pub end: TimeOfDay,
}

impl TimeRange {
    /// Create a new [`TimeRange`]
    pub const fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Whether `time` falls within this range
    pub fn contains(self, time: TimeOfDay) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }

    /// Whether the range wraps past midnight
    pub fn wraps_midnight(self) -> bool {
        self.start > self.end
    }

    /// Check that the range is well formed
    fn validate(self) -> Result<()> {
        ensure!(
            !self.start.is_end_of_day(),
            "Range {self} cannot start at 24:00"
        );
        ensure!(self.start != self.end, "Range {self} is empty");

        Ok(())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A named tariff price tier.
///
/// The order of the variants is the priority order used to break ties when ranges overlap.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum PriceTier {
    /// The most expensive tier
    #[string = "sharp_peak"]
    SharpPeak,
    /// Peak tier
    #[string = "peak"]
    Peak,
    /// Shoulder tier
    #[string = "flat"]
    Flat,
    /// Off-peak tier
    #[string = "valley"]
    Valley,
    /// The cheapest tier
    #[string = "deep_valley"]
    DeepValley,
}

impl PriceTier {
    /// The number of ranges a tier is conventionally configured with at most
    pub fn conventional_max_periods(self) -> usize {
        match self {
            PriceTier::Flat => 3,
            _ => 2,
        }
    }
}

/// The price of a tier and the times at which it is active
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TierSchedule {
    /// Energy price while the tier is active
    #[serde(default)]
    pub price: MoneyPerEnergy,
    /// The ranges of the day during which the tier is active
    #[serde(default)]
    pub periods: Vec<TimeRange>,
}

impl TierSchedule {
    /// Whether any of the tier's ranges covers `time`
    pub fn covers(&self, time: TimeOfDay) -> bool {
        self.periods.iter().any(|range| range.contains(time))
    }
}

/// A complete time-of-use tariff
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Tariff {
    /// Sharp peak tier
    #[serde(default)]
    pub sharp_peak: TierSchedule,
    /// Peak tier
    #[serde(default)]
    pub peak: TierSchedule,
    /// Flat tier
    #[serde(default)]
    pub flat: TierSchedule,
    /// Valley tier
    #[serde(default)]
    pub valley: TierSchedule,
    /// Deep valley tier
    #[serde(default)]
    pub deep_valley: TierSchedule,
}

impl Tariff {
    /// The schedule for the given tier
    pub fn tier(&self, tier: PriceTier) -> &TierSchedule {
        match tier {
            PriceTier::SharpPeak => &self.sharp_peak,
            PriceTier::Peak => &self.peak,
            PriceTier::Flat => &self.flat,
            PriceTier::Valley => &self.valley,
            PriceTier::DeepValley => &self.deep_valley,
        }
    }

    /// Iterate over tiers in priority order
    pub fn iter(&self) -> impl Iterator<Item = (PriceTier, &TierSchedule)> {
        PriceTier::iter().map(|tier| (tier, self.tier(tier)))
    }

    /// Find the tier active at `time` and its price.
    ///
    /// Tiers are checked in priority order and the first matching range wins.
    ///
    /// # Returns
    ///
    /// The active tier and its price, or `None` if no range covers `time`.
    pub fn resolve(&self, time: TimeOfDay) -> Option<(PriceTier, MoneyPerEnergy)> {
        self.iter()
            .find(|(_, schedule)| schedule.covers(time))
            .map(|(tier, schedule)| (tier, schedule.price))
    }

    /// The price at `time`, or zero if no range covers it
    pub fn price_at(&self, time: TimeOfDay) -> MoneyPerEnergy {
        self.resolve(time)
            .map_or(MoneyPerEnergy(0.0), |(_, price)| price)
    }

    /// The price of the given tier
    pub fn price_of(&self, tier: PriceTier) -> MoneyPerEnergy {
        self.tier(tier).price
    }

    /// The start of the first range configured for the given tier, if any
    pub fn first_start(&self, tier: PriceTier) -> Option<TimeOfDay> {
        self.tier(tier).periods.first().map(|range| range.start)
    }

    /// Resolve the price at the start of every hour of the day
    pub fn day_curve(&self) -> PriceCurve {
        let hours = (0..HOURS_PER_DAY)
            .map(|hour| {
                let resolved = self.resolve(TimeOfDay::from_hour(hour));
                HourlyPrice {
                    hour,
                    tier: resolved.map(|(tier, _)| tier),
                    price: resolved.map_or(MoneyPerEnergy(0.0), |(_, price)| price),
                }
            })
            .collect();

        PriceCurve(hours)
    }

    /// Check that prices and ranges are valid
    pub fn validate(&self) -> Result<()> {
        for (tier, schedule) in self.iter() {
            ensure!(
                schedule.price.is_finite() && schedule.price >= MoneyPerEnergy(0.0),
                "tariff.{tier}.price must be a finite number greater than or equal to zero"
            );

            for range in &schedule.periods {
                range
                    .validate()
                    .with_context(|| format!("Invalid range in tariff.{tier}.periods"))?;
            }

            if schedule.periods.len() > tier.conventional_max_periods() {
                warn!(
                    "Tariff tier {tier} has {} periods (usually at most {})",
                    schedule.periods.len(),
                    tier.conventional_max_periods()
                );
            }
        }

        let uncovered = self.day_curve().uncovered_hours();
        if !uncovered.is_empty() {
            warn!(
                "No tariff tier covers hour(s) {}; the price for these hours is zero",
                uncovered.iter().join(", ")
            );
        }

        Ok(())
    }
}

/// The resolved price for a single hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyPrice {
    /// Hour of the day (0-23)
    pub hour: usize,
    /// The active tier, if any
    pub tier: Option<PriceTier>,
    /// The price for the hour (zero if uncovered)
    pub price: MoneyPerEnergy,
}

/// Prices for each hour of a day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceCurve(Vec<HourlyPrice>);

impl PriceCurve {
    /// The price for the given hour of the day
    pub fn price(&self, hour: usize) -> MoneyPerEnergy {
        self.0[hour % HOURS_PER_DAY].price
    }

    /// Iterate over the hourly prices
    pub fn iter(&self) -> impl Iterator<Item = &HourlyPrice> {
        self.0.iter()
    }

    /// Hours which no tier covers
    pub fn uncovered_hours(&self) -> Vec<usize> {
        self.0
            .iter()
            .filter(|hourly| hourly.tier.is_none())
            .map(|hourly| hourly.hour)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn time(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::new(time(start), time(end))
    }

    fn schedule(price: f64, periods: &[(&str, &str)]) -> TierSchedule {
        TierSchedule {
            price: MoneyPerEnergy(price),
            periods: periods.iter().map(|(s, e)| range(s, e)).collect(),
        }
    }

    #[fixture]
    fn tariff() -> Tariff {
        Tariff {
            sharp_peak: schedule(1.2, &[("17:00", "19:00")]),
            peak: schedule(1.0, &[("08:00", "11:00"), ("19:00", "22:00")]),
            flat: schedule(0.6, &[("06:00", "08:00"), ("13:00", "17:00")]),
            valley: schedule(0.4, &[("22:00", "02:00")]),
            deep_valley: schedule(0.2, &[("02:00", "06:00"), ("11:00", "13:00")]),
        }
    }

    #[rstest]
    #[case("00:00", 0)]
    #[case("11:30", 690)]
    #[case("24:00", 1440)]
    fn test_time_of_day_parse(#[case] s: &str, #[case] minutes: u16) {
        assert_eq!(time(s).minutes(), minutes);
    }

    #[rstest]
    #[case("24:01")]
    #[case("12:60")]
    #[case("1200")]
    #[case("ab:00")]
    #[case("")]
    fn test_time_of_day_parse_invalid(#[case] s: &str) {
        assert!(s.parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_time_of_day_display() {
        assert_eq!(time("7:05").to_string(), "07:05");
        assert_eq!(TimeOfDay::from_hour(23).to_string(), "23:00");
    }

    #[rstest]
    #[case(PriceTier::SharpPeak, "sharp_peak")]
    #[case(PriceTier::DeepValley, "deep_valley")]
    fn test_price_tier_display(#[case] tier: PriceTier, #[case] expected: &str) {
        assert_eq!(tier.to_string(), expected);
    }

    #[test]
    fn test_time_of_day_from_hour() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::MIDNIGHT);
        assert_eq!(TimeOfDay::from_hour(17).minutes(), 17 * 60);
        assert!(TimeOfDay::from_hour(HOURS_PER_DAY).is_end_of_day());
    }

    #[rstest]
    #[case("23:00", true)]
    #[case("01:00", true)]
    #[case("22:00", true)]
    #[case("02:00", false)]
    #[case("10:00", false)]
    fn test_range_wraps_midnight(#[case] t: &str, #[case] expected: bool) {
        let range = range("22:00", "02:00");
        assert!(range.wraps_midnight());
        assert_eq!(range.contains(time(t)), expected);
    }

    #[test]
    fn test_range_end_exclusive() {
        let range = range("08:00", "11:00");
        assert!(range.contains(time("08:00")));
        assert!(range.contains(time("10:59")));
        assert!(!range.contains(time("11:00")));
    }

    #[rstest]
    #[case("17:00", Some(PriceTier::SharpPeak), 1.2)]
    #[case("20:00", Some(PriceTier::Peak), 1.0)]
    #[case("14:00", Some(PriceTier::Flat), 0.6)]
    #[case("23:00", Some(PriceTier::Valley), 0.4)]
    #[case("03:00", Some(PriceTier::DeepValley), 0.2)]
    fn test_resolve(
        tariff: Tariff,
        #[case] t: &str,
        #[case] tier: Option<PriceTier>,
        #[case] price: f64,
    ) {
        assert_eq!(
            tariff.resolve(time(t)),
            tier.map(|tier| (tier, MoneyPerEnergy(price)))
        );
        assert_eq!(tariff.price_at(time(t)), MoneyPerEnergy(price));
    }

    #[test]
    fn test_resolve_overlap_uses_priority() {
        let tariff = Tariff {
            sharp_peak: schedule(1.5, &[("18:00", "19:00")]),
            peak: schedule(1.0, &[("17:00", "21:00")]),
            ..Tariff::default()
        };
        assert_eq!(
            tariff.resolve(time("18:30")),
            Some((PriceTier::SharpPeak, MoneyPerEnergy(1.5)))
        );
        assert_eq!(
            tariff.resolve(time("17:30")),
            Some((PriceTier::Peak, MoneyPerEnergy(1.0)))
        );
    }

    #[test]
    fn test_resolve_uncovered() {
        let tariff = Tariff {
            peak: schedule(1.0, &[("08:00", "20:00")]),
            ..Tariff::default()
        };
        assert_eq!(tariff.resolve(time("21:00")), None);
        assert_eq!(tariff.price_at(time("21:00")), MoneyPerEnergy(0.0));
    }

    #[rstest]
    fn test_day_curve(tariff: Tariff) {
        let curve = tariff.day_curve();
        assert_eq!(curve.iter().count(), HOURS_PER_DAY);
        assert!(curve.uncovered_hours().is_empty());
        assert_eq!(curve.price(0), MoneyPerEnergy(0.4));
        assert_eq!(curve.price(12), MoneyPerEnergy(0.2));
        assert_eq!(curve.price(18), MoneyPerEnergy(1.2));
        assert_eq!(curve.price(24), curve.price(0));
    }

    #[test]
    fn test_day_curve_uncovered_hours() {
        let tariff = Tariff {
            flat: schedule(0.6, &[("00:00", "22:00")]),
            ..Tariff::default()
        };
        assert_eq!(tariff.day_curve().uncovered_hours(), vec![22, 23]);
    }

    #[rstest]
    fn test_first_start(tariff: Tariff) {
        assert_eq!(
            tariff.first_start(PriceTier::DeepValley),
            Some(time("02:00"))
        );
        assert_eq!(Tariff::default().first_start(PriceTier::Peak), None);
    }

    #[rstest]
    fn test_validate_ok(tariff: Tariff) {
        assert!(tariff.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_range() {
        let tariff = Tariff {
            peak: schedule(1.0, &[("08:00", "08:00")]),
            ..Tariff::default()
        };
        assert!(tariff.validate().is_err());

        let tariff = Tariff {
            peak: schedule(1.0, &[("24:00", "02:00")]),
            ..Tariff::default()
        };
        assert!(tariff.validate().is_err());
    }

    #[test]
    fn test_validate_negative_price() {
        let tariff = Tariff {
            valley: schedule(-0.1, &[("22:00", "06:00")]),
            ..Tariff::default()
        };
        assert_eq!(
            tariff.validate().unwrap_err().to_string(),
            "tariff.valley.price must be a finite number greater than or equal to zero"
        );
    }

    #[test]
    fn test_deserialise_tariff() {
        let tariff: Tariff = toml::from_str(
            r#"
            [peak]
            price = 1.0
            periods = [{ start = "08:00", end = "11:00" }]

            [valley]
            price = 0.4
            periods = [{ start = "22:00", end = "06:00" }]
            "#,
        )
        .unwrap();
        assert_eq!(tariff.peak, schedule(1.0, &[("08:00", "11:00")]));
        assert_eq!(tariff.valley, schedule(0.4, &[("22:00", "06:00")]));
        assert_eq!(tariff.sharp_peak, TierSchedule::default());
    }

    #[test]
    fn test_price_tier_labels() {
        assert_eq!(PriceTier::DeepValley.to_string(), "deep_valley");
        assert_eq!(
            PriceTier::iter().collect_vec(),
            [
                PriceTier::SharpPeak,
                PriceTier::Peak,
                PriceTier::Flat,
                PriceTier::Valley,
                PriceTier::DeepValley
            ]
        );
    }
}
