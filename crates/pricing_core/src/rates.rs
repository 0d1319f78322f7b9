//! Rate/multiplier evaluator: time-of-day/day-of-week advanced rates and
//! seasonal multipliers (spec §4.6).
//!
//! Business times are interpreted as Europe/Paris wall-clock values without
//! TZ conversion (spec §9, "Timezone handling") — callers are expected to
//! hand in `pickup_at` already localized. Each window is an inclusive
//! `[start, end)` range per field, with overnight ranges wrapping across
//! midnight.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round2;
use crate::rules::{AdjustmentType, AppliedRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppliesTo {
    Night,
    Weekend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedRate {
    pub id: String,
    pub applies_to: AppliesTo,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// 0=Sun..6=Sat. Defaults to weekend `{0, 6}` when absent (spec §4.6).
    pub days_of_week: Option<HashSet<u8>>,
    pub adjustment_type: AdjustmentType,
    pub value: Decimal,
    pub priority: i32,
    pub is_active: bool,
}

impl AdvancedRate {
    fn effective_days(&self) -> HashSet<u8> {
        self.days_of_week.clone().unwrap_or_else(|| [0u8, 6].into_iter().collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalMultiplier {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub multiplier: Decimal,
    pub priority: i32,
    pub is_active: bool,
}

/// `(hour, minute) in [start, end)`, with overnight ranges (`start > end`)
/// wrapping midnight as two arcs.
pub fn time_in_range(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        now >= start && now < end
    } else {
        now >= start || now < end
    }
}

fn chrono_weekday_to_spec(day: chrono::Weekday) -> u8 {
    // chrono: Mon=0..Sun=6. Spec: Sun=0..Sat=6.
    match day {
        chrono::Weekday::Sun => 0,
        chrono::Weekday::Mon => 1,
        chrono::Weekday::Tue => 2,
        chrono::Weekday::Wed => 3,
        chrono::Weekday::Thu => 4,
        chrono::Weekday::Fri => 5,
        chrono::Weekday::Sat => 6,
    }
}

fn rate_applies(rate: &AdvancedRate, pickup_at: NaiveDateTime) -> bool {
    if !rate.is_active {
        return false;
    }
    match rate.applies_to {
        AppliesTo::Night => {
            let now = NaiveTime::from_hms_opt(pickup_at.hour(), pickup_at.minute(), 0).unwrap();
            time_in_range(now, rate.start_time, rate.end_time)
        }
        AppliesTo::Weekend => {
            let day = chrono_weekday_to_spec(pickup_at.weekday());
            rate.effective_days().contains(&day)
        }
    }
}

fn adjust(price: Decimal, adjustment_type: AdjustmentType, value: Decimal) -> Decimal {
    match adjustment_type {
        AdjustmentType::Percentage => price * (Decimal::ONE + value / Decimal::from(100)),
        AdjustmentType::FixedAmount => price + value,
    }
}

/// Apply all matching, active advanced rates in descending priority order,
/// returning the adjusted price and the audit trail of applied rules.
pub fn apply_advanced_rates(
    price: Decimal,
    rates: &[AdvancedRate],
    pickup_at: NaiveDateTime,
) -> (Decimal, Vec<AppliedRule>) {
    let mut applicable: Vec<&AdvancedRate> = rates.iter().filter(|r| rate_applies(r, pickup_at)).collect();
    applicable.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut current = price;
    let mut applied = Vec::new();
    for rate in applicable {
        let before = current;
        current = round2(adjust(current, rate.adjustment_type, rate.value));
        applied.push(AppliedRule::AdvancedRate {
            rate_id: rate.id.clone(),
            applies_to: format!("{:?}", rate.applies_to).to_uppercase(),
            adjustment_type: rate.adjustment_type,
            value: rate.value,
            price_before: before,
            price_after: current,
        });
    }
    (current, applied)
}

/// `pickupAt` falls in `[startDate, endDate]` inclusive; `endDate` is
/// end-of-day (add 24h before comparing), per spec §4.6.
fn seasonal_applies(seasonal: &SeasonalMultiplier, pickup_at: NaiveDateTime) -> bool {
    if !seasonal.is_active {
        return false;
    }
    let start = seasonal.start_date.and_hms_opt(0, 0, 0).unwrap();
    let end = seasonal.end_date.and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::hours(24);
    pickup_at >= start && pickup_at < end
}

/// Apply all matching seasonal multipliers in descending priority order.
pub fn apply_seasonal_multipliers(
    price: Decimal,
    seasonals: &[SeasonalMultiplier],
    pickup_at: NaiveDateTime,
) -> (Decimal, Vec<AppliedRule>) {
    let mut applicable: Vec<&SeasonalMultiplier> =
        seasonals.iter().filter(|s| seasonal_applies(s, pickup_at)).collect();
    applicable.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut current = price;
    let mut applied = Vec::new();
    for seasonal in applicable {
        let before = current;
        current = round2(current * seasonal.multiplier);
        applied.push(AppliedRule::SeasonalMultiplier {
            seasonal_id: seasonal.id.clone(),
            multiplier: seasonal.multiplier,
            price_before: before,
            price_after: current,
        });
    }
    (current, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn overnight_range_wraps_midnight() {
        let start = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        assert!(time_in_range(NaiveTime::from_hms_opt(23, 30, 0).unwrap(), start, end));
        assert!(time_in_range(NaiveTime::from_hms_opt(1, 0, 0).unwrap(), start, end));
        assert!(!time_in_range(NaiveTime::from_hms_opt(12, 0, 0).unwrap(), start, end));
    }

    #[test]
    fn weekend_rate_defaults_to_sat_sun() {
        let rate = AdvancedRate {
            id: "weekend".into(),
            applies_to: AppliesTo::Weekend,
            start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            days_of_week: None,
            adjustment_type: AdjustmentType::Percentage,
            value: dec!(10),
            priority: 1,
            is_active: true,
        };
        // 2024-01-06 is a Saturday.
        let saturday = dt(2024, 1, 6, 10, 0);
        let (price, applied) = apply_advanced_rates(dec!(100), std::slice::from_ref(&rate), saturday);
        assert_eq!(price, dec!(110));
        assert_eq!(applied.len(), 1);

        // 2024-01-08 is a Monday.
        let monday = dt(2024, 1, 8, 10, 0);
        let (price_monday, applied_monday) = apply_advanced_rates(dec!(100), &[rate], monday);
        assert_eq!(price_monday, dec!(100));
        assert!(applied_monday.is_empty());
    }

    #[test]
    fn rates_apply_in_descending_priority() {
        let low = AdvancedRate {
            id: "low".into(),
            applies_to: AppliesTo::Night,
            start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            days_of_week: None,
            adjustment_type: AdjustmentType::FixedAmount,
            value: dec!(5),
            priority: 1,
            is_active: true,
        };
        let high = AdvancedRate {
            id: "high".into(),
            priority: 10,
            ..low.clone()
        };
        let (_, applied) = apply_advanced_rates(dec!(100), &[low, high], dt(2024, 1, 1, 12, 0));
        assert_eq!(applied.len(), 2);
        match &applied[0] {
            AppliedRule::AdvancedRate { rate_id, .. } => assert_eq!(rate_id, "high"),
            _ => panic!("expected advanced rate"),
        }
    }

    #[test]
    fn seasonal_end_date_is_end_of_day_inclusive() {
        let seasonal = SeasonalMultiplier {
            id: "summer".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 31).unwrap(),
            multiplier: dec!(1.3),
            priority: 1,
            is_active: true,
        };
        let last_moment = dt(2024, 7, 31, 23, 59);
        let (price, applied) = apply_seasonal_multipliers(dec!(100), &[seasonal], last_moment);
        assert_eq!(price, dec!(130.0));
        assert_eq!(applied.len(), 1);
    }
}
