use std::fmt;

use chrono::NaiveDate;
use derive_more::{Add, AddAssign, Sub, SubAssign};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LeaveError;

/// A quantity of leave days held as a fixed-point decimal.
///
/// Request durations are always whole or half days. Allocations may carry
/// finer fractions (monthly accrual of 1.25 days, for instance).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Add,
    Sub,
    AddAssign,
    SubAssign,
)]
#[serde(transparent)]
pub struct Days(Decimal);

impl Days {
    pub const ZERO: Days = Days(Decimal::ZERO);
    pub const HALF: Days = Days(Decimal::from_parts(5, 0, 0, false, 1));
    /// Upper bound for any single ledger figure.
    pub const MAX_PER_YEAR: Days = Days(Decimal::from_parts(366, 0, 0, false, 0));

    pub fn whole(days: i64) -> Self {
        Days(Decimal::from(days))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// True when the quantity is a multiple of half a day.
    pub fn is_half_step(self) -> bool {
        self.0
            .checked_mul(Decimal::TWO)
            .is_some_and(|doubled| doubled.fract().is_zero())
    }

    pub fn exceeds_year(self) -> bool {
        self > Days::MAX_PER_YEAR
    }

    pub fn checked_add(self, other: Days) -> Option<Days> {
        self.0.checked_add(other.0).map(Days)
    }
}

impl From<Decimal> for Days {
    fn from(value: Decimal) -> Self {
        Days(value.normalize())
    }
}

impl fmt::Display for Days {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Number of leave days covered by a request.
///
/// A missing `to_date` means a single-day request. Dates are calendar dates,
/// so the count never shifts across DST boundaries.
pub fn count_days(
    from_date: NaiveDate,
    to_date: Option<NaiveDate>,
    half_day: bool,
) -> Result<Days, LeaveError> {
    let whole = match to_date {
        None => 1,
        Some(to) if to < from_date => {
            return Err(LeaveError::validation(format!(
                "to_date ({to}) cannot be before from_date ({from_date})"
            )));
        }
        Some(to) => (to - from_date).num_days() + 1,
    };

    let days = Days::whole(whole);
    Ok(if half_day { days - Days::HALF } else { days })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn counts_inclusive_range() {
        let days = count_days(date(2024, 1, 1), Some(date(2024, 1, 5)), false).unwrap();
        assert_eq!(days.to_string(), "5");
    }

    #[test]
    fn half_day_range_drops_half() {
        let days = count_days(date(2024, 1, 1), Some(date(2024, 1, 5)), true).unwrap();
        assert_eq!(days.to_string(), "4.5");
    }

    #[test]
    fn single_day_defaults() {
        assert_eq!(count_days(date(2024, 1, 1), None, false).unwrap(), Days::whole(1));
        assert_eq!(count_days(date(2024, 1, 1), None, true).unwrap(), Days::HALF);
    }

    #[test]
    fn same_day_range_is_one_day() {
        let days = count_days(date(2024, 3, 10), Some(date(2024, 3, 10)), false).unwrap();
        assert_eq!(days, Days::whole(1));
    }

    #[test]
    fn crosses_dst_and_leap_day() {
        // 2024-03-09 .. 2024-03-11 spans the US DST switch
        let days = count_days(date(2024, 3, 9), Some(date(2024, 3, 11)), false).unwrap();
        assert_eq!(days, Days::whole(3));

        let days = count_days(date(2024, 2, 28), Some(date(2024, 3, 1)), false).unwrap();
        assert_eq!(days, Days::whole(3));
    }

    #[test]
    fn rejects_reversed_range() {
        let err = count_days(date(2024, 1, 5), Some(date(2024, 1, 1)), false).unwrap_err();
        assert!(matches!(err, LeaveError::Validation(_)));
    }

    #[test]
    fn display_is_normalized() {
        let days = Days::from(Decimal::new(50, 1));
        assert_eq!(days.to_string(), "5");
        assert_eq!((Days::HALF + Days::HALF).to_string(), "1");
    }

    #[test]
    fn half_step_detection() {
        assert!(Days::HALF.is_half_step());
        assert!(Days::whole(3).is_half_step());
        assert!(!Days::from(Decimal::new(125, 2)).is_half_step());
        assert!(!Days::from(Decimal::MAX).is_half_step());
    }

    #[test]
    fn year_bound() {
        assert!(!Days::whole(366).exceeds_year());
        assert!(Days::whole(367).exceeds_year());
        assert_eq!(Days::from(Decimal::MAX).checked_add(Days::whole(1)), None);
    }
}
