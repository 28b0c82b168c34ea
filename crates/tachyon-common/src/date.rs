//! Monthly-resolution calendar date (`YYYYMM`).
//!
//! Grounded on `tachy_date.h`: arithmetic is strictly monthly, there is no
//! notion of a day-of-month. `Date - Date` yields a signed month count;
//! `Date + months` yields a `Date`.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::{TachyonError, TachyonErrorKind};

/// A calendar date at monthly resolution: `year in 1..=9999`, `month in 1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Date {
    year: u16,
    month: u8,
}

impl Date {
    /// `1001` — October, year 1. The earliest representable date.
    pub fn min_date() -> Self {
        Date { year: 1, month: 10 }
    }

    /// Construct from a packed `YYYYMM` integer (e.g. `201703` for March 2017).
    pub fn from_yyyymm(yyyymm: u32) -> Result<Self, TachyonError> {
        let year = (yyyymm / 100) as u16;
        let month = (yyyymm % 100) as u8;
        Self::from_year_month(year, month)
    }

    pub fn from_year_month(year: u16, month: u8) -> Result<Self, TachyonError> {
        let dt = Date { year, month };
        if dt.is_valid() {
            Ok(dt)
        } else {
            Err(TachyonError::new(TachyonErrorKind::InvalidDate)
                .with_message(format!("invalid date {year:04}{month:02}")))
        }
    }

    fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month) && (1..=9999).contains(&self.year)
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn as_yyyymm(&self) -> u32 {
        100 * self.year as u32 + self.month as u32
    }

    /// Checked month-offset: fails rather than panicking on overflow/underflow
    /// past the valid year range.
    pub fn checked_add_months(&self, months: i32) -> Result<Self, TachyonError> {
        let total = self.year as i64 * 12 + (self.month as i64 - 1) + months as i64;
        if total < 0 {
            return Err(TachyonError::new(TachyonErrorKind::InvalidDate)
                .with_message("date arithmetic underflowed below year 0"));
        }
        let year = total / 12;
        let month = (total % 12) + 1;
        Self::from_year_month(year as u16, month as u8)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl Add<i32> for Date {
    type Output = Date;

    /// Panics on overflow past the representable range — callers that need a
    /// checked variant should use [`Date::checked_add_months`].
    fn add(self, months: i32) -> Date {
        self.checked_add_months(months)
            .expect("date arithmetic out of range")
    }
}

impl Sub<i32> for Date {
    type Output = Date;

    fn sub(self, months: i32) -> Date {
        self + (-months)
    }
}

impl Sub<Date> for Date {
    type Output = i32;

    fn sub(self, other: Date) -> i32 {
        12 * (self.year as i32 - other.year as i32) + self.month as i32 - other.month as i32
    }
}

impl FromStr for Date {
    type Err = TachyonError;

    /// Parses a packed `YYYYMM` string, e.g. `"201703"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let yyyymm: u32 = s.parse().map_err(|_| {
            TachyonError::new(TachyonErrorKind::InvalidDate)
                .with_message(format!("not a YYYYMM integer: {s:?}"))
        })?;
        Self::from_yyyymm(yyyymm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_date_is_1001() {
        assert_eq!(Date::min_date().as_yyyymm(), 1001);
    }

    #[test]
    fn rejects_invalid_month() {
        assert!(Date::from_yyyymm(201713).is_err());
        assert!(Date::from_yyyymm(201700).is_err());
    }

    #[test]
    fn month_arithmetic_wraps_year() {
        let d = Date::from_yyyymm(201711).unwrap();
        assert_eq!((d + 2).as_yyyymm(), 201801);
        assert_eq!((d - 11).as_yyyymm(), 201612);
    }

    #[test]
    fn subtraction_counts_months() {
        let a = Date::from_yyyymm(201703).unwrap();
        let b = Date::from_yyyymm(201701).unwrap();
        assert_eq!(a - b, 2);
        assert_eq!(b - a, -2);
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Date::from_yyyymm(201701).unwrap();
        let b = Date::from_yyyymm(201703).unwrap();
        assert!(a < b);
    }

    #[test]
    fn parses_from_str_and_round_trips_display() {
        let d: Date = "201703".parse().unwrap();
        assert_eq!(d.as_yyyymm(), 201703);
        assert_eq!(d.to_string(), "201703");
        assert!("not-a-date".parse::<Date>().is_err());
    }
}
