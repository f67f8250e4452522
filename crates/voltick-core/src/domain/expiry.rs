use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::ValidationError;

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Option expiry as a civil calendar date.
///
/// Expiries carry no intraday component; time to expiry is measured in
/// whole days and converted to years on a 365-day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryDate(Date);

impl ExpiryDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let date = Date::parse(input.trim(), DATE_FORMAT).map_err(|_| {
            ValidationError::InvalidExpiryDate {
                value: input.to_owned(),
            }
        })?;
        Ok(Self(date))
    }

    pub fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    /// Year fraction from `valuation` to this expiry on an ACT/365 count.
    ///
    /// Negative or zero for expired contracts; callers treat that as the
    /// intrinsic-value edge rather than an error.
    pub fn year_fraction(self, valuation: ExpiryDate) -> f64 {
        let days = (self.0 - valuation.0).whole_days();
        days as f64 / 365.0
    }

    pub fn into_inner(self) -> Date {
        self.0
    }

    pub fn format_iso(self) -> String {
        self.0
            .format(DATE_FORMAT)
            .expect("ExpiryDate must be ISO formattable")
    }
}

impl Display for ExpiryDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_iso())
    }
}

impl Serialize for ExpiryDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_iso())
    }
}

impl<'de> Deserialize<'de> for ExpiryDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_date() {
        let parsed = ExpiryDate::parse("2026-06-19").expect("must parse");
        assert_eq!(parsed.format_iso(), "2026-06-19");
    }

    #[test]
    fn rejects_garbage_date() {
        assert!(matches!(
            ExpiryDate::parse("06/19/2026"),
            Err(ValidationError::InvalidExpiryDate { .. })
        ));
    }

    #[test]
    fn year_fraction_uses_365_day_count() {
        let valuation = ExpiryDate::parse("2026-01-01").expect("date");
        let expiry = ExpiryDate::parse("2027-01-01").expect("date");
        assert!((expiry.year_fraction(valuation) - 1.0).abs() < 1e-12);

        let past = ExpiryDate::parse("2025-12-31").expect("date");
        assert!(past.year_fraction(valuation) < 0.0);
    }
}
