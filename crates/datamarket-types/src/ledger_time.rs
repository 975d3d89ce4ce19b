//! Minute-resolution timestamps exchanged as `"YYYY-MM-DD HH:MM"` strings.
//!
//! All times are implicitly UTC. The transaction timestamp supplied by the
//! ledger is truncated to the minute before it is compared against an
//! escrow's end date.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{DataMarketError, Result, money::round2};

/// `chrono` format string for ledger timestamps.
pub const LEDGER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A UTC timestamp with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LedgerTime(NaiveDateTime);

impl LedgerTime {
    /// Parse a `"YYYY-MM-DD HH:MM"` string.
    pub fn parse(value: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(value.trim(), LEDGER_TIME_FORMAT)
            .map(Self)
            .map_err(|e| DataMarketError::DateParse {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Truncate a UTC instant to the minute.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let naive = at.naive_utc();
        let truncated = naive
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(naive);
        Self(truncated)
    }

    /// The instant as a UTC `DateTime`.
    #[must_use]
    pub fn to_datetime(self) -> DateTime<Utc> {
        self.0.and_utc()
    }

    /// Hours from `self` to `later`, rounded to two decimals.
    /// Negative when `later` precedes `self`.
    #[must_use]
    pub fn hours_until(self, later: Self) -> Decimal {
        let minutes = (later.0 - self.0).num_minutes();
        round2(Decimal::from(minutes) / Decimal::from(60))
    }
}

impl fmt::Display for LedgerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(LEDGER_TIME_FORMAT))
    }
}

impl FromStr for LedgerTime {
    type Err = DataMarketError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for LedgerTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LedgerTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
