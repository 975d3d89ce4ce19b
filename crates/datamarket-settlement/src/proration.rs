//! Time-based proration of an agreement's price.
//!
//! ```text
//! total     = round2(hours(start, end))
//! pph       = round2(price / total)            (0 when total is 0)
//! consumed  = round2(hours(start, now))
//! remaining = total - consumed
//! ```
//!
//! Nothing is clamped: a call before `start` yields negative consumed hours
//! and one after `end` yields negative remaining hours.

use datamarket_types::{DateHandling, LedgerTime, Result, money::{rate_per_hour, round2}};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How much of an agreement window has elapsed, and what an hour of it costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proration {
    pub total_hours: Decimal,
    pub price_per_hour: Decimal,
    pub consumed_hours: Decimal,
    pub remaining_hours: Decimal,
}

impl Proration {
    /// Prorate `price` over `[start, end]` as of `now`.
    ///
    /// # Errors
    /// `DateParse` for an unparseable bound under [`DateHandling::Strict`].
    /// Lenient handling treats such a span as zero hours.
    pub fn compute(
        start: &str,
        end: &str,
        price: Decimal,
        now: LedgerTime,
        handling: DateHandling,
    ) -> Result<Self> {
        let start = parse(start, handling)?;
        let end = parse(end, handling)?;
        let total_hours = match (start, end) {
            (Some(s), Some(e)) => s.hours_until(e),
            _ => Decimal::ZERO,
        };
        let consumed_hours = start.map_or(Decimal::ZERO, |s| s.hours_until(now));
        Ok(Self {
            total_hours,
            price_per_hour: rate_per_hour(price, total_hours),
            consumed_hours,
            remaining_hours: total_hours - consumed_hours,
        })
    }

    /// `round2(consumed * pph)`: what the elapsed part of the window is worth.
    #[must_use]
    pub fn consumed_share(&self) -> Decimal {
        round2(self.consumed_hours * self.price_per_hour)
    }

    /// `round2(remaining * pph)`: what the rest of the window is worth.
    #[must_use]
    pub fn remaining_share(&self) -> Decimal {
        round2(self.remaining_hours * self.price_per_hour)
    }
}

/// Whether `end` is the current minute.
///
/// # Errors
/// `DateParse` for an unparseable `end` under [`DateHandling::Strict`].
pub fn ends_at(end: &str, now: LedgerTime, handling: DateHandling) -> Result<bool> {
    Ok(parse(end, handling)?.is_some_and(|end| end == now))
}

/// Gap in hours between two delivery timestamps. Zero when either side is
/// unparseable under lenient handling.
pub fn gap_hours(earlier: &str, later: &str, handling: DateHandling) -> Result<Decimal> {
    Ok(match (parse(earlier, handling)?, parse(later, handling)?) {
        (Some(a), Some(b)) => a.hours_until(b),
        _ => Decimal::ZERO,
    })
}

fn parse(value: &str, handling: DateHandling) -> Result<Option<LedgerTime>> {
    match LedgerTime::parse(value) {
        Ok(t) => Ok(Some(t)),
        Err(err) => match handling {
            DateHandling::Strict => Err(err),
            DateHandling::Lenient => {
                warn!(value, error = %err, "treating unparseable date as a zero-hour span");
                Ok(None)
            }
        },
    }
}
