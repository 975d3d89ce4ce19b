//! System-wide constants for the DataMarket settlement core.

use rust_decimal::Decimal;

/// Gap between consecutive delivery proofs, in hours, above which a
/// delivery counts as late (9 minutes).
pub const DEFAULT_LATENCY_THRESHOLD_HOURS: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Minimum number of linked delivery proofs a latency claim needs.
pub const MIN_LATENCY_ENTRIES: usize = 2;

/// Message returned when a latency claim has nothing to compare against.
pub const NO_OLDER_RECORD_MESSAGE: &str = "no older record to compare";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "DataMarket";
