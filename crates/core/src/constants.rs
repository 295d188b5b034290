/// Default freshness window for cached balances, in seconds (5 minutes).
pub const DEFAULT_BALANCE_FRESHNESS_SECS: i64 = 5 * 60;

/// Default settle delay after triggering an upstream sync, in seconds.
///
/// The upstream sync is asynchronous; this is a documented approximation
/// (the sync may finish sooner or later than the delay).
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 6;

/// Default matching window: transactions this close in time are grouped
/// into the same candidate deal.
pub const DEFAULT_MATCH_WINDOW_HOURS: i64 = 12;

/// Default rate tolerance for deal classification, in percent.
pub const DEFAULT_RATE_TOLERANCE_PERCENT: &str = "2";

/// Default lookback horizon for reconciliation, in hours.
pub const DEFAULT_MATCH_LOOKBACK_HOURS: i64 = 48;

/// Default fixed delay between poll cycles, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2 * 60;

/// Minor units per major currency unit for upstreams that report amounts
/// in minor units (e.g. kobo, cents).
pub const MINOR_UNITS_SCALE: u32 = 2;
