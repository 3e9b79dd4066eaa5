//! System-wide constants for the OpenGate reservation core.

/// Default hold TTL in seconds (how long selected seats stay reserved
/// while the buyer works through checkout).
pub const DEFAULT_HOLD_TTL_SECS: u64 = 300;

/// Default interval between background expiry sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Maximum seats one checkout session may hold simultaneously.
pub const DEFAULT_MAX_SEATS_PER_SESSION: usize = 4;

/// Maximum rows per section. Rows are labeled with single letters `A`..`Z`.
pub const MAX_ROWS_PER_SECTION: u32 = 26;

/// Confirmation idempotency cache size (number of transaction IDs to remember).
pub const CONFIRMATION_CACHE_SIZE: usize = 100_000;

/// Provider response code for a successful payment.
pub const RESPONSE_CODE_SUCCESS: &str = "101";

/// Provider response code for a buyer-cancelled payment.
pub const RESPONSE_CODE_CANCELLED: &str = "111";

/// Provider response codes for failed payments (insufficient funds,
/// declined, timed out). Every other unknown code is also treated as failed.
pub const RESPONSE_CODES_FAILED: [&str; 3] = ["102", "108", "112"];

/// Fallback reason recorded when a failure response carries no message.
pub const FALLBACK_FAILURE_REASON: &str = "Payment failed";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core name.
pub const CORE_NAME: &str = "OpenGate";
