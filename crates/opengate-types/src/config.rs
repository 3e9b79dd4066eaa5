//! Configuration types for the hold lifecycle and the payment providers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

/// Timing and limit configuration for seat holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldConfig {
    /// How long an acquired hold lives before the sweep reclaims it.
    pub ttl: Duration,
    /// Maximum seats one session may hold at once.
    pub max_seats_per_session: usize,
    /// How often the background sweeper looks for expired holds.
    pub sweep_interval: Duration,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(constants::DEFAULT_HOLD_TTL_SECS),
            max_seats_per_session: constants::DEFAULT_MAX_SEATS_PER_SESSION,
            sweep_interval: Duration::from_secs(constants::DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl HoldConfig {
    /// TTL as a chrono duration for expiry arithmetic on timestamps.
    /// Saturates instead of failing on absurdly large configured values.
    #[must_use]
    pub fn ttl_chrono(&self) -> chrono::Duration {
        let millis = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        chrono::Duration::milliseconds(millis)
    }
}

/// Provider endpoints and credentials for both payment flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Hosted page the card flow redirects to.
    pub gateway_redirect_url: String,
    /// Mobile wallet initiation endpoint; the token-bound query string is
    /// appended to this.
    pub wallet_api_url: String,
    /// Mobile wallet status endpoint; the transaction ID is appended as a
    /// path segment.
    pub wallet_status_url: String,
    /// Merchant client identifier sent on initiation.
    pub client_id: String,
    /// Shared secret bound into every integrity token. Never leaves the
    /// process.
    pub merchant_secret: String,
    /// Where the provider sends the buyer back after the wallet flow.
    pub callback_url: String,
}

impl PaymentConfig {
    /// Sandbox configuration for tests and local runs.
    #[must_use]
    pub fn sandbox() -> Self {
        Self {
            gateway_redirect_url: "https://gateway.sandbox.example.com/payment".to_string(),
            wallet_api_url: "https://wallet.sandbox.example.com/api/initiate".to_string(),
            wallet_status_url: "https://wallet.sandbox.example.com/api/requeststatus".to_string(),
            client_id: "sandbox-client".to_string(),
            merchant_secret: "sandbox-secret".to_string(),
            callback_url: "https://tickets.sandbox.example.com/payment/callback".to_string(),
        }
    }
}
