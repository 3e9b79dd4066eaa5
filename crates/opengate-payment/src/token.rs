//! Integrity token math for the mobile-wallet exchange.
//!
//! The token is a SHA-256 hex digest over the direct concatenation of the
//! transaction id, the rendered amount, the item details, the merchant
//! secret, and the provider response code, in that order. The secret is
//! key material concatenated inline; it never appears next to the token on
//! the wire. At initiation time the response code field is the empty
//! string; verification recomputes with the code the provider declared.
//!
//! Determinism matters: both ends must render the amount identically, so
//! [`format_amount`] is the single place that turns a decimal into the
//! string fed to the digest and to the `amt` query parameter.

use opengate_types::TransactionId;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// Render an amount for the wire and the token: trailing zeros trimmed,
/// so `150.00` becomes `"150"` and `150.75` stays `"150.75"`.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Compute the integrity token over the five bound fields.
///
/// The same inputs always yield the same token; changing any single input
/// byte (one amount digit, one id character) changes it.
#[must_use]
pub fn generate_token(
    transaction_id: &TransactionId,
    amount: Decimal,
    item_details: &str,
    merchant_secret: &str,
    response_code: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(transaction_id.as_str().as_bytes());
    hasher.update(format_amount(amount).as_bytes());
    hasher.update(item_details.as_bytes());
    hasher.update(merchant_secret.as_bytes());
    hasher.update(response_code.as_bytes());
    hex::encode(hasher.finalize())
}
