//! The closed provider response-code table.
//!
//! The wallet provider reports a small fixed set of codes. Anything outside
//! the set is a failure by definition: an unknown code must never be
//! treated as success.

use opengate_types::{constants, PaymentOutcome};

/// Map a provider response code to the internal outcome taxonomy.
///
/// For the known failure codes the provider's own message is the retained
/// reason, with a canned fallback when it is blank.
#[must_use]
pub fn map_response_code(code: &str, message: &str) -> PaymentOutcome {
    if code == constants::RESPONSE_CODE_SUCCESS {
        return PaymentOutcome::Success;
    }
    if code == constants::RESPONSE_CODE_CANCELLED {
        return PaymentOutcome::Cancelled;
    }
    if constants::RESPONSE_CODES_FAILED.contains(&code) {
        let reason = if message.trim().is_empty() {
            constants::FALLBACK_FAILURE_REASON.to_string()
        } else {
            message.trim().to_string()
        };
        return PaymentOutcome::Failed { reason };
    }
    PaymentOutcome::Failed {
        reason: format!("unknown response code: {code}"),
    }
}
