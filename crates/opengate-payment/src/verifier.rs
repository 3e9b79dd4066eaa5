//! Transaction verifier — the gate every provider response passes before
//! any reservation state may change.
//!
//! Verification recomputes the integrity token from the stored
//! transaction's own fields plus the response's declared code, and compares
//! it against the token the response carries. A forged or tampered
//! completion callback fails that comparison and nothing is committed.

use opengate_types::{
    OpengateError, PaymentOutcome, ProviderResponse, Result, Transaction,
};

use crate::outcome::map_response_code;
use crate::token::generate_token;

/// Validates provider responses against stored transactions.
pub struct TransactionVerifier {
    merchant_secret: String,
}

impl TransactionVerifier {
    #[must_use]
    pub fn new(merchant_secret: impl Into<String>) -> Self {
        Self {
            merchant_secret: merchant_secret.into(),
        }
    }

    /// Verify a provider response against the transaction it claims to
    /// resolve, and map its code into the outcome taxonomy.
    ///
    /// 1. The response must name the stored transaction
    /// 2. Its token must equal the token recomputed from the stored
    ///    amount and item details, the merchant secret, and the
    ///    response's own code
    /// 3. Only then is the code mapped; unknown codes map to failed
    ///
    /// # Errors
    /// Returns `TransactionMismatch` for a misdirected response and
    /// `TokenMismatch` for a failed integrity check. Neither is ever
    /// downgraded to a payment outcome.
    pub fn verify(
        &self,
        transaction: &Transaction,
        response: &ProviderResponse,
    ) -> Result<PaymentOutcome> {
        // Check 1: the response must be about this transaction.
        if response.transaction_id != transaction.id {
            return Err(OpengateError::TransactionMismatch {
                expected: transaction.id.clone(),
                actual: response.transaction_id.clone(),
            });
        }

        // Check 2: recompute the token and compare.
        let expected = generate_token(
            &transaction.id,
            transaction.amount,
            &transaction.item_details,
            &self.merchant_secret,
            &response.code,
        );
        if response.token != expected {
            tracing::warn!(
                transaction = %transaction.id,
                code = %response.code,
                "Provider response failed integrity check"
            );
            return Err(OpengateError::TokenMismatch(transaction.id.clone()));
        }

        // Check 3: code → outcome.
        Ok(map_response_code(&response.code, &response.message))
    }
}
