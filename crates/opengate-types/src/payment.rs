//! Payment types: transactions, outcomes, and the provider boundary records.
//!
//! A [`Transaction`] is one attempt to pay for one order via one provider.
//! Initiation creates it in the PENDING outcome; verification resolves it
//! exactly once to a terminal outcome. Retrying a failed payment creates a
//! new transaction rather than reopening the old one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, TransactionId};

/// Which provider integration handles the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Redirect to the card gateway's hosted page.
    Card,
    /// Token-bound redirect to the mobile wallet provider.
    MobileWallet,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "CARD"),
            Self::MobileWallet => write!(f, "MOBILE_WALLET"),
        }
    }
}

/// The outcome of a payment attempt.
///
/// `Pending` is the only non-terminal outcome; everything else is final for
/// the transaction (though a failed order may retry with a new transaction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    /// Initiated, no provider verdict yet.
    Pending,
    /// The provider verified a completed payment.
    Success,
    /// The buyer cancelled at the provider.
    Cancelled,
    /// The provider rejected the payment. The reason is retained for audit.
    Failed { reason: String },
}

impl PaymentOutcome {
    /// Can this outcome transition to the given target outcome?
    #[must_use]
    pub fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::Success | Self::Cancelled | Self::Failed { .. }
            )
        )
    }

    /// Terminal outcomes admit no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed { reason } => write!(f, "FAILED({reason})"),
        }
    }
}

/// One payment attempt for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Provider-facing identifier, generated at initiation.
    pub id: TransactionId,
    /// The order this attempt pays for.
    pub order_id: OrderId,
    pub method: PaymentMethod,
    /// Amount charged. Must equal the order's recorded total.
    pub amount: Decimal,
    /// Human-readable purchase summary bound into the integrity token.
    pub item_details: String,
    pub outcome: PaymentOutcome,
    /// The provider response code that resolved this transaction, if any.
    pub response_code: Option<String>,
    /// The provider's message accompanying the resolving code, if any.
    pub response_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a fresh PENDING transaction at initiation time.
    #[must_use]
    pub fn new(
        order_id: OrderId,
        method: PaymentMethod,
        amount: Decimal,
        item_details: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            order_id,
            method,
            amount,
            item_details: item_details.into(),
            outcome: PaymentOutcome::Pending,
            response_code: None,
            response_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` once a terminal outcome was recorded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// Record the terminal outcome for this attempt, exactly once.
    ///
    /// # Errors
    /// Returns `TransactionAlreadyResolved` on a repeat resolution, or an
    /// internal inconsistency when asked to "resolve" back to PENDING.
    pub fn resolve(
        &mut self,
        outcome: PaymentOutcome,
        code: Option<String>,
        message: Option<String>,
    ) -> crate::Result<()> {
        if !outcome.is_terminal() {
            return Err(crate::OpengateError::InternalInconsistency(format!(
                "Cannot resolve transaction {} to {outcome}",
                self.id
            )));
        }
        if self.is_resolved() {
            return Err(crate::OpengateError::TransactionAlreadyResolved(
                self.id.clone(),
            ));
        }
        self.outcome = outcome;
        self.response_code = code;
        self.response_message = message;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Transaction {
    pub fn dummy(order_id: OrderId, amount: Decimal) -> Self {
        Self::new(
            order_id,
            PaymentMethod::MobileWallet,
            amount,
            "2 x Test Event",
        )
    }
}

/// What the provider reports back for a transaction, via callback or poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The transaction the provider is reporting on.
    #[serde(rename = "transactionId")]
    pub transaction_id: TransactionId,
    /// Provider status code (`"101"`, `"111"`, ...).
    pub code: String,
    /// Provider-supplied human-readable message.
    pub message: String,
    /// Provider-computed integrity token over the response fields.
    pub token: String,
}

/// What `initiate` hands back: the pending transaction plus where to send
/// the buyer's browser.
#[derive(Debug, Clone)]
pub struct PaymentInitiation {
    pub transaction: Transaction,
    pub redirect_url: String,
}
