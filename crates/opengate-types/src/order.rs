//! Order types for the OpenGate reservation core.
//!
//! Two machines live here and they are deliberately distinct:
//!
//! - [`CheckoutStage`] tracks one buyer's **session** through the funnel.
//! - [`OrderStatus`] is the **persisted** order state the store records.
//!
//! The session is in-memory and advisory; the order status is authoritative
//! at confirmation time. A payment callback arriving after a restart is
//! reconciled against the order, not the session.
//!
//! ## Checkout funnel
//!
//! ```text
//!   ┌────────────────┐      ┌────────────┐      ┌─────────────────┐
//!   │ SEAT_SELECTION ├─────▶│ BUYER_INFO ├─────▶│ PAYMENT_PENDING │
//!   └───────┬────────┘      └─────┬──────┘      └────────┬────────┘
//!           │                     │                 ┌────┼─────────┐
//!           │                     │                 ▼    ▼         ▼
//!           │                     │          ┌─────────┐ ┌────────┐ ┌────────┐
//!           └─────────────────────┴─────────▶│CANCELLED│ │CONFIRMED│ │ FAILED │
//!                                            └─────────┘ └────────┘ └────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BuyerInfo, EventId, OrderId, SessionId, TransactionId};

/// Where a checkout session currently stands in the funnel.
///
/// Transitions are monotonic forward moves, except that any non-terminal
/// stage may jump to `Cancelled` when the buyer aborts or holds lapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutStage {
    /// Buyer is picking seats; holds are acquired and released freely.
    SeatSelection,
    /// Seats are held; buyer is filling in contact details.
    BuyerInfo,
    /// The order exists and a payment attempt may be in flight.
    PaymentPending,
    /// Payment succeeded and the seats are booked. Terminal.
    Confirmed,
    /// Buyer aborted or holds lapsed before payment resolved. Terminal.
    Cancelled,
    /// The provider reported a failed payment. Terminal.
    Failed,
}

impl CheckoutStage {
    /// Can this session transition to the given target stage?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::SeatSelection, Self::BuyerInfo)
                | (Self::BuyerInfo, Self::PaymentPending)
                | (
                    Self::PaymentPending,
                    Self::Confirmed | Self::Failed
                )
                | (
                    Self::SeatSelection | Self::BuyerInfo | Self::PaymentPending,
                    Self::Cancelled
                )
        )
    }

    /// Terminal stages admit no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SeatSelection => write!(f, "SEAT_SELECTION"),
            Self::BuyerInfo => write!(f, "BUYER_INFO"),
            Self::PaymentPending => write!(f, "PAYMENT_PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Persisted lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting a payment outcome.
    Pending,
    /// A successful payment was verified and the seats are booked.
    Confirmed,
    /// The payment was cancelled, failed, or the holds lapsed.
    Cancelled,
}

impl OrderStatus {
    /// Can this order transition to the given target status?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Confirmed | Self::Cancelled))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The buyer-facing purchase record. Created when the session moves from
/// BUYER_INFO to PAYMENT_PENDING; seat associations live in the store's
/// bookings table, written atomically with this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub event_id: EventId,
    pub session_id: SessionId,
    /// How many seats this order covers.
    pub quantity: u32,
    /// Sum of the booked seats' section prices, captured at order creation.
    /// Later price changes never move this value.
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub buyer: BuyerInfo,
    /// The transaction whose success confirmed this order, once resolved.
    pub transaction_id: Option<TransactionId>,
    /// Provider failure reason, retained for audit when cancelled.
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns `true` if this order can still change state.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Attempt to transition to CONFIRMED, recording the winning transaction.
    ///
    /// # Errors
    /// Returns `OrderAlreadyConfirmed` on a repeat, or `InvalidOrder` when
    /// the order was already cancelled.
    pub fn mark_confirmed(&mut self, transaction_id: TransactionId) -> crate::Result<()> {
        if self.status == OrderStatus::Confirmed {
            return Err(crate::OpengateError::OrderAlreadyConfirmed(self.id));
        }
        if !self.status.can_transition_to(OrderStatus::Confirmed) {
            return Err(crate::OpengateError::InvalidOrder {
                reason: format!(
                    "Cannot transition order {} from {} to CONFIRMED",
                    self.id, self.status
                ),
            });
        }
        self.status = OrderStatus::Confirmed;
        self.transaction_id = Some(transaction_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Attempt to transition to CANCELLED, retaining the reason if given.
    ///
    /// # Errors
    /// Returns error if the order is not pending.
    pub fn mark_cancelled(&mut self, reason: Option<String>) -> crate::Result<()> {
        if !self.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(crate::OpengateError::InvalidOrder {
                reason: format!(
                    "Cannot transition order {} from {} to CANCELLED",
                    self.id, self.status
                ),
            });
        }
        self.status = OrderStatus::Cancelled;
        self.failure_reason = reason;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy(event_id: EventId, session_id: SessionId, quantity: u32, total: Decimal) -> Self {
        Self {
            id: OrderId::new(),
            event_id,
            session_id,
            quantity,
            total_price: total,
            status: OrderStatus::Pending,
            buyer: BuyerInfo::dummy(),
            transaction_id: None,
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
