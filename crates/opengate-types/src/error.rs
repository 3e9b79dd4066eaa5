//! Error types for the OpenGate reservation core.
//!
//! All errors use the `OG_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Inventory errors
//! - 2xx: Hold errors
//! - 3xx: Checkout errors
//! - 4xx: Buyer validation errors
//! - 5xx: Payment errors
//! - 6xx: Integrity errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{
    CheckoutStage, EventId, HoldId, OrderId, SeatId, SectionId, SessionId, TransactionId,
};

/// Central error enum for all OpenGate operations.
#[derive(Debug, Error)]
pub enum OpengateError {
    // =================================================================
    // Inventory Errors (1xx)
    // =================================================================
    /// The requested seat was not found in the store.
    #[error("OG_ERR_100: Seat not found: {0}")]
    SeatNotFound(SeatId),

    /// The requested section was not found in the store.
    #[error("OG_ERR_101: Section not found: {0}")]
    SectionNotFound(SectionId),

    /// The requested event was not found in the catalog mirror.
    #[error("OG_ERR_102: Event not found: {0}")]
    EventNotFound(EventId),

    /// A record with this identity already exists.
    #[error("OG_ERR_103: Duplicate record: {reason}")]
    DuplicateRecord { reason: String },

    /// The section layout is structurally invalid (zero rows, too many rows, etc.).
    #[error("OG_ERR_104: Invalid section: {reason}")]
    InvalidSection { reason: String },

    // =================================================================
    // Hold Errors (2xx)
    // =================================================================
    /// The seat is already held or booked by someone else.
    #[error("OG_ERR_200: Seat unavailable: {0}")]
    SeatConflict(SeatId),

    /// The session asked for more seats than the per-session cap allows.
    #[error("OG_ERR_201: Seat limit exceeded: requested {requested}, holding {held}, max {max}")]
    SeatLimitExceeded {
        requested: usize,
        held: usize,
        max: usize,
    },

    /// The session's holds lapsed before the operation could complete.
    #[error("OG_ERR_202: Hold expired for session {0}")]
    HoldExpired(SessionId),

    /// The requested hold was not found in the store.
    #[error("OG_ERR_203: Hold not found: {0}")]
    HoldNotFound(HoldId),

    /// The hold cannot make the requested state transition.
    #[error("OG_ERR_204: Invalid hold: {reason}")]
    InvalidHold { reason: String },

    // =================================================================
    // Checkout Errors (3xx)
    // =================================================================
    /// The requested order was not found in the store.
    #[error("OG_ERR_300: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An operation was attempted in the wrong checkout stage.
    #[error("OG_ERR_301: Wrong checkout stage: expected {expected}, got {actual}")]
    WrongStage {
        expected: CheckoutStage,
        actual: CheckoutStage,
    },

    /// The order is already confirmed and cannot change again.
    #[error("OG_ERR_302: Order already confirmed: {0}")]
    OrderAlreadyConfirmed(OrderId),

    /// Checkout cannot proceed without at least one held seat.
    #[error("OG_ERR_303: No seats selected")]
    EmptySelection,

    /// The checkout session was not found.
    #[error("OG_ERR_304: Session not found: {0}")]
    SessionNotFound(SessionId),

    /// The order failed validation (missing fields, bad values, etc.).
    #[error("OG_ERR_305: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    // =================================================================
    // Buyer Validation Errors (4xx)
    // =================================================================
    /// A mandatory buyer contact field is missing or blank.
    #[error("OG_ERR_400: Missing buyer field: {field}")]
    MissingBuyerField { field: String },

    /// Buyer contact info is present but malformed.
    #[error("OG_ERR_401: Invalid buyer info: {reason}")]
    InvalidBuyerInfo { reason: String },

    // =================================================================
    // Payment Errors (5xx)
    // =================================================================
    /// The referenced transaction was not found.
    #[error("OG_ERR_500: Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// A transaction with this ID already exists.
    #[error("OG_ERR_501: Duplicate transaction: {0}")]
    DuplicateTransaction(TransactionId),

    /// The transaction already reached a terminal outcome.
    #[error("OG_ERR_502: Transaction already resolved: {0}")]
    TransactionAlreadyResolved(TransactionId),

    /// This transaction was already applied to a confirmation (idempotency guard).
    #[error("OG_ERR_503: Confirmation already applied for transaction: {0}")]
    DuplicateConfirmation(TransactionId),

    /// Transport to the payment provider failed; safe to retry within the hold TTL.
    #[error("OG_ERR_504: Payment provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    // =================================================================
    // Integrity Errors (6xx)
    // =================================================================
    /// The provider response token did not match the recomputed token.
    #[error("OG_ERR_600: Token mismatch for transaction: {0}")]
    TokenMismatch(TransactionId),

    /// The provider response names a different transaction than expected.
    #[error("OG_ERR_601: Transaction mismatch: expected {expected}, got {actual}")]
    TransactionMismatch {
        expected: TransactionId,
        actual: TransactionId,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Runtime invariant violation — fatal to the request, never downgraded.
    #[error("OG_ERR_900: Internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// Serialization / deserialization error.
    #[error("OG_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("OG_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("OG_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpengateError>;

// Conversion from std::io::Error
impl From<std::io::Error> for OpengateError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for OpengateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
