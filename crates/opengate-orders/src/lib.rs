//! # opengate-orders
//!
//! **Checkout Plane**: the order orchestrator driving the funnel from seat
//! selection through payment reconciliation to confirmation or rollback.
//!
//! ## Architecture
//!
//! 1. **CheckoutManager**: the session state machine — acquire holds,
//!    capture buyer info, lock in the total, start a payment, and reconcile
//!    the provider's verdict exactly once
//! 2. **ConfirmationGuard**: bounded idempotency cache closing the race
//!    between the polling path and the callback path for one transaction
//!
//! ## Reconciliation Flow
//!
//! ```text
//! ProviderResponse → TransactionVerifier → outcome
//!     success   → book held seats, order CONFIRMED   (at most once)
//!     cancelled → release holds, order CANCELLED
//!     failed    → release holds, order CANCELLED (reason kept for audit)
//!     late      → HoldExpired, order stays CANCELLED (never rebooked)
//! ```
//!
//! The persisted order status is authoritative: a duplicate success for a
//! confirmed order is a no-op, and a success arriving after the sweep
//! reclaimed the seats is answered with `HoldExpired`, never a silent
//! rebooking of possibly-reassigned seats.

pub mod checkout;
pub mod confirmation;

pub use checkout::CheckoutManager;
pub use confirmation::ConfirmationGuard;
