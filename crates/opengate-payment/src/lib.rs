//! # opengate-payment
//!
//! **Payment Plane**: the pure provider boundary. Nothing here touches
//! seat or order state; this crate only builds redirect targets, mints
//! pending transactions, and verifies what the providers report back.
//!
//! ## Architecture
//!
//! 1. **token**: the keyed SHA-256 integrity digest bound into every
//!    wallet exchange
//! 2. **outcome**: the closed provider response-code table
//! 3. **adapter**: [`PaymentAdapter`] over the card and mobile-wallet flows
//! 4. **verifier**: [`TransactionVerifier`], rejecting forged or misdirected
//!    responses before any state can change
//!
//! ## Verification Flow
//!
//! ```text
//! ProviderResponse → id cross-check → token recompute+compare → code → Outcome
//! ```
//!
//! A response that fails the token check is a security failure
//! (`TokenMismatch`), never a payment failure: the orchestrator commits
//! nothing. Unknown response codes map to a failed outcome, never success.

pub mod adapter;
pub mod outcome;
pub mod token;
pub mod verifier;

pub use adapter::{adapter_for, CardAdapter, PaymentAdapter, WalletAdapter};
pub use outcome::map_response_code;
pub use token::{format_amount, generate_token};
pub use verifier::TransactionVerifier;
