//! # opengate-types
//!
//! Shared types, errors, and configuration for the **OpenGate** reservation core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`EventId`], [`SectionId`], [`SeatId`], [`SessionId`], [`OrderId`], [`HoldId`], [`TransactionId`]
//! - **Venue model**: [`Event`], [`Section`]
//! - **Seat model**: [`Seat`], [`SeatStatus`]
//! - **Hold model**: [`Hold`], [`HoldState`]
//! - **Order model**: [`Order`], [`OrderStatus`], [`CheckoutStage`]
//! - **Buyer model**: [`BuyerInfo`]
//! - **Payment model**: [`Transaction`], [`PaymentMethod`], [`PaymentOutcome`], [`ProviderResponse`], [`PaymentInitiation`]
//! - **Configuration**: [`HoldConfig`], [`PaymentConfig`]
//! - **Errors**: [`OpengateError`] with `OG_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod buyer;
pub mod config;
pub mod constants;
pub mod error;
pub mod hold;
pub mod ids;
pub mod order;
pub mod payment;
pub mod seat;
pub mod venue;

// Re-export all primary types at crate root for ergonomic imports:
//   use opengate_types::{Seat, SeatStatus, Hold, Order, ...};

pub use buyer::*;
pub use config::*;
pub use error::*;
pub use hold::*;
pub use ids::*;
pub use order::*;
pub use payment::*;
pub use seat::*;
pub use venue::*;

// Constants are accessed via `opengate_types::constants::FOO`
// (not re-exported to avoid name collisions).
