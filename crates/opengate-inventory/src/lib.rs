//! # opengate-inventory
//!
//! **Inventory Plane**: the seat store boundary, hold acquisition and
//! release, and background expiry sweeping.
//!
//! ## Architecture
//!
//! The Inventory Plane sits between the checkout orchestrator and the
//! record store:
//! 1. **SeatStore**: trait over the ACID store — conditional seat updates,
//!    atomic order+bookings writes
//! 2. **MemoryStore**: in-process store used by tests and single-node runs
//! 3. **HoldManager**: all-or-nothing multi-seat acquisition with caps and TTLs
//! 4. **HoldSweeper**: periodic task reclaiming seats from lapsed holds
//!
//! ## Hold Flow
//!
//! ```text
//! Checkout → HoldManager.acquire() → SeatStore.compare_and_set_seat()
//!          → Hold records (ACTIVE) → converted on confirm | swept on expiry
//! ```
//!
//! Every seat mutation goes through the store's conditional update, so two
//! sessions racing for one seat resolve to exactly one winner.

pub mod holds;
pub mod memory;
pub mod store;
pub mod sweeper;

pub use holds::HoldManager;
pub use memory::MemoryStore;
pub use store::{provision_section, SeatStore};
pub use sweeper::HoldSweeper;
