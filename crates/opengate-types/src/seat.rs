//! # Seat — the unit of inventory
//!
//! A seat is one grid cell inside a section. It is created once at section
//! provisioning and never deleted; only its status and hold owner change.
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────┐  acquire   ┌──────┐  confirm   ┌────────┐
//!   │ AVAILABLE ├───────────▶│ HELD ├───────────▶│ BOOKED │
//!   └───────────┘            └──┬───┘            └────────┘
//!         ▲                     │
//!         └─────────────────────┘
//!            release / expire
//! ```
//!
//! `BOOKED` is terminal from this core's viewpoint: a seat is booked iff it
//! is referenced by a confirmed order's bookings. All transitions go through
//! the store's conditional update, which serializes them per seat.

use serde::{Deserialize, Serialize};

use crate::{HoldId, SeatId, SectionId};

/// The availability state of a seat.
///
/// Transitions are driven by holds and confirmations:
/// - `Available → Held` (hold acquired)
/// - `Held → Available` (hold released or expired)
/// - `Held → Booked` (order confirmed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    /// No live hold, no booking. Any session may acquire it.
    Available,
    /// An unexpired hold claims this seat for one session.
    Held,
    /// Referenced by a confirmed order. **Irreversible** here; refunds are
    /// an outer-application concern.
    Booked,
}

impl SeatStatus {
    /// Can this seat transition to the given target status?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Available, Self::Held) | (Self::Held, Self::Available | Self::Booked)
        )
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::Held => write!(f, "HELD"),
            Self::Booked => write!(f, "BOOKED"),
        }
    }
}

/// One seat in a section's grid. Identity is (section, row, number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    /// Globally unique seat identifier.
    pub id: SeatId,
    /// The section this seat belongs to.
    pub section_id: SectionId,
    /// Row label within the section (`"A"`, `"B"`, ...).
    pub row: String,
    /// Seat number within the row, starting at 1.
    pub number: u32,
    /// Current availability state.
    pub status: SeatStatus,
    /// The hold currently claiming this seat, if any. Set iff status is HELD.
    pub hold_id: Option<HoldId>,
}

impl Seat {
    /// Buyer-facing label, e.g. `"A7"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.number)
    }

    /// Returns `true` if any session may acquire this seat right now.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    /// Attempt to transition to HELD under the given hold.
    ///
    /// # Errors
    /// Returns `SeatConflict` if the seat is not currently available.
    pub fn mark_held(&mut self, hold_id: HoldId) -> crate::Result<()> {
        if !self.status.can_transition_to(SeatStatus::Held) {
            return Err(crate::OpengateError::SeatConflict(self.id));
        }
        self.status = SeatStatus::Held;
        self.hold_id = Some(hold_id);
        Ok(())
    }

    /// Attempt to transition back to AVAILABLE, clearing the hold owner.
    ///
    /// # Errors
    /// Returns an internal inconsistency if the seat is not currently held.
    pub fn mark_available(&mut self) -> crate::Result<()> {
        if !self.status.can_transition_to(SeatStatus::Available) {
            return Err(crate::OpengateError::InternalInconsistency(format!(
                "Cannot release seat {} from {}",
                self.id, self.status
            )));
        }
        self.status = SeatStatus::Available;
        self.hold_id = None;
        Ok(())
    }

    /// Attempt to transition to BOOKED.
    ///
    /// # Errors
    /// Returns an internal inconsistency if the seat is not currently held.
    pub fn mark_booked(&mut self) -> crate::Result<()> {
        if !self.status.can_transition_to(SeatStatus::Booked) {
            return Err(crate::OpengateError::InternalInconsistency(format!(
                "Cannot book seat {} from {}",
                self.id, self.status
            )));
        }
        self.status = SeatStatus::Booked;
        Ok(())
    }
}

/// Dummy Seat for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Seat {
    /// Create a dummy available seat for unit tests.
    pub fn dummy(section_id: SectionId, row: &str, number: u32) -> Self {
        Self {
            id: SeatId::new(),
            section_id,
            row: row.to_string(),
            number,
            status: SeatStatus::Available,
            hold_id: None,
        }
    }
}
