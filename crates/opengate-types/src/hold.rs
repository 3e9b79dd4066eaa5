//! # Hold — the seat reservation token
//!
//! A `Hold` is a **time-bounded exclusive claim** on one seat, minted when a
//! buyer selects the seat and consumed when the order confirms.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  confirmation  ┌───────────┐
//!   │ ACTIVE ├───────────────▶│ CONVERTED │
//!   └───┬────┘                └───────────┘
//!       │ release/expire
//!       ▼
//!   ┌──────────┐
//!   │ RELEASED │
//!   └──────────┘
//! ```
//!
//! ## Safety Properties
//!
//! - **Atomic minting**: a hold exists only if the seat's conditional
//!   AVAILABLE → HELD update succeeded
//! - **Single-use**: ACTIVE → CONVERTED is irreversible, prevents double-sell
//! - **Session-bound**: each hold belongs to exactly one checkout session
//! - **Time-bound**: expires after the hold TTL, reclaiming abandoned seats

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, HoldId, SeatId, SessionId};

/// The lifecycle state of a hold.
///
/// Transitions are **monotonic** (never go backwards):
/// - `Active → Converted` (order confirmation consumed the hold)
/// - `Active → Released` (buyer deselected, cancelled, or the TTL lapsed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldState {
    /// The seat is claimed. This hold can still become a booking.
    Active,
    /// Order confirmation consumed this hold. The seat is now booked.
    /// **Irreversible.** This is what prevents selling a seat twice.
    Converted,
    /// The claim was given up or timed out. The seat is available again.
    Released,
}

impl HoldState {
    /// Can this hold transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Converted | Self::Released)
        )
    }
}

impl std::fmt::Display for HoldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Converted => write!(f, "CONVERTED"),
            Self::Released => write!(f, "RELEASED"),
        }
    }
}

/// A hold: proof that one seat is reserved for one checkout session until
/// the expiry instant.
///
/// The inventory store owns the seat records; holds reference them. A seat
/// has at most one ACTIVE hold at any instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    /// Globally unique hold identifier.
    pub id: HoldId,
    /// The seat this hold claims.
    pub seat_id: SeatId,
    /// The checkout session that owns the claim.
    pub session_id: SessionId,
    /// The event the seat belongs to.
    pub event_id: EventId,
    /// Current lifecycle state.
    pub state: HoldState,
    /// When the hold was acquired.
    pub created_at: DateTime<Utc>,
    /// When the hold lapses (acquisition time + TTL).
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// Returns `true` if the hold has lapsed as of the given instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns `true` if the hold has lapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns `true` if the hold still claims its seat as of the given instant.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state == HoldState::Active && !self.is_expired_at(now)
    }

    /// Returns `true` if the hold still claims its seat.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Attempt to transition to CONVERTED state.
    ///
    /// # Errors
    /// Returns error if current state is not Active.
    pub fn mark_converted(&mut self) -> crate::Result<()> {
        if !self.state.can_transition_to(HoldState::Converted) {
            return Err(crate::OpengateError::InvalidHold {
                reason: format!(
                    "Cannot transition hold {} from {} to CONVERTED",
                    self.id, self.state
                ),
            });
        }
        self.state = HoldState::Converted;
        Ok(())
    }

    /// Attempt to transition to RELEASED state.
    ///
    /// # Errors
    /// Returns error if current state is not Active.
    pub fn mark_released(&mut self) -> crate::Result<()> {
        if !self.state.can_transition_to(HoldState::Released) {
            return Err(crate::OpengateError::InvalidHold {
                reason: format!(
                    "Cannot transition hold {} from {} to RELEASED",
                    self.id, self.state
                ),
            });
        }
        self.state = HoldState::Released;
        Ok(())
    }
}

/// Dummy Hold for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Hold {
    /// Create a dummy active hold for unit tests, expiring in five minutes.
    pub fn dummy(seat_id: SeatId, session_id: SessionId, event_id: EventId) -> Self {
        let now = Utc::now();
        Self {
            id: HoldId::new(),
            seat_id,
            session_id,
            event_id,
            state: HoldState::Active,
            created_at: now,
            expires_at: now + chrono::Duration::minutes(5),
        }
    }
}
