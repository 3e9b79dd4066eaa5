//! Hold manager — all-or-nothing multi-seat acquisition, idempotent
//! release, and expiry sweeping.
//!
//! Every seat mutation here goes through the store's conditional updates,
//! so two sessions racing for one seat resolve to exactly one winner and
//! the buyer-driven release path can run concurrently with the background
//! sweep without a seat ever transitioning twice.
//!
//! Multi-seat acquisition walks the requested seats in sorted `SeatId`
//! order. Two sessions asking for overlapping sets therefore contend on
//! the same seat first, and the loser rolls back its prefix instead of
//! deadlocking on the remainder.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opengate_types::{
    EventId, Hold, HoldConfig, HoldId, HoldState, OpengateError, Result, SeatId, SeatStatus,
    SessionId,
};

use crate::store::SeatStore;

/// Grants and releases short-lived exclusive holds on seats.
pub struct HoldManager {
    store: Arc<dyn SeatStore>,
    config: HoldConfig,
}

impl HoldManager {
    #[must_use]
    pub fn new(store: Arc<dyn SeatStore>, config: HoldConfig) -> Self {
        Self { store, config }
    }

    /// The configured hold TTL and per-session cap.
    #[must_use]
    pub fn config(&self) -> &HoldConfig {
        &self.config
    }

    /// The session's holds that still claim their seats as of `now`.
    pub fn active_holds(&self, session_id: SessionId, now: DateTime<Utc>) -> Result<Vec<Hold>> {
        Ok(self
            .store
            .holds_for_session(session_id)?
            .into_iter()
            .filter(|hold| hold.is_active_at(now))
            .collect())
    }

    /// Acquire holds on every requested seat, or on none of them.
    ///
    /// 1. Requested seats are sorted and deduplicated (fixed global order)
    /// 2. The per-session cap is enforced before the store is touched
    /// 3. Each seat is claimed with a conditional AVAILABLE → HELD update
    /// 4. On the first conflict, every seat claimed so far is rolled back
    ///
    /// # Errors
    /// Returns `SeatLimitExceeded` when the request would push the session
    /// past its cap, `SeatConflict` naming the contested seat when any seat
    /// is held or booked, and `EmptySelection` for an empty request.
    pub fn acquire(
        &self,
        session_id: SessionId,
        event_id: EventId,
        seat_ids: &[SeatId],
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>> {
        // Step 1: fixed global acquisition order, duplicates collapse to one claim.
        let mut wanted = seat_ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Err(OpengateError::EmptySelection);
        }

        // Step 2: cap check before any store mutation.
        let held = self.active_holds(session_id, now)?.len();
        if held + wanted.len() > self.config.max_seats_per_session {
            return Err(OpengateError::SeatLimitExceeded {
                requested: wanted.len(),
                held,
                max: self.config.max_seats_per_session,
            });
        }

        // Step 3: claim each seat in order, minting the hold record only
        // after its conditional update lands.
        let expires_at = now + self.config.ttl_chrono();
        let mut acquired: Vec<Hold> = Vec::with_capacity(wanted.len());
        for seat_id in &wanted {
            let hold = Hold {
                id: HoldId::new(),
                seat_id: *seat_id,
                session_id,
                event_id,
                state: HoldState::Active,
                created_at: now,
                expires_at,
            };
            let claimed = self
                .store
                .compare_and_set_seat(*seat_id, SeatStatus::Available, SeatStatus::Held, Some(hold.id))
                .and_then(|()| self.store.insert_hold(hold.clone()));
            match claimed {
                Ok(()) => acquired.push(hold),
                Err(err) => {
                    // Step 4: nothing dangles — the prefix goes back.
                    self.rollback(&acquired);
                    tracing::debug!(
                        session = %session_id,
                        seat = %seat_id,
                        error = %err,
                        "Multi-seat acquire failed, prefix rolled back"
                    );
                    return Err(err);
                }
            }
        }

        tracing::info!(
            session = %session_id,
            seats = acquired.len(),
            expires_at = %expires_at,
            "Holds acquired"
        );
        Ok(acquired)
    }

    fn rollback(&self, acquired: &[Hold]) {
        for hold in acquired {
            if let Err(err) = self.store.release_held_seat(hold.seat_id, hold.id) {
                tracing::error!(
                    seat = %hold.seat_id,
                    hold = %hold.id,
                    error = %err,
                    "Rollback release failed"
                );
            }
        }
    }

    /// Release the session's claims on the given seats. Idempotent: seats
    /// the session does not hold, or already released, are skipped without
    /// error. Returns how many seats actually transitioned.
    pub fn release(&self, session_id: SessionId, seat_ids: &[SeatId]) -> Result<usize> {
        let holds = self.store.holds_for_session(session_id)?;
        let mut released = 0;
        for seat_id in seat_ids {
            let Some(hold) = holds
                .iter()
                .find(|h| h.seat_id == *seat_id && h.state == HoldState::Active)
            else {
                continue;
            };
            if self.store.release_held_seat(*seat_id, hold.id)? {
                released += 1;
                tracing::debug!(session = %session_id, seat = %seat_id, "Hold released");
            }
        }
        Ok(released)
    }

    /// Release every seat the session still claims. Returns the count.
    pub fn release_session(&self, session_id: SessionId) -> Result<usize> {
        let holds = self.store.holds_for_session(session_id)?;
        let mut released = 0;
        for hold in holds.iter().filter(|h| h.state == HoldState::Active) {
            if self.store.release_held_seat(hold.seat_id, hold.id)? {
                released += 1;
            }
        }
        if released > 0 {
            tracing::info!(session = %session_id, seats = released, "Session holds released");
        }
        Ok(released)
    }

    /// Reclaim every seat whose hold has lapsed as of `now`. This is the
    /// backstop against abandoned checkouts; it runs from the background
    /// sweeper and is safe to race buyer-driven release and confirmation.
    /// Returns how many seats were reclaimed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = self.store.expired_holds(now)?;
        let mut swept = 0;
        for hold in expired {
            match self.store.release_held_seat(hold.seat_id, hold.id) {
                Ok(true) => {
                    swept += 1;
                    tracing::info!(
                        seat = %hold.seat_id,
                        session = %hold.session_id,
                        expired_at = %hold.expires_at,
                        "Expired hold swept"
                    );
                }
                // Released or converted by another path between the query
                // and the conditional update.
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(
                        seat = %hold.seat_id,
                        hold = %hold.id,
                        error = %err,
                        "Sweep release failed"
                    );
                }
            }
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::{provision_section, SeatStore};
    use opengate_types::{Event, Section};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn setup(rows: u32, seats_per_row: u32) -> (Arc<MemoryStore>, HoldManager, EventId, Vec<SeatId>) {
        let store = Arc::new(MemoryStore::new());
        let event = Event::dummy("Summer Gala");
        let event_id = event.id;
        store.insert_event(event).unwrap();
        let section = Section::dummy(event_id, "Gold", rows, seats_per_row, Decimal::new(5000, 2));
        let seat_ids = provision_section(store.as_ref(), &section).unwrap();
        let manager = HoldManager::new(store.clone(), HoldConfig::default());
        (store, manager, event_id, seat_ids)
    }

    #[test]
    fn acquire_claims_all_requested_seats() {
        let (store, manager, event_id, seats) = setup(1, 4);
        let session = SessionId::new();
        let holds = manager
            .acquire(session, event_id, &seats[..2], Utc::now())
            .unwrap();
        assert_eq!(holds.len(), 2);
        for hold in &holds {
            let seat = store.seat(hold.seat_id).unwrap();
            assert_eq!(seat.status, SeatStatus::Held);
            assert_eq!(seat.hold_id, Some(hold.id));
        }
    }

    #[test]
    fn conflicting_acquire_rolls_back_prefix() {
        let (store, manager, event_id, seats) = setup(1, 4);
        let now = Utc::now();

        // Another session already holds the second seat.
        let other = SessionId::new();
        manager
            .acquire(other, event_id, &seats[1..2], now)
            .unwrap();

        let session = SessionId::new();
        let err = manager
            .acquire(session, event_id, &seats[..2], now)
            .unwrap_err();
        assert!(matches!(err, OpengateError::SeatConflict(id) if id == seats[1]));

        // The first seat must not be left dangling as held.
        assert_eq!(store.seat(seats[0]).unwrap().status, SeatStatus::Available);
        assert!(manager.active_holds(session, now).unwrap().is_empty());
    }

    #[test]
    fn duplicate_seats_collapse_to_one_claim() {
        let (_, manager, event_id, seats) = setup(1, 4);
        let session = SessionId::new();
        let holds = manager
            .acquire(session, event_id, &[seats[0], seats[0], seats[0]], Utc::now())
            .unwrap();
        assert_eq!(holds.len(), 1);
    }

    #[test]
    fn empty_request_rejected() {
        let (_, manager, event_id, _) = setup(1, 4);
        assert!(matches!(
            manager
                .acquire(SessionId::new(), event_id, &[], Utc::now())
                .unwrap_err(),
            OpengateError::EmptySelection
        ));
    }

    #[test]
    fn cap_enforced_before_store_is_touched() {
        let (store, manager, event_id, seats) = setup(2, 4);
        let session = SessionId::new();
        let now = Utc::now();
        manager.acquire(session, event_id, &seats[..4], now).unwrap();

        let err = manager
            .acquire(session, event_id, &seats[4..5], now)
            .unwrap_err();
        assert!(matches!(
            err,
            OpengateError::SeatLimitExceeded {
                requested: 1,
                held: 4,
                max: 4,
            }
        ));

        // The first four holds stay intact, the fifth seat stays free.
        assert_eq!(manager.active_holds(session, now).unwrap().len(), 4);
        assert_eq!(store.seat(seats[4]).unwrap().status, SeatStatus::Available);
    }

    #[test]
    fn cap_counts_only_live_holds() {
        let (_, manager, event_id, seats) = setup(2, 4);
        let session = SessionId::new();
        let now = Utc::now();
        manager.acquire(session, event_id, &seats[..4], now).unwrap();
        manager.release(session, &seats[..2]).unwrap();

        // Two live holds remain, so two more fit under the cap of four.
        assert!(manager.acquire(session, event_id, &seats[4..6], now).is_ok());
    }

    #[test]
    fn release_is_idempotent() {
        let (store, manager, event_id, seats) = setup(1, 4);
        let session = SessionId::new();
        manager
            .acquire(session, event_id, &seats[..1], Utc::now())
            .unwrap();

        assert_eq!(manager.release(session, &seats[..1]).unwrap(), 1);
        assert_eq!(manager.release(session, &seats[..1]).unwrap(), 0);
        // Releasing a seat the session never held is a no-op too.
        assert_eq!(manager.release(session, &seats[1..2]).unwrap(), 0);
        assert_eq!(store.seat(seats[0]).unwrap().status, SeatStatus::Available);
    }

    #[test]
    fn release_ignores_other_sessions_claims() {
        let (store, manager, event_id, seats) = setup(1, 4);
        let owner = SessionId::new();
        manager
            .acquire(owner, event_id, &seats[..1], Utc::now())
            .unwrap();

        let stranger = SessionId::new();
        assert_eq!(manager.release(stranger, &seats[..1]).unwrap(), 0);
        assert_eq!(store.seat(seats[0]).unwrap().status, SeatStatus::Held);
    }

    #[test]
    fn sweep_reclaims_expired_holds() {
        let (store, _, event_id, seats) = setup(1, 4);
        let manager = HoldManager::new(
            store.clone(),
            HoldConfig {
                ttl: Duration::from_secs(1),
                ..HoldConfig::default()
            },
        );
        let session = SessionId::new();
        let acquired_at = Utc::now();
        manager
            .acquire(session, event_id, &seats[..2], acquired_at)
            .unwrap();

        // Before expiry, nothing to sweep.
        assert_eq!(manager.sweep_expired(acquired_at).unwrap(), 0);

        let later = acquired_at + chrono::Duration::seconds(2);
        assert_eq!(manager.sweep_expired(later).unwrap(), 2);
        assert_eq!(store.seat(seats[0]).unwrap().status, SeatStatus::Available);

        // Sweeping again finds nothing.
        assert_eq!(manager.sweep_expired(later).unwrap(), 0);

        // A different session can now take the reclaimed seats.
        let other = SessionId::new();
        assert!(manager.acquire(other, event_id, &seats[..2], later).is_ok());
    }

    #[test]
    fn concurrent_acquire_has_one_winner() {
        let (_, manager, event_id, seats) = setup(1, 4);
        let manager = Arc::new(manager);
        let contested = seats[0];

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(std::thread::spawn(move || {
                let session = SessionId::new();
                manager.acquire(session, event_id, &[contested], Utc::now())
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(OpengateError::SeatConflict(_))))
            .count();
        assert_eq!(wins, 1, "exactly one session must win the seat");
        assert_eq!(conflicts, 7, "every loser must see a conflict");
    }

    #[test]
    fn release_session_clears_everything() {
        let (store, manager, event_id, seats) = setup(1, 4);
        let session = SessionId::new();
        let now = Utc::now();
        manager.acquire(session, event_id, &seats[..3], now).unwrap();

        assert_eq!(manager.release_session(session).unwrap(), 3);
        assert!(manager.active_holds(session, now).unwrap().is_empty());
        for seat_id in &seats[..3] {
            assert_eq!(store.seat(*seat_id).unwrap().status, SeatStatus::Available);
        }
    }
}
