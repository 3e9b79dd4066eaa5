//! In-memory [`SeatStore`] used by tests and single-node runs.
//!
//! One mutex guards all tables, so every trait method is a single critical
//! section. That is what makes `compare_and_set_seat` and
//! `create_order_with_bookings` genuinely atomic here: no writer can observe
//! a half-applied update.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use opengate_types::{
    Event, EventId, Hold, HoldId, OpengateError, Order, OrderId, Result, Seat, SeatId, SeatStatus,
    Section, SectionId, SessionId, Transaction, TransactionId,
};
use rust_decimal::Decimal;

use crate::store::SeatStore;

#[derive(Default)]
struct Inner {
    events: HashMap<EventId, Event>,
    sections: HashMap<SectionId, Section>,
    seats: HashMap<SeatId, Seat>,
    holds: HashMap<HoldId, Hold>,
    orders: HashMap<OrderId, Order>,
    bookings: HashMap<OrderId, Vec<SeatId>>,
    transactions: HashMap<TransactionId, Transaction>,
}

/// In-process store. Cheap to create, safe to share behind an `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| OpengateError::InternalInconsistency("Store lock poisoned".to_string()))
    }
}

impl SeatStore for MemoryStore {
    fn insert_event(&self, event: Event) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if inner.events.contains_key(&event.id) {
            return Err(OpengateError::DuplicateRecord {
                reason: format!("event {}", event.id),
            });
        }
        inner.events.insert(event.id, event);
        Ok(())
    }

    fn event(&self, id: EventId) -> Result<Event> {
        let inner = self.lock_inner()?;
        inner
            .events
            .get(&id)
            .cloned()
            .ok_or(OpengateError::EventNotFound(id))
    }

    fn insert_section(&self, section: Section) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if !inner.events.contains_key(&section.event_id) {
            return Err(OpengateError::EventNotFound(section.event_id));
        }
        if inner.sections.contains_key(&section.id) {
            return Err(OpengateError::DuplicateRecord {
                reason: format!("section {}", section.id),
            });
        }
        inner.sections.insert(section.id, section);
        Ok(())
    }

    fn section(&self, id: SectionId) -> Result<Section> {
        let inner = self.lock_inner()?;
        inner
            .sections
            .get(&id)
            .cloned()
            .ok_or(OpengateError::SectionNotFound(id))
    }

    fn sections_for_event(&self, event_id: EventId) -> Result<Vec<Section>> {
        let inner = self.lock_inner()?;
        if !inner.events.contains_key(&event_id) {
            return Err(OpengateError::EventNotFound(event_id));
        }
        let mut sections: Vec<Section> = inner
            .sections
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        sections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sections)
    }

    fn update_section_price(&self, id: SectionId, price: Decimal) -> Result<()> {
        let mut inner = self.lock_inner()?;
        let section = inner
            .sections
            .get_mut(&id)
            .ok_or(OpengateError::SectionNotFound(id))?;
        section.price = price;
        Ok(())
    }

    fn insert_seat(&self, seat: Seat) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if !inner.sections.contains_key(&seat.section_id) {
            return Err(OpengateError::SectionNotFound(seat.section_id));
        }
        if inner.seats.contains_key(&seat.id) {
            return Err(OpengateError::DuplicateRecord {
                reason: format!("seat {}", seat.id),
            });
        }
        inner.seats.insert(seat.id, seat);
        Ok(())
    }

    fn seat(&self, id: SeatId) -> Result<Seat> {
        let inner = self.lock_inner()?;
        inner
            .seats
            .get(&id)
            .cloned()
            .ok_or(OpengateError::SeatNotFound(id))
    }

    fn seats_in_section(&self, section_id: SectionId) -> Result<Vec<Seat>> {
        let inner = self.lock_inner()?;
        if !inner.sections.contains_key(&section_id) {
            return Err(OpengateError::SectionNotFound(section_id));
        }
        let mut seats: Vec<Seat> = inner
            .seats
            .values()
            .filter(|s| s.section_id == section_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.row.cmp(&b.row).then(a.number.cmp(&b.number)));
        Ok(seats)
    }

    fn compare_and_set_seat(
        &self,
        seat_id: SeatId,
        expected: SeatStatus,
        new_status: SeatStatus,
        hold_id: Option<HoldId>,
    ) -> Result<()> {
        let mut inner = self.lock_inner()?;
        let seat = inner
            .seats
            .get_mut(&seat_id)
            .ok_or(OpengateError::SeatNotFound(seat_id))?;
        if seat.status != expected {
            return Err(OpengateError::SeatConflict(seat_id));
        }
        match new_status {
            SeatStatus::Held => {
                let owner = hold_id.ok_or_else(|| {
                    OpengateError::InternalInconsistency(format!(
                        "HELD update for seat {seat_id} carries no hold owner"
                    ))
                })?;
                seat.mark_held(owner)
            }
            SeatStatus::Available => seat.mark_available(),
            SeatStatus::Booked => seat.mark_booked(),
        }
    }

    fn release_held_seat(&self, seat_id: SeatId, hold_id: HoldId) -> Result<bool> {
        let mut inner = self.lock_inner()?;
        let seat = inner
            .seats
            .get(&seat_id)
            .ok_or(OpengateError::SeatNotFound(seat_id))?;

        // The claim must still be exactly this hold. Anything else (already
        // released, booked, or re-acquired under a newer hold) is a no-op.
        if seat.status != SeatStatus::Held || seat.hold_id != Some(hold_id) {
            return Ok(false);
        }
        let hold_active = inner
            .holds
            .get(&hold_id)
            .ok_or_else(|| {
                OpengateError::InternalInconsistency(format!(
                    "Seat {seat_id} points at missing hold {hold_id}"
                ))
            })?
            .state
            == opengate_types::HoldState::Active;
        if !hold_active {
            return Ok(false);
        }

        let seat = inner
            .seats
            .get_mut(&seat_id)
            .ok_or(OpengateError::SeatNotFound(seat_id))?;
        seat.mark_available()?;
        let hold = inner
            .holds
            .get_mut(&hold_id)
            .ok_or(OpengateError::HoldNotFound(hold_id))?;
        hold.mark_released()?;
        Ok(true)
    }

    fn book_held_seats(
        &self,
        session_id: SessionId,
        seat_ids: &[SeatId],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.lock_inner()?;

        // Pass 1: validate every claim while nothing has been touched.
        for seat_id in seat_ids {
            let seat = inner
                .seats
                .get(seat_id)
                .ok_or(OpengateError::SeatNotFound(*seat_id))?;
            if seat.status == SeatStatus::Booked {
                return Err(OpengateError::InternalInconsistency(format!(
                    "Seat {seat_id} is already booked"
                )));
            }
            let claim_live = seat.status == SeatStatus::Held
                && seat
                    .hold_id
                    .and_then(|hold_id| inner.holds.get(&hold_id))
                    .is_some_and(|hold| {
                        hold.session_id == session_id && hold.is_active_at(now)
                    });
            if !claim_live {
                return Err(OpengateError::HoldExpired(session_id));
            }
        }

        // Pass 2: apply. Every transition here was just validated.
        for seat_id in seat_ids {
            let hold_id = {
                let seat = inner
                    .seats
                    .get_mut(seat_id)
                    .ok_or(OpengateError::SeatNotFound(*seat_id))?;
                let hold_id = seat.hold_id.ok_or_else(|| {
                    OpengateError::InternalInconsistency(format!(
                        "Seat {seat_id} lost its hold owner mid-booking"
                    ))
                })?;
                seat.mark_booked()?;
                hold_id
            };
            let hold = inner
                .holds
                .get_mut(&hold_id)
                .ok_or(OpengateError::HoldNotFound(hold_id))?;
            hold.mark_converted()?;
        }
        Ok(())
    }

    fn insert_hold(&self, hold: Hold) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if inner.holds.contains_key(&hold.id) {
            return Err(OpengateError::DuplicateRecord {
                reason: format!("hold {}", hold.id),
            });
        }
        inner.holds.insert(hold.id, hold);
        Ok(())
    }

    fn hold(&self, id: HoldId) -> Result<Hold> {
        let inner = self.lock_inner()?;
        inner
            .holds
            .get(&id)
            .cloned()
            .ok_or(OpengateError::HoldNotFound(id))
    }

    fn update_hold(&self, hold: Hold) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if !inner.holds.contains_key(&hold.id) {
            return Err(OpengateError::HoldNotFound(hold.id));
        }
        inner.holds.insert(hold.id, hold);
        Ok(())
    }

    fn holds_for_session(&self, session_id: SessionId) -> Result<Vec<Hold>> {
        let inner = self.lock_inner()?;
        Ok(inner
            .holds
            .values()
            .filter(|h| h.session_id == session_id)
            .cloned()
            .collect())
    }

    fn expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<Hold>> {
        let inner = self.lock_inner()?;
        Ok(inner
            .holds
            .values()
            .filter(|h| h.state == opengate_types::HoldState::Active && h.is_expired_at(now))
            .cloned()
            .collect())
    }

    fn create_order_with_bookings(&self, order: Order, seat_ids: &[SeatId]) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if inner.orders.contains_key(&order.id) {
            return Err(OpengateError::DuplicateRecord {
                reason: format!("order {}", order.id),
            });
        }
        // Validate every seat before touching any table, so a failure leaves
        // nothing behind.
        for seat_id in seat_ids {
            if !inner.seats.contains_key(seat_id) {
                return Err(OpengateError::SeatNotFound(*seat_id));
            }
        }
        inner.bookings.insert(order.id, seat_ids.to_vec());
        inner.orders.insert(order.id, order);
        Ok(())
    }

    fn order(&self, id: OrderId) -> Result<Order> {
        let inner = self.lock_inner()?;
        inner
            .orders
            .get(&id)
            .cloned()
            .ok_or(OpengateError::OrderNotFound(id))
    }

    fn update_order(&self, order: Order) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if !inner.orders.contains_key(&order.id) {
            return Err(OpengateError::OrderNotFound(order.id));
        }
        inner.orders.insert(order.id, order);
        Ok(())
    }

    fn bookings_for_order(&self, order_id: OrderId) -> Result<Vec<SeatId>> {
        let inner = self.lock_inner()?;
        if !inner.orders.contains_key(&order_id) {
            return Err(OpengateError::OrderNotFound(order_id));
        }
        Ok(inner.bookings.get(&order_id).cloned().unwrap_or_default())
    }

    fn remove_bookings(&self, order_id: OrderId) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if !inner.orders.contains_key(&order_id) {
            return Err(OpengateError::OrderNotFound(order_id));
        }
        inner.bookings.remove(&order_id);
        Ok(())
    }

    fn insert_transaction(&self, transaction: Transaction) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if inner.transactions.contains_key(&transaction.id) {
            return Err(OpengateError::DuplicateTransaction(transaction.id));
        }
        inner
            .transactions
            .insert(transaction.id.clone(), transaction);
        Ok(())
    }

    fn transaction(&self, id: &TransactionId) -> Result<Transaction> {
        let inner = self.lock_inner()?;
        inner
            .transactions
            .get(id)
            .cloned()
            .ok_or_else(|| OpengateError::TransactionNotFound(id.clone()))
    }

    fn update_transaction(&self, transaction: Transaction) -> Result<()> {
        let mut inner = self.lock_inner()?;
        if !inner.transactions.contains_key(&transaction.id) {
            return Err(OpengateError::TransactionNotFound(transaction.id));
        }
        inner
            .transactions
            .insert(transaction.id.clone(), transaction);
        Ok(())
    }
}
