//! The store boundary: a transactional record interface for seats, holds,
//! orders, and transactions.
//!
//! Two operations carry the whole concurrency story:
//!
//! - [`SeatStore::compare_and_set_seat`] — the only way a seat's status
//!   changes. Conditional on the expected prior status, so every racing
//!   writer except one observes a conflict.
//! - [`SeatStore::create_order_with_bookings`] — the order record and its
//!   seat associations appear together or not at all.
//!
//! Everything else is plain keyed reads and writes. Implementations must be
//! safe to share across request threads and the background sweeper.

use chrono::{DateTime, Utc};
use opengate_types::{
    constants, Event, EventId, Hold, HoldId, OpengateError, Order, OrderId, Result, Seat, SeatId,
    SeatStatus, Section, SectionId, SessionId, Transaction, TransactionId,
};
use rust_decimal::Decimal;

/// Transactional record store for the reservation core.
pub trait SeatStore: Send + Sync {
    // --- events ---

    /// Insert a catalog event mirror record.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if the event already exists.
    fn insert_event(&self, event: Event) -> Result<()>;

    /// Fetch an event by ID.
    ///
    /// # Errors
    /// Returns `EventNotFound` if absent.
    fn event(&self, id: EventId) -> Result<Event>;

    // --- sections ---

    /// Insert a section record. The referenced event must already exist.
    ///
    /// # Errors
    /// Returns `EventNotFound` or `DuplicateRecord`.
    fn insert_section(&self, section: Section) -> Result<()>;

    /// Fetch a section by ID.
    ///
    /// # Errors
    /// Returns `SectionNotFound` if absent.
    fn section(&self, id: SectionId) -> Result<Section>;

    /// All sections for an event, ordered by display name.
    ///
    /// # Errors
    /// Returns `EventNotFound` if the event is absent.
    fn sections_for_event(&self, event_id: EventId) -> Result<Vec<Section>>;

    /// Reprice a section. Existing orders keep their recorded totals.
    ///
    /// # Errors
    /// Returns `SectionNotFound` if absent.
    fn update_section_price(&self, id: SectionId, price: Decimal) -> Result<()>;

    // --- seats ---

    /// Insert a seat record. The referenced section must already exist.
    ///
    /// # Errors
    /// Returns `SectionNotFound` or `DuplicateRecord`.
    fn insert_seat(&self, seat: Seat) -> Result<()>;

    /// Fetch a seat by ID.
    ///
    /// # Errors
    /// Returns `SeatNotFound` if absent.
    fn seat(&self, id: SeatId) -> Result<Seat>;

    /// All seats in a section, ordered by row then number.
    ///
    /// # Errors
    /// Returns `SectionNotFound` if the section is absent.
    fn seats_in_section(&self, section_id: SectionId) -> Result<Vec<Seat>>;

    /// Atomically set the seat's status to `new_status` iff its current
    /// status equals `expected`. When moving to HELD, `hold_id` records the
    /// claiming hold; any other target clears the seat's hold owner.
    ///
    /// # Errors
    /// Returns `SeatConflict` when the current status differs from
    /// `expected`, and an internal inconsistency for a transition the seat
    /// machine forbids.
    fn compare_and_set_seat(
        &self,
        seat_id: SeatId,
        expected: SeatStatus,
        new_status: SeatStatus,
        hold_id: Option<HoldId>,
    ) -> Result<()>;

    /// Atomically release a seat iff it is currently HELD by exactly the
    /// given ACTIVE hold: the seat returns to AVAILABLE and the hold is
    /// marked RELEASED in the same step. Returns `false` without changing
    /// anything when the claim no longer matches (already released, booked,
    /// or re-acquired under a newer hold), which is what makes buyer-driven
    /// release and the expiry sweep safe to race each other.
    ///
    /// # Errors
    /// Returns `SeatNotFound` for an unknown seat and an internal
    /// inconsistency when the seat points at a hold record that is missing.
    fn release_held_seat(&self, seat_id: SeatId, hold_id: HoldId) -> Result<bool>;

    /// Atomically convert a session's live claims into bookings: verify that
    /// every listed seat is HELD by an ACTIVE hold owned by `session_id` and
    /// unexpired as of `now`, then flip all seats to BOOKED and all holds to
    /// CONVERTED. Nothing changes on failure.
    ///
    /// # Errors
    /// Returns `HoldExpired` when any claim has lapsed or belongs to another
    /// session, `SeatNotFound` for an unknown seat, and an internal
    /// inconsistency when a listed seat is already booked.
    fn book_held_seats(
        &self,
        session_id: SessionId,
        seat_ids: &[SeatId],
        now: DateTime<Utc>,
    ) -> Result<()>;

    // --- holds ---

    /// Insert a hold record.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if the hold already exists.
    fn insert_hold(&self, hold: Hold) -> Result<()>;

    /// Fetch a hold by ID.
    ///
    /// # Errors
    /// Returns `HoldNotFound` if absent.
    fn hold(&self, id: HoldId) -> Result<Hold>;

    /// Replace a hold record.
    ///
    /// # Errors
    /// Returns `HoldNotFound` if absent.
    fn update_hold(&self, hold: Hold) -> Result<()>;

    /// Every hold ever taken by this session, any state. Callers apply
    /// their own liveness filtering against a consistent clock reading.
    fn holds_for_session(&self, session_id: SessionId) -> Result<Vec<Hold>>;

    /// Holds still marked ACTIVE whose expiry has passed as of `now`.
    fn expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<Hold>>;

    // --- orders ---

    /// Atomically insert the order record and one booking row per seat.
    /// Either everything lands or nothing does.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if the order exists, `SeatNotFound` if any
    /// seat is absent.
    fn create_order_with_bookings(&self, order: Order, seat_ids: &[SeatId]) -> Result<()>;

    /// Fetch an order by ID.
    ///
    /// # Errors
    /// Returns `OrderNotFound` if absent.
    fn order(&self, id: OrderId) -> Result<Order>;

    /// Replace an order record.
    ///
    /// # Errors
    /// Returns `OrderNotFound` if absent.
    fn update_order(&self, order: Order) -> Result<()>;

    /// Seat IDs booked under an order, in booking order.
    ///
    /// # Errors
    /// Returns `OrderNotFound` if the order is absent.
    fn bookings_for_order(&self, order_id: OrderId) -> Result<Vec<SeatId>>;

    /// Delete an order's booking rows (cancellation path). The order record
    /// itself stays, cancelled, for audit.
    ///
    /// # Errors
    /// Returns `OrderNotFound` if the order is absent.
    fn remove_bookings(&self, order_id: OrderId) -> Result<()>;

    // --- transactions ---

    /// Insert a payment transaction record.
    ///
    /// # Errors
    /// Returns `DuplicateTransaction` if the ID is already present.
    fn insert_transaction(&self, transaction: Transaction) -> Result<()>;

    /// Fetch a transaction by provider-facing ID.
    ///
    /// # Errors
    /// Returns `TransactionNotFound` if absent.
    fn transaction(&self, id: &TransactionId) -> Result<Transaction>;

    /// Replace a transaction record.
    ///
    /// # Errors
    /// Returns `TransactionNotFound` if absent.
    fn update_transaction(&self, transaction: Transaction) -> Result<()>;
}

/// Provision a section's seat grid: rows labeled `A`, `B`, ... and seats
/// numbered from 1, every seat starting AVAILABLE. Returns the created seat
/// IDs in grid order.
///
/// # Errors
/// Returns `InvalidSection` for a degenerate or oversized layout, plus any
/// store error from the inserts.
pub fn provision_section(store: &dyn SeatStore, section: &Section) -> Result<Vec<SeatId>> {
    if section.rows == 0 || section.seats_per_row == 0 {
        return Err(OpengateError::InvalidSection {
            reason: format!(
                "Section {} has a degenerate {}x{} layout",
                section.name, section.rows, section.seats_per_row
            ),
        });
    }
    if section.rows > constants::MAX_ROWS_PER_SECTION {
        return Err(OpengateError::InvalidSection {
            reason: format!(
                "Section {} has {} rows, max is {}",
                section.name,
                section.rows,
                constants::MAX_ROWS_PER_SECTION
            ),
        });
    }

    store.insert_section(section.clone())?;

    let mut seat_ids = Vec::new();
    for row_index in 0..section.rows {
        // Row index is bounded by MAX_ROWS_PER_SECTION, so this stays in A..Z.
        #[allow(clippy::cast_possible_truncation)]
        let row = char::from(b'A' + row_index as u8).to_string();
        for number in 1..=section.seats_per_row {
            let seat = Seat {
                id: SeatId::new(),
                section_id: section.id,
                row: row.clone(),
                number,
                status: SeatStatus::Available,
                hold_id: None,
            };
            seat_ids.push(seat.id);
            store.insert_seat(seat)?;
        }
    }

    tracing::info!(
        section = %section.id,
        name = %section.name,
        seats = seat_ids.len(),
        "Section provisioned"
    );
    Ok(seat_ids)
}
