//! Checkout orchestrator — drives one buyer's session through the funnel
//! and reconciles provider verdicts into reservation state exactly once.
//!
//! Session state here is in-memory and advisory; the persisted order
//! status is authoritative at confirmation time. A payment callback
//! arriving after a restart still reconciles correctly through the
//! transaction → order path, and the session stage update is then
//! best-effort.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use opengate_types::{
    constants, BuyerInfo, CheckoutStage, EventId, Hold, OpengateError, Order, OrderId,
    OrderStatus, PaymentConfig, PaymentInitiation, PaymentMethod, PaymentOutcome,
    ProviderResponse, Result, SeatId, SessionId, Transaction,
};
use opengate_inventory::{HoldManager, SeatStore};
use opengate_payment::{adapter_for, TransactionVerifier};

/// One buyer's position in the funnel, keyed by session.
struct CheckoutSession {
    event_id: EventId,
    stage: CheckoutStage,
    order_id: Option<OrderId>,
}

/// The order orchestrator: composes the hold manager and the payment
/// adapters, and owns the single confirmation path both the polling and
/// the callback delivery converge on.
pub struct CheckoutManager {
    store: Arc<dyn SeatStore>,
    holds: Arc<HoldManager>,
    payment: PaymentConfig,
    verifier: TransactionVerifier,
    sessions: Mutex<HashMap<SessionId, CheckoutSession>>,
    guard: Mutex<crate::ConfirmationGuard>,
}

impl CheckoutManager {
    #[must_use]
    pub fn new(store: Arc<dyn SeatStore>, holds: Arc<HoldManager>, payment: PaymentConfig) -> Self {
        let verifier = TransactionVerifier::new(payment.merchant_secret.clone());
        Self {
            store,
            holds,
            payment,
            verifier,
            sessions: Mutex::new(HashMap::new()),
            guard: Mutex::new(crate::ConfirmationGuard::new(
                constants::CONFIRMATION_CACHE_SIZE,
            )),
        }
    }

    fn lock_sessions(&self) -> Result<MutexGuard<'_, HashMap<SessionId, CheckoutSession>>> {
        self.sessions
            .lock()
            .map_err(|_| OpengateError::InternalInconsistency("Session lock poisoned".to_string()))
    }

    fn lock_guard(&self) -> Result<MutexGuard<'_, crate::ConfirmationGuard>> {
        self.guard.lock().map_err(|_| {
            OpengateError::InternalInconsistency("Confirmation guard lock poisoned".to_string())
        })
    }

    /// Open a checkout session against an event. The event must exist in
    /// the catalog mirror.
    pub fn begin_session(&self, event_id: EventId) -> Result<SessionId> {
        self.store.event(event_id)?;
        let session_id = SessionId::new();
        self.lock_sessions()?.insert(
            session_id,
            CheckoutSession {
                event_id,
                stage: CheckoutStage::SeatSelection,
                order_id: None,
            },
        );
        tracing::debug!(session = %session_id, event = %event_id, "Checkout session opened");
        Ok(session_id)
    }

    /// The session's current stage.
    pub fn stage(&self, session_id: SessionId) -> Result<CheckoutStage> {
        let sessions = self.lock_sessions()?;
        sessions
            .get(&session_id)
            .map(|s| s.stage)
            .ok_or(OpengateError::SessionNotFound(session_id))
    }

    /// The order the session created, once it reached payment.
    pub fn order_id(&self, session_id: SessionId) -> Result<Option<OrderId>> {
        let sessions = self.lock_sessions()?;
        sessions
            .get(&session_id)
            .map(|s| s.order_id)
            .ok_or(OpengateError::SessionNotFound(session_id))
    }

    fn require_stage(&self, session_id: SessionId, expected: CheckoutStage) -> Result<EventId> {
        let sessions = self.lock_sessions()?;
        let session = sessions
            .get(&session_id)
            .ok_or(OpengateError::SessionNotFound(session_id))?;
        if session.stage != expected {
            return Err(OpengateError::WrongStage {
                expected,
                actual: session.stage,
            });
        }
        Ok(session.event_id)
    }

    /// Advance the session stage, validating the move.
    fn advance_stage(&self, session_id: SessionId, target: CheckoutStage) -> Result<()> {
        let mut sessions = self.lock_sessions()?;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(OpengateError::SessionNotFound(session_id))?;
        if !session.stage.can_transition_to(target) {
            return Err(OpengateError::WrongStage {
                expected: target,
                actual: session.stage,
            });
        }
        session.stage = target;
        Ok(())
    }

    /// Move the session to a terminal stage from the reconciliation path.
    /// Best-effort: the session may be gone after a restart, and the
    /// persisted order already carries the authoritative state.
    fn settle_stage(&self, session_id: SessionId, target: CheckoutStage) {
        if let Ok(mut sessions) = self.sessions.lock() {
            if let Some(session) = sessions.get_mut(&session_id) {
                if session.stage.can_transition_to(target) {
                    session.stage = target;
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Seat selection
    // -----------------------------------------------------------------

    /// Acquire holds on the requested seats, all or nothing. A conflict or
    /// a cap violation leaves the stage unchanged and names the problem so
    /// the caller can refresh availability.
    pub fn select_seats(&self, session_id: SessionId, seat_ids: &[SeatId]) -> Result<Vec<Hold>> {
        let event_id = self.require_stage(session_id, CheckoutStage::SeatSelection)?;
        self.holds.acquire(session_id, event_id, seat_ids, Utc::now())
    }

    /// Give back seats during selection. Idempotent.
    pub fn deselect_seats(&self, session_id: SessionId, seat_ids: &[SeatId]) -> Result<usize> {
        self.require_stage(session_id, CheckoutStage::SeatSelection)?;
        self.holds.release(session_id, seat_ids)
    }

    /// Move on to buyer info. Requires at least one live hold.
    pub fn proceed_to_buyer_info(&self, session_id: SessionId) -> Result<()> {
        self.require_stage(session_id, CheckoutStage::SeatSelection)?;
        if self.holds.active_holds(session_id, Utc::now())?.is_empty() {
            return Err(OpengateError::EmptySelection);
        }
        self.advance_stage(session_id, CheckoutStage::BuyerInfo)
    }

    // -----------------------------------------------------------------
    // Buyer info and order creation
    // -----------------------------------------------------------------

    /// Validate the buyer's contact details and create the pending order
    /// with its bookings. The total is the sum of the held seats' section
    /// prices at this instant; later repricing never moves it.
    pub fn submit_buyer_info(&self, session_id: SessionId, buyer: BuyerInfo) -> Result<OrderId> {
        let event_id = self.require_stage(session_id, CheckoutStage::BuyerInfo)?;
        buyer.validate()?;

        let now = Utc::now();
        let active = self.holds.active_holds(session_id, now)?;
        if active.is_empty() {
            // Every hold lapsed while the form sat open; selection restarts.
            return Err(OpengateError::HoldExpired(session_id));
        }

        let mut seat_ids: Vec<SeatId> = active.iter().map(|h| h.seat_id).collect();
        seat_ids.sort_unstable();

        // Price lock-in: capture the section prices now.
        let mut total = rust_decimal::Decimal::ZERO;
        for seat_id in &seat_ids {
            let seat = self.store.seat(*seat_id)?;
            let section = self.store.section(seat.section_id)?;
            total += section.price;
        }

        let quantity = u32::try_from(seat_ids.len()).map_err(|_| {
            OpengateError::InternalInconsistency("Seat count overflows order quantity".to_string())
        })?;
        let order = Order {
            id: OrderId::new(),
            event_id,
            session_id,
            quantity,
            total_price: total,
            status: OrderStatus::Pending,
            buyer,
            transaction_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        let order_id = order.id;
        self.store.create_order_with_bookings(order, &seat_ids)?;

        {
            let mut sessions = self.lock_sessions()?;
            let session = sessions
                .get_mut(&session_id)
                .ok_or(OpengateError::SessionNotFound(session_id))?;
            session.order_id = Some(order_id);
            session.stage = CheckoutStage::PaymentPending;
        }

        tracing::info!(
            session = %session_id,
            order = %order_id,
            seats = quantity,
            total = %total,
            "Order created, total locked in"
        );
        Ok(order_id)
    }

    // -----------------------------------------------------------------
    // Payment
    // -----------------------------------------------------------------

    /// Start a payment attempt for the session's order. Mints a PENDING
    /// transaction and returns where to send the buyer's browser; no order
    /// or seat state changes until reconciliation.
    pub fn begin_payment(
        &self,
        session_id: SessionId,
        method: PaymentMethod,
    ) -> Result<PaymentInitiation> {
        self.require_stage(session_id, CheckoutStage::PaymentPending)?;
        let order_id = self
            .order_id(session_id)?
            .ok_or(OpengateError::InvalidOrder {
                reason: format!("Session {session_id} reached payment without an order"),
            })?;
        let order = self.store.order(order_id)?;
        if !order.is_pending() {
            return Err(OpengateError::InvalidOrder {
                reason: format!("Order {order_id} is {}, not PENDING", order.status),
            });
        }

        let event = self.store.event(order.event_id)?;
        let item_details = format!("{} x {}", order.quantity, event.title);

        let adapter = adapter_for(method, self.payment.clone());
        let initiation = adapter.initiate(order_id, order.total_price, &item_details)?;
        self.store.insert_transaction(initiation.transaction.clone())?;
        Ok(initiation)
    }

    /// Buyer-initiated abandonment. Releases every hold, cancels a pending
    /// order, and removes its bookings. Idempotent: repeating it, or
    /// cancelling a session whose order already settled, changes nothing.
    pub fn cancel(&self, session_id: SessionId) -> Result<()> {
        let order_id = {
            let sessions = self.lock_sessions()?;
            let session = sessions
                .get(&session_id)
                .ok_or(OpengateError::SessionNotFound(session_id))?;
            session.order_id
        };

        self.holds.release_session(session_id)?;

        if let Some(order_id) = order_id {
            let mut order = self.store.order(order_id)?;
            if order.is_pending() {
                order.mark_cancelled(Some("cancelled by buyer".to_string()))?;
                self.store.update_order(order)?;
                self.store.remove_bookings(order_id)?;
            }
        }

        self.settle_stage(session_id, CheckoutStage::Cancelled);
        tracing::info!(session = %session_id, "Checkout cancelled by buyer");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------

    /// Reconcile a provider response into reservation state. This is the
    /// single entry point for both the polling path and the callback path;
    /// delivering the same verdict twice converges on the same state.
    ///
    /// # Errors
    /// `TokenMismatch` and `TransactionMismatch` reject the response with
    /// nothing committed. A success arriving after the sweep reclaimed the
    /// seats is answered with `HoldExpired` and the order stays cancelled.
    pub fn confirm_payment(&self, response: &ProviderResponse) -> Result<PaymentOutcome> {
        let transaction = self.store.transaction(&response.transaction_id)?;
        let order = self.store.order(transaction.order_id)?;

        // Verify before anything can change.
        let outcome = self.verifier.verify(&transaction, response)?;

        match outcome {
            PaymentOutcome::Success => self.apply_success(transaction, order, response),
            PaymentOutcome::Cancelled => {
                self.apply_rollback(transaction, order, response, None, CheckoutStage::Cancelled)?;
                Ok(PaymentOutcome::Cancelled)
            }
            PaymentOutcome::Failed { reason } => {
                self.apply_rollback(
                    transaction,
                    order,
                    response,
                    Some(reason.clone()),
                    CheckoutStage::Failed,
                )?;
                Ok(PaymentOutcome::Failed { reason })
            }
            PaymentOutcome::Pending => Ok(PaymentOutcome::Pending),
        }
    }

    /// The one place seats flip HELD → BOOKED and the order confirms.
    fn apply_success(
        &self,
        mut transaction: Transaction,
        mut order: Order,
        response: &ProviderResponse,
    ) -> Result<PaymentOutcome> {
        // Duplicate delivery for an already-confirmed order is a no-op.
        if order.status == OrderStatus::Confirmed {
            if order.transaction_id.as_ref() == Some(&transaction.id) {
                tracing::debug!(
                    order = %order.id,
                    transaction = %transaction.id,
                    "Duplicate success delivery ignored"
                );
                return Ok(PaymentOutcome::Success);
            }
            return Err(OpengateError::InternalInconsistency(format!(
                "Second success for confirmed order {} via different transaction {}",
                order.id, transaction.id
            )));
        }

        // Late success: the sweep already reclaimed the seats and the order
        // is cancelled. Never rebook; the seats may belong to someone else.
        if order.status == OrderStatus::Cancelled {
            tracing::warn!(
                order = %order.id,
                transaction = %transaction.id,
                "Success arrived after holds lapsed; order stays cancelled"
            );
            return Err(OpengateError::HoldExpired(order.session_id));
        }

        // Close the polling/callback race before touching seats.
        {
            let mut guard = self.lock_guard()?;
            if let Err(err) = guard.mark_confirmed(transaction.id.clone()) {
                tracing::debug!(
                    transaction = %transaction.id,
                    "Concurrent confirmation already in flight"
                );
                return Err(err);
            }
        }

        let seat_ids = self.store.bookings_for_order(order.id)?;
        let now = Utc::now();
        if let Err(err) = self.store.book_held_seats(order.session_id, &seat_ids, now) {
            // The payment did succeed; keep that on record, but the order
            // is left cancelled rather than guessed-confirmed.
            self.resolve_transaction(&mut transaction, PaymentOutcome::Success, response)?;
            order.mark_cancelled(Some("holds expired before confirmation".to_string()))?;
            self.store.update_order(order.clone())?;
            self.store.remove_bookings(order.id)?;
            self.holds.release_session(order.session_id)?;
            self.settle_stage(order.session_id, CheckoutStage::Cancelled);
            tracing::warn!(
                order = %order.id,
                transaction = %transaction.id,
                error = %err,
                "Confirmation lost its seats; order cancelled"
            );
            return Err(err);
        }

        self.resolve_transaction(&mut transaction, PaymentOutcome::Success, response)?;
        order.mark_confirmed(transaction.id.clone())?;
        self.store.update_order(order.clone())?;
        self.settle_stage(order.session_id, CheckoutStage::Confirmed);

        tracing::info!(
            order = %order.id,
            transaction = %transaction.id,
            seats = seat_ids.len(),
            total = %order.total_price,
            "Order confirmed"
        );
        Ok(PaymentOutcome::Success)
    }

    /// Shared rollback for cancelled and failed verdicts: resolve the
    /// transaction, release the holds, drop the bookings, cancel the order
    /// with the reason retained for audit.
    fn apply_rollback(
        &self,
        mut transaction: Transaction,
        mut order: Order,
        response: &ProviderResponse,
        reason: Option<String>,
        terminal: CheckoutStage,
    ) -> Result<()> {
        if order.status == OrderStatus::Cancelled {
            // Duplicate rollback delivery; everything already happened.
            return Ok(());
        }
        if order.status == OrderStatus::Confirmed {
            return Err(OpengateError::InternalInconsistency(format!(
                "Rollback verdict for confirmed order {} via transaction {}",
                order.id, transaction.id
            )));
        }

        let outcome = match &reason {
            Some(r) => PaymentOutcome::Failed { reason: r.clone() },
            None => PaymentOutcome::Cancelled,
        };
        self.resolve_transaction(&mut transaction, outcome, response)?;

        self.holds.release_session(order.session_id)?;
        self.store.remove_bookings(order.id)?;
        order.mark_cancelled(reason.clone())?;
        self.store.update_order(order.clone())?;
        self.settle_stage(order.session_id, terminal);

        tracing::info!(
            order = %order.id,
            transaction = %transaction.id,
            reason = reason.as_deref().unwrap_or("cancelled by buyer"),
            "Payment rolled back, holds released"
        );
        Ok(())
    }

    fn resolve_transaction(
        &self,
        transaction: &mut Transaction,
        outcome: PaymentOutcome,
        response: &ProviderResponse,
    ) -> Result<()> {
        if transaction.is_resolved() {
            return Ok(());
        }
        transaction.resolve(
            outcome,
            Some(response.code.clone()),
            Some(response.message.clone()),
        )?;
        self.store.update_transaction(transaction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opengate_inventory::{provision_section, MemoryStore};
    use opengate_types::{Event, HoldConfig, Section, SeatStatus};
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        manager: CheckoutManager,
        event_id: EventId,
        seats: Vec<SeatId>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let event = Event::dummy("Summer Gala");
        let event_id = event.id;
        store.insert_event(event).unwrap();
        let section = Section::dummy(event_id, "Gold", 2, 4, Decimal::new(5000, 2));
        let seats = provision_section(store.as_ref(), &section).unwrap();
        let holds = Arc::new(HoldManager::new(store.clone(), HoldConfig::default()));
        let manager = CheckoutManager::new(store.clone(), holds, PaymentConfig::sandbox());
        Fixture {
            store,
            manager,
            event_id,
            seats,
        }
    }

    #[test]
    fn begin_session_requires_known_event() {
        let f = fixture();
        assert!(f.manager.begin_session(f.event_id).is_ok());
        assert!(matches!(
            f.manager.begin_session(EventId::new()).unwrap_err(),
            OpengateError::EventNotFound(_)
        ));
    }

    #[test]
    fn selection_failure_keeps_stage() {
        let f = fixture();
        let other = f.manager.begin_session(f.event_id).unwrap();
        f.manager.select_seats(other, &f.seats[..1]).unwrap();

        let session = f.manager.begin_session(f.event_id).unwrap();
        let err = f.manager.select_seats(session, &f.seats[..2]).unwrap_err();
        assert!(matches!(err, OpengateError::SeatConflict(_)));
        assert_eq!(
            f.manager.stage(session).unwrap(),
            CheckoutStage::SeatSelection
        );
    }

    #[test]
    fn buyer_info_requires_a_held_seat() {
        let f = fixture();
        let session = f.manager.begin_session(f.event_id).unwrap();
        assert!(matches!(
            f.manager.proceed_to_buyer_info(session).unwrap_err(),
            OpengateError::EmptySelection
        ));

        f.manager.select_seats(session, &f.seats[..1]).unwrap();
        f.manager.proceed_to_buyer_info(session).unwrap();
        assert_eq!(f.manager.stage(session).unwrap(), CheckoutStage::BuyerInfo);
    }

    #[test]
    fn deselecting_everything_blocks_progress() {
        let f = fixture();
        let session = f.manager.begin_session(f.event_id).unwrap();
        f.manager.select_seats(session, &f.seats[..2]).unwrap();
        f.manager.deselect_seats(session, &f.seats[..2]).unwrap();
        assert!(matches!(
            f.manager.proceed_to_buyer_info(session).unwrap_err(),
            OpengateError::EmptySelection
        ));
    }

    #[test]
    fn invalid_buyer_info_rejected_in_place() {
        let f = fixture();
        let session = f.manager.begin_session(f.event_id).unwrap();
        f.manager.select_seats(session, &f.seats[..1]).unwrap();
        f.manager.proceed_to_buyer_info(session).unwrap();

        let mut buyer = BuyerInfo::dummy();
        buyer.email = String::new();
        let err = f.manager.submit_buyer_info(session, buyer).unwrap_err();
        assert!(matches!(err, OpengateError::MissingBuyerField { .. }));
        assert_eq!(f.manager.stage(session).unwrap(), CheckoutStage::BuyerInfo);
    }

    #[test]
    fn order_records_locked_total_and_bookings() {
        let f = fixture();
        let session = f.manager.begin_session(f.event_id).unwrap();
        f.manager.select_seats(session, &f.seats[..3]).unwrap();
        f.manager.proceed_to_buyer_info(session).unwrap();
        let order_id = f
            .manager
            .submit_buyer_info(session, BuyerInfo::dummy())
            .unwrap();

        let order = f.store.order(order_id).unwrap();
        assert_eq!(order.quantity, 3);
        assert_eq!(order.total_price, Decimal::new(15000, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(f.store.bookings_for_order(order_id).unwrap().len(), 3);
        assert_eq!(
            f.manager.stage(session).unwrap(),
            CheckoutStage::PaymentPending
        );
    }

    #[test]
    fn begin_payment_mints_pending_transaction() {
        let f = fixture();
        let session = f.manager.begin_session(f.event_id).unwrap();
        f.manager.select_seats(session, &f.seats[..2]).unwrap();
        f.manager.proceed_to_buyer_info(session).unwrap();
        f.manager
            .submit_buyer_info(session, BuyerInfo::dummy())
            .unwrap();

        let init = f
            .manager
            .begin_payment(session, PaymentMethod::MobileWallet)
            .unwrap();
        assert!(init.redirect_url.contains("iDet=2%20x%20Summer%20Gala"));
        let stored = f.store.transaction(&init.transaction.id).unwrap();
        assert!(!stored.is_resolved());

        // Initiation mutated nothing: seats still held, order still pending.
        assert_eq!(f.store.seat(f.seats[0]).unwrap().status, SeatStatus::Held);
    }

    #[test]
    fn cancel_releases_everything_and_is_idempotent() {
        let f = fixture();
        let session = f.manager.begin_session(f.event_id).unwrap();
        f.manager.select_seats(session, &f.seats[..2]).unwrap();
        f.manager.proceed_to_buyer_info(session).unwrap();
        let order_id = f
            .manager
            .submit_buyer_info(session, BuyerInfo::dummy())
            .unwrap();

        f.manager.cancel(session).unwrap();
        assert_eq!(
            f.store.order(order_id).unwrap().status,
            OrderStatus::Cancelled
        );
        assert!(f.store.bookings_for_order(order_id).unwrap().is_empty());
        for seat_id in &f.seats[..2] {
            assert_eq!(
                f.store.seat(*seat_id).unwrap().status,
                SeatStatus::Available
            );
        }
        assert_eq!(f.manager.stage(session).unwrap(), CheckoutStage::Cancelled);

        // Repeating the cancel changes nothing.
        f.manager.cancel(session).unwrap();
        assert_eq!(
            f.store.order(order_id).unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn wrong_stage_is_named_in_the_error() {
        let f = fixture();
        let session = f.manager.begin_session(f.event_id).unwrap();
        let err = f
            .manager
            .begin_payment(session, PaymentMethod::Card)
            .unwrap_err();
        assert!(matches!(
            err,
            OpengateError::WrongStage {
                expected: CheckoutStage::PaymentPending,
                actual: CheckoutStage::SeatSelection,
            }
        ));
    }
}
