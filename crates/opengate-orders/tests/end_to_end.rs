//! End-to-end integration tests across all three planes.
//!
//! These tests exercise the full checkout lifecycle:
//! Seat Plane (Inventory) -> Payment Plane -> Checkout Plane (Orders)
//!
//! They verify that the planes work together correctly in realistic
//! scenarios: contended selection, all-or-nothing acquisition, payment
//! reconciliation, forged-callback rejection, expiry sweeps, and
//! confirmation idempotency.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use opengate_inventory::{provision_section, HoldManager, HoldSweeper, MemoryStore, SeatStore};
use opengate_orders::CheckoutManager;
use opengate_payment::generate_token;
use opengate_types::*;
use rust_decimal::Decimal;

const SEAT_PRICE: Decimal = Decimal::from_parts(5000, 0, 0, false, 2); // 50.00

/// Helper: full checkout pipeline — catalog, holds, orders, reconciliation.
struct CheckoutPipeline {
    store: Arc<MemoryStore>,
    holds: Arc<HoldManager>,
    manager: CheckoutManager,
    event_id: EventId,
    section_id: SectionId,
    seats: Vec<SeatId>,
    merchant_secret: String,
}

impl CheckoutPipeline {
    fn new(hold_config: HoldConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = Arc::new(MemoryStore::new());
        let event = Event::dummy("Summer Gala");
        let event_id = event.id;
        store.insert_event(event).expect("Event insert should succeed");

        let section = Section::dummy(event_id, "Gold", 2, 4, SEAT_PRICE);
        let section_id = section.id;
        let seats =
            provision_section(store.as_ref(), &section).expect("Provisioning should succeed");

        let payment = PaymentConfig::sandbox();
        let merchant_secret = payment.merchant_secret.clone();
        let holds = Arc::new(HoldManager::new(store.clone(), hold_config));
        let manager = CheckoutManager::new(store.clone(), holds.clone(), payment);

        Self {
            store,
            holds,
            manager,
            event_id,
            section_id,
            seats,
            merchant_secret,
        }
    }

    /// Drive one session from opening through order creation, ready to pay.
    fn checkout_to_payment(&self, seat_count: usize) -> (SessionId, OrderId) {
        let session = self
            .manager
            .begin_session(self.event_id)
            .expect("Session should open");
        self.manager
            .select_seats(session, &self.seats[..seat_count])
            .expect("Selection should succeed");
        self.manager
            .proceed_to_buyer_info(session)
            .expect("Stage advance should succeed");
        let order_id = self
            .manager
            .submit_buyer_info(session, BuyerInfo::dummy())
            .expect("Buyer info should be accepted");
        (session, order_id)
    }

    /// What the provider would send back for this transaction, with a
    /// genuinely computed integrity token.
    fn provider_verdict(
        &self,
        transaction: &Transaction,
        code: &str,
        message: &str,
    ) -> ProviderResponse {
        ProviderResponse {
            transaction_id: transaction.id.clone(),
            code: code.to_string(),
            message: message.to_string(),
            token: generate_token(
                &transaction.id,
                transaction.amount,
                &transaction.item_details,
                &self.merchant_secret,
                code,
            ),
        }
    }

    fn seat_status(&self, seat_id: SeatId) -> SeatStatus {
        self.store.seat(seat_id).expect("Seat should exist").status
    }
}

// =============================================================================
// Test: Wallet checkout, selection through confirmed order
// =============================================================================
#[test]
fn e2e_wallet_checkout_happy_path() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(2);

    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::MobileWallet)
        .expect("Payment initiation should succeed");

    // The redirect carries the transaction, the trimmed amount, and the
    // token, but never the merchant secret.
    assert!(init.redirect_url.contains(&format!(
        "tID={}",
        init.transaction.id.as_str()
    )));
    assert!(init.redirect_url.contains("amt=100"));
    assert!(init.redirect_url.contains("token="));
    assert!(!init.redirect_url.contains("sandbox-secret"));

    // The callback path delivers the verdict as camelCase JSON.
    let token = generate_token(
        &init.transaction.id,
        init.transaction.amount,
        &init.transaction.item_details,
        &pipeline.merchant_secret,
        "101",
    );
    let body = format!(
        r#"{{"transactionId":"{}","code":"101","message":"Transaction successful","token":"{token}"}}"#,
        init.transaction.id
    );
    let verdict: ProviderResponse = serde_json::from_str(&body).expect("Wire JSON should parse");
    let outcome = pipeline
        .manager
        .confirm_payment(&verdict)
        .expect("Confirmation should succeed");
    assert_eq!(outcome, PaymentOutcome::Success);

    // Seats flipped HELD -> BOOKED.
    for seat_id in &pipeline.seats[..2] {
        assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Booked);
    }

    // Order confirmed and pointing at the winning transaction.
    let order = pipeline.store.order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.total_price, Decimal::new(10000, 2));
    assert_eq!(order.transaction_id, Some(init.transaction.id.clone()));

    // Transaction resolved with the provider's code on record.
    let txn = pipeline.store.transaction(&init.transaction.id).unwrap();
    assert!(txn.is_resolved());
    assert_eq!(txn.response_code.as_deref(), Some("101"));

    assert_eq!(
        pipeline.manager.stage(session).unwrap(),
        CheckoutStage::Confirmed
    );
}

// =============================================================================
// Test: Card checkout redirects to the static gateway page
// =============================================================================
#[test]
fn e2e_card_checkout_happy_path() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(1);

    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::Card)
        .expect("Payment initiation should succeed");
    assert_eq!(
        init.redirect_url,
        PaymentConfig::sandbox().gateway_redirect_url
    );

    let verdict = pipeline.provider_verdict(&init.transaction, "101", "Transaction successful");
    assert_eq!(
        pipeline.manager.confirm_payment(&verdict).unwrap(),
        PaymentOutcome::Success
    );
    assert_eq!(
        pipeline.store.order(order_id).unwrap().status,
        OrderStatus::Confirmed
    );
}

// =============================================================================
// Test: Duplicate success delivery is a no-op, not a double booking
// =============================================================================
#[test]
fn e2e_duplicate_success_is_noop() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(2);
    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::MobileWallet)
        .unwrap();

    let verdict = pipeline.provider_verdict(&init.transaction, "101", "Transaction successful");

    // Polling path lands first, callback path repeats the same verdict.
    assert_eq!(
        pipeline.manager.confirm_payment(&verdict).unwrap(),
        PaymentOutcome::Success
    );
    assert_eq!(
        pipeline.manager.confirm_payment(&verdict).unwrap(),
        PaymentOutcome::Success
    );

    let order = pipeline.store.order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    for seat_id in &pipeline.seats[..2] {
        assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Booked);
    }
}

// =============================================================================
// Test: Overlapping selection is all-or-nothing with exactly one winner
// =============================================================================
#[test]
fn e2e_overlapping_selection_all_or_nothing() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());

    let alice = pipeline.manager.begin_session(pipeline.event_id).unwrap();
    let bob = pipeline.manager.begin_session(pipeline.event_id).unwrap();

    // Alice holds seat 1.
    pipeline
        .manager
        .select_seats(alice, &pipeline.seats[1..2])
        .unwrap();

    // Bob wants seats 0 and 1. Seat 1 conflicts, so he must get neither.
    let err = pipeline
        .manager
        .select_seats(bob, &pipeline.seats[..2])
        .unwrap_err();
    assert!(matches!(err, OpengateError::SeatConflict(id) if id == pipeline.seats[1]));

    // Seat 0 was rolled back, not left stranded under Bob's session.
    assert_eq!(pipeline.seat_status(pipeline.seats[0]), SeatStatus::Available);
    assert_eq!(pipeline.seat_status(pipeline.seats[1]), SeatStatus::Held);
    assert!(pipeline
        .holds
        .active_holds(bob, Utc::now())
        .unwrap()
        .is_empty());

    // Bob can still buy the free seat on a retry.
    pipeline
        .manager
        .select_seats(bob, &pipeline.seats[..1])
        .unwrap();
}

// =============================================================================
// Test: Per-session seat cap holds across separate selections
// =============================================================================
#[test]
fn e2e_seat_cap_enforced() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let session = pipeline.manager.begin_session(pipeline.event_id).unwrap();

    pipeline
        .manager
        .select_seats(session, &pipeline.seats[..3])
        .unwrap();

    // 3 held + 2 more would exceed the default cap of 4.
    let err = pipeline
        .manager
        .select_seats(session, &pipeline.seats[3..5])
        .unwrap_err();
    assert!(matches!(
        err,
        OpengateError::SeatLimitExceeded {
            requested: 2,
            held: 3,
            max: 4,
        }
    ));

    // The failed request touched nothing.
    assert_eq!(pipeline.seat_status(pipeline.seats[3]), SeatStatus::Available);
    assert_eq!(pipeline.seat_status(pipeline.seats[4]), SeatStatus::Available);

    // One more seat exactly reaches the cap.
    pipeline
        .manager
        .select_seats(session, &pipeline.seats[3..4])
        .unwrap();
}

// =============================================================================
// Test: Cancelled payment releases every seat and keeps the order for audit
// =============================================================================
#[test]
fn e2e_cancelled_payment_releases_seats() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(2);
    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::MobileWallet)
        .unwrap();

    let verdict = pipeline.provider_verdict(&init.transaction, "111", "Cancelled by user");
    assert_eq!(
        pipeline.manager.confirm_payment(&verdict).unwrap(),
        PaymentOutcome::Cancelled
    );

    for seat_id in &pipeline.seats[..2] {
        assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Available);
    }
    let order = pipeline.store.order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(pipeline.store.bookings_for_order(order_id).unwrap().is_empty());
    assert_eq!(
        pipeline.manager.stage(session).unwrap(),
        CheckoutStage::Cancelled
    );

    // A repeated delivery of the same verdict converges, no error.
    assert_eq!(
        pipeline.manager.confirm_payment(&verdict).unwrap(),
        PaymentOutcome::Cancelled
    );

    // Another buyer can take the freed seats immediately.
    let next = pipeline.manager.begin_session(pipeline.event_id).unwrap();
    pipeline
        .manager
        .select_seats(next, &pipeline.seats[..2])
        .unwrap();
}

// =============================================================================
// Test: Failed payment retains the provider's reason on the order
// =============================================================================
#[test]
fn e2e_failed_payment_keeps_reason() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(1);
    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::Card)
        .unwrap();

    let verdict = pipeline.provider_verdict(&init.transaction, "102", "Insufficient funds");
    let outcome = pipeline.manager.confirm_payment(&verdict).unwrap();
    assert_eq!(
        outcome,
        PaymentOutcome::Failed {
            reason: "Insufficient funds".to_string()
        }
    );

    let order = pipeline.store.order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.failure_reason.as_deref(), Some("Insufficient funds"));
    assert_eq!(pipeline.seat_status(pipeline.seats[0]), SeatStatus::Available);
    assert_eq!(
        pipeline.manager.stage(session).unwrap(),
        CheckoutStage::Failed
    );
}

// =============================================================================
// Test: Forged callback commits nothing
// =============================================================================
#[test]
fn e2e_forged_callback_commits_nothing() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(2);
    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::MobileWallet)
        .unwrap();

    // An attacker claims success without knowing the merchant secret.
    let forged = ProviderResponse {
        transaction_id: init.transaction.id.clone(),
        code: "101".to_string(),
        message: "Transaction successful".to_string(),
        token: generate_token(
            &init.transaction.id,
            init.transaction.amount,
            &init.transaction.item_details,
            "guessed-secret",
            "101",
        ),
    };
    let err = pipeline.manager.confirm_payment(&forged).unwrap_err();
    assert!(matches!(err, OpengateError::TokenMismatch(_)));

    // Nothing moved: seats held, order pending, transaction unresolved.
    for seat_id in &pipeline.seats[..2] {
        assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Held);
    }
    assert_eq!(
        pipeline.store.order(order_id).unwrap().status,
        OrderStatus::Pending
    );
    assert!(!pipeline
        .store
        .transaction(&init.transaction.id)
        .unwrap()
        .is_resolved());

    // The genuine verdict still goes through afterwards.
    let genuine = pipeline.provider_verdict(&init.transaction, "101", "Transaction successful");
    assert_eq!(
        pipeline.manager.confirm_payment(&genuine).unwrap(),
        PaymentOutcome::Success
    );
}

// =============================================================================
// Test: Success arriving after the holds lapsed never rebooks the seats
// =============================================================================
#[test]
fn e2e_late_success_after_expiry() {
    let pipeline = CheckoutPipeline::new(HoldConfig {
        ttl: Duration::from_millis(30),
        ..HoldConfig::default()
    });
    let (session, order_id) = pipeline.checkout_to_payment(2);
    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::MobileWallet)
        .unwrap();

    // The buyer stalls on the provider page until the holds lapse and the
    // sweep reclaims the seats.
    std::thread::sleep(Duration::from_millis(60));
    let swept = pipeline.holds.sweep_expired(Utc::now()).unwrap();
    assert_eq!(swept, 2);

    // A rival takes one of the freed seats.
    let rival = pipeline.manager.begin_session(pipeline.event_id).unwrap();
    pipeline
        .manager
        .select_seats(rival, &pipeline.seats[..1])
        .unwrap();

    // The late success must not disturb the rival's claim.
    let verdict = pipeline.provider_verdict(&init.transaction, "101", "Transaction successful");
    let err = pipeline.manager.confirm_payment(&verdict).unwrap_err();
    assert!(matches!(err, OpengateError::HoldExpired(s) if s == session));

    assert_eq!(pipeline.seat_status(pipeline.seats[0]), SeatStatus::Held);
    assert_eq!(pipeline.seat_status(pipeline.seats[1]), SeatStatus::Available);

    // The order stays cancelled, but the successful charge is on record.
    let order = pipeline.store.order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    let txn = pipeline.store.transaction(&init.transaction.id).unwrap();
    assert_eq!(txn.outcome, PaymentOutcome::Success);
}

// =============================================================================
// Test: Order totals are locked in at creation, repricing never moves them
// =============================================================================
#[test]
fn e2e_price_locked_in_at_order_creation() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(2);

    // The venue doubles the section price mid-checkout.
    pipeline
        .store
        .update_section_price(pipeline.section_id, Decimal::new(10000, 2))
        .unwrap();

    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::MobileWallet)
        .unwrap();
    // The charge is for the total captured at order creation.
    assert_eq!(init.transaction.amount, Decimal::new(10000, 2));
    assert!(init.redirect_url.contains("amt=100"));

    let verdict = pipeline.provider_verdict(&init.transaction, "101", "Transaction successful");
    pipeline.manager.confirm_payment(&verdict).unwrap();
    assert_eq!(
        pipeline.store.order(order_id).unwrap().total_price,
        Decimal::new(10000, 2)
    );

    // A later buyer in the same section pays the new price.
    let (next_session, next_order) = pipeline.checkout_to_payment(1);
    let _ = next_session;
    assert_eq!(
        pipeline.store.order(next_order).unwrap().total_price,
        Decimal::new(10000, 2)
    );
}

// =============================================================================
// Test: Buyer cancellation frees the seats for the next session
// =============================================================================
#[test]
fn e2e_buyer_cancel_frees_seats() {
    let pipeline = CheckoutPipeline::new(HoldConfig::default());
    let (session, order_id) = pipeline.checkout_to_payment(3);

    pipeline.manager.cancel(session).unwrap();

    for seat_id in &pipeline.seats[..3] {
        assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Available);
    }
    assert_eq!(
        pipeline.store.order(order_id).unwrap().status,
        OrderStatus::Cancelled
    );

    // The same seats sell to the next buyer end to end.
    let (next_session, _next_order) = pipeline.checkout_to_payment(3);
    let init = pipeline
        .manager
        .begin_payment(next_session, PaymentMethod::Card)
        .unwrap();
    let verdict = pipeline.provider_verdict(&init.transaction, "101", "Transaction successful");
    assert_eq!(
        pipeline.manager.confirm_payment(&verdict).unwrap(),
        PaymentOutcome::Success
    );
    for seat_id in &pipeline.seats[..3] {
        assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Booked);
    }
}

// =============================================================================
// Test: Background sweeper recycles abandoned sessions without intervention
// =============================================================================
#[tokio::test]
async fn e2e_sweeper_recycles_abandoned_session() {
    let pipeline = CheckoutPipeline::new(HoldConfig {
        ttl: Duration::from_millis(50),
        sweep_interval: Duration::from_millis(20),
        ..HoldConfig::default()
    });

    let abandoned = pipeline.manager.begin_session(pipeline.event_id).unwrap();
    pipeline
        .manager
        .select_seats(abandoned, &pipeline.seats[..4])
        .unwrap();

    let sweeper = Arc::new(HoldSweeper::new(pipeline.holds.clone()));
    let handle = sweeper.clone().start();

    tokio::time::sleep(Duration::from_millis(200)).await;

    // The abandoned claims are gone and a new buyer completes normally.
    let (session, order_id) = pipeline.checkout_to_payment(4);
    let init = pipeline
        .manager
        .begin_payment(session, PaymentMethod::MobileWallet)
        .unwrap();
    let verdict = pipeline.provider_verdict(&init.transaction, "101", "Transaction successful");
    assert_eq!(
        pipeline.manager.confirm_payment(&verdict).unwrap(),
        PaymentOutcome::Success
    );
    assert_eq!(
        pipeline.store.order(order_id).unwrap().status,
        OrderStatus::Confirmed
    );

    sweeper.shutdown();
    handle.await.unwrap();
}

// =============================================================================
// Test: Randomized contention never double-books a seat
// =============================================================================
#[test]
fn e2e_randomized_contention_never_double_books() {
    use rand::Rng;

    let pipeline = Arc::new(CheckoutPipeline::new(HoldConfig::default()));

    // Eight buyers race for random adjacent seat pairs out of eight seats.
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let p = pipeline.clone();
            std::thread::spawn(move || {
                let start = rand::thread_rng().gen_range(0..p.seats.len() - 1);
                let picks = [p.seats[start], p.seats[start + 1]];

                let session = p.manager.begin_session(p.event_id).unwrap();
                match p.manager.select_seats(session, &picks) {
                    Ok(_) => {
                        p.manager.proceed_to_buyer_info(session).unwrap();
                        let order_id = p
                            .manager
                            .submit_buyer_info(session, BuyerInfo::dummy())
                            .unwrap();
                        let init = p
                            .manager
                            .begin_payment(session, PaymentMethod::MobileWallet)
                            .unwrap();
                        let verdict = p.provider_verdict(&init.transaction, "101", "OK");
                        p.manager.confirm_payment(&verdict).unwrap();
                        Some(order_id)
                    }
                    Err(OpengateError::SeatConflict(_)) => None,
                    Err(other) => panic!("Unexpected acquisition error: {other}"),
                }
            })
        })
        .collect();

    let confirmed: Vec<OrderId> = handles
        .into_iter()
        .filter_map(|h| h.join().expect("Buyer thread should not panic"))
        .collect();

    // Every booked seat belongs to exactly one confirmed order, and seats
    // belonging to no winner came all the way back to AVAILABLE.
    let mut booked = std::collections::HashSet::new();
    for order_id in &confirmed {
        assert_eq!(
            pipeline.store.order(*order_id).unwrap().status,
            OrderStatus::Confirmed
        );
        for seat_id in pipeline.store.bookings_for_order(*order_id).unwrap() {
            assert!(booked.insert(seat_id), "Seat {seat_id} booked twice");
            assert_eq!(pipeline.seat_status(seat_id), SeatStatus::Booked);
        }
    }
    for seat_id in &pipeline.seats {
        if !booked.contains(seat_id) {
            assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Available);
        }
    }
}

// =============================================================================
// Test: Concurrent checkouts over disjoint seats all succeed
// =============================================================================
#[test]
fn e2e_parallel_disjoint_checkouts() {
    let pipeline = Arc::new(CheckoutPipeline::new(HoldConfig::default()));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let p = pipeline.clone();
            std::thread::spawn(move || {
                let session = p.manager.begin_session(p.event_id).unwrap();
                p.manager
                    .select_seats(session, &p.seats[i * 2..i * 2 + 2])
                    .unwrap();
                p.manager.proceed_to_buyer_info(session).unwrap();
                let order_id = p
                    .manager
                    .submit_buyer_info(session, BuyerInfo::dummy())
                    .unwrap();
                let init = p.manager.begin_payment(session, PaymentMethod::Card).unwrap();
                let verdict = p.provider_verdict(&init.transaction, "101", "OK");
                p.manager.confirm_payment(&verdict).unwrap();
                order_id
            })
        })
        .collect();

    for handle in handles {
        let order_id = handle.join().expect("Checkout thread should not panic");
        assert_eq!(
            pipeline.store.order(order_id).unwrap().status,
            OrderStatus::Confirmed
        );
    }

    // Every seat in the section ended up booked exactly once.
    for seat_id in &pipeline.seats {
        assert_eq!(pipeline.seat_status(*seat_id), SeatStatus::Booked);
    }
}
