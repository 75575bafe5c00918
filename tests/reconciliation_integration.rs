//! Refund reconciliation and receipt resends over the in-memory adapters.

mod common;

use common::{level, start, user, World, ADMIN_EMAIL};
use membership_engine::application::RefundOutcome;
use membership_engine::domain::foundation::{Money, OrderId};
use membership_engine::domain::gateway::{GatewayErrorCode, GatewayKind, GatewayResult};
use membership_engine::domain::order::{Order, OrderEvent, OrderNotes, RecurringDiscount};
use membership_engine::domain::DomainEvent;
use membership_engine::ports::OrderRepository;

fn order_id() -> OrderId {
    OrderId::new(77).unwrap()
}

fn order(notes: Option<&str>) -> Order {
    let mut order = Order::new(
        order_id(),
        user(4),
        level(1),
        "Gold",
        Money::from_cents(9000),
        GatewayKind::Stripe,
        start(),
    );
    order.payment_transaction_id = Some("pi_77".into());
    order.notes = OrderNotes::from_stored(notes.map(str::to_string));
    order
}

fn refund_ok() -> GatewayResult {
    GatewayResult::success("Refund processed")
        .with_data("refund_id", "re_123")
        .with_data("amount", 20.0)
        .with_data("status", "succeeded")
}

fn order_events(world: &World) -> Vec<OrderEvent> {
    world
        .bus
        .published_events()
        .into_iter()
        .filter_map(|e| match e.payload {
            DomainEvent::Order(event) => Some(event),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn refund_success_appends_blank_line_separated_note() {
    let world = World::new(0, refund_ok()).await;
    world.orders.put(order(Some("Existing note"))).await;

    let outcome = world
        .reconciliation
        .handle_refund_recorded(order_id(), Money::from_cents(2000), Some("Damaged".into()), None)
        .await
        .unwrap();

    assert!(matches!(outcome, RefundOutcome::Succeeded { ref refund_id, .. } if refund_id == "re_123"));
    let stored = world.orders.find_by_id(&order_id()).await.unwrap().unwrap();
    assert_eq!(
        stored.notes.as_deref(),
        Some("Existing note\n\nStripe refund processed: $20.00 (Refund ID: re_123)")
    );

    let events = order_events(&world);
    assert_eq!(events.len(), 1);
    match &events[0] {
        OrderEvent::RefundSucceeded {
            order_id: id,
            refund_id,
            amount,
            reason,
            ..
        } => {
            assert_eq!(*id, order_id());
            assert_eq!(refund_id, "re_123");
            assert_eq!(*amount, Money::from_cents(2000));
            assert_eq!(reason.as_deref(), Some("Damaged"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(world.gateway.refund_calls(), 1);
}

#[tokio::test]
async fn refund_failure_leaves_notes_absent_and_reports_result() {
    let declined = GatewayResult::failure("Your card was declined.", GatewayErrorCode::CardDeclined);
    let world = World::new(0, declined.clone()).await;
    world.orders.put(order(None)).await;

    let outcome = world
        .reconciliation
        .handle_refund_recorded(order_id(), Money::from_cents(2000), None, None)
        .await
        .unwrap();

    assert!(matches!(outcome, RefundOutcome::Failed(ref result) if *result == declined));
    let stored = world.orders.find_by_id(&order_id()).await.unwrap().unwrap();
    assert_eq!(stored.notes.as_deref(), None);

    let events = order_events(&world);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        OrderEvent::RefundFailed { order_id: id, result, .. } if *id == order_id() && *result == declined
    ));
}

#[tokio::test]
async fn two_refunds_keep_both_entries_in_order() {
    let world = World::new(0, refund_ok()).await;
    world.orders.put(order(None)).await;

    for _ in 0..2 {
        world
            .reconciliation
            .handle_refund_recorded(order_id(), Money::from_cents(2000), None, None)
            .await
            .unwrap();
    }

    let stored = world.orders.find_by_id(&order_id()).await.unwrap().unwrap();
    assert_eq!(stored.notes.entry_count(), 2);
    assert!(stored
        .notes
        .as_deref()
        .unwrap()
        .starts_with("Stripe refund processed: $20.00"));
}

#[tokio::test]
async fn resend_receipt_sends_member_copy_then_one_admin_copy() {
    let world = World::with_grace(0).await;
    let mut order = order(None);
    order.discount_code = Some("SAVE10".into());
    order.discount_amount = Money::from_cents(1000);
    order.trial_days = 7;
    order.recurring_discount = RecurringDiscount::from_parts(Some("percent"), 10.0).unwrap();
    world.orders.put(order).await;

    world.reconciliation.handle_resend_receipt(order_id()).await.unwrap();

    let sent = world.emails.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].template, "invoice");
    assert_eq!(sent[0].recipient, "member4@example.com");
    assert_eq!(sent[0].data_str("discount_summary"), Some("Discount SAVE10 applied: -$10.00"));
    assert_eq!(sent[0].data_str("trial_summary"), Some("Free trial: 7 days"));
    assert_eq!(
        sent[0].data_str("recurring_summary"),
        Some("Recurring discount: 10.00% off each renewal")
    );
    assert_eq!(sent[1].template, "invoice_admin");
    assert_eq!(sent[1].recipient, ADMIN_EMAIL);
    assert_eq!(sent.iter().filter(|m| m.template == "invoice_admin").count(), 1);
}
