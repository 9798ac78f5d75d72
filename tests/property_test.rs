use gateway_sync::domain::entity::{GiftPaymentStatus, OrderStatus, SubscriptionStatus};
use gateway_sync::domain::id::{GatewayId, IdempotencyKey};
use gateway_sync::domain::money::MoneyAmount;
use gateway_sync::domain::notification::{InboundNotification, NotificationKind};
use gateway_sync::domain::status_map::StatusMapper;
use gateway_sync::services::idempotency::InMemoryGuard;
use proptest::prelude::*;

fn arb_gateway_status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("approved".to_string()),
        Just("authorized".to_string()),
        Just("pending".to_string()),
        Just("in_process".to_string()),
        Just("rejected".to_string()),
        Just("cancelled".to_string()),
        Just("refunded".to_string()),
        Just("charged_back".to_string()),
        Just("paused".to_string()),
        ".*",
    ]
}

proptest! {
    /// Every input string maps to some internal status; round-trips through
    /// the stored text form.
    #[test]
    fn status_mapping_is_total(raw in arb_gateway_status()) {
        let mapper = StatusMapper::default();

        let order = mapper.map_order(&raw);
        prop_assert_eq!(OrderStatus::try_from(order.as_str()).unwrap(), order);

        let gift = mapper.map_gift(&raw);
        prop_assert_eq!(GiftPaymentStatus::try_from(gift.as_str()).unwrap(), gift);

        let sub = mapper.map_subscription(&raw);
        prop_assert_eq!(SubscriptionStatus::try_from(sub.as_str()).unwrap(), sub);
    }

    /// Anything outside the table is pending for every entity kind.
    #[test]
    fn unknown_statuses_are_pending(raw in "[a-z_]{1,24}") {
        let mapper = StatusMapper::default();
        prop_assume!(
            !mapper.order.knows(&raw) && !mapper.gift.knows(&raw) && !mapper.subscription.knows(&raw)
        );
        prop_assert_eq!(mapper.map_order(&raw), OrderStatus::Pending);
        prop_assert_eq!(mapper.map_gift(&raw), GiftPaymentStatus::Pending);
        prop_assert_eq!(mapper.map_subscription(&raw), SubscriptionStatus::Pending);
    }

    /// The in-memory guard never holds more than its bound, and the most
    /// recent key always survives eviction.
    #[test]
    fn guard_stays_bounded(ids in prop::collection::vec("[A-Z0-9]{1,6}", 1..3000)) {
        let guard = InMemoryGuard::default();
        for id in &ids {
            guard.insert(IdempotencyKey::new(NotificationKind::Payment, &GatewayId::new(id.as_str()).unwrap()));
            prop_assert!(guard.len() <= 1000);
        }
        let last = ids.last().unwrap();
        prop_assert!(guard.contains(&IdempotencyKey::new(
            NotificationKind::Payment,
            &GatewayId::new(last.as_str()).unwrap()
        )));
    }

    /// Parsing never panics, whatever the body.
    #[test]
    fn notification_parse_never_panics(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = InboundNotification::parse(&body, None, None);
    }

    /// Same (kind, id) always yields the same key, whether the id arrived as
    /// a number or a string.
    #[test]
    fn key_ignores_id_encoding(n in 1u64..u64::MAX) {
        let numeric = format!(r#"{{"type":"payment","data":{{"id":{n}}}}}"#);
        let string = format!(r#"{{"type":"payment","data":{{"id":"{n}"}}}}"#);
        let a = InboundNotification::parse(numeric.as_bytes(), None, None).unwrap();
        let b = InboundNotification::parse(string.as_bytes(), None, None).unwrap();
        prop_assert_eq!(a.idempotency_key(), b.idempotency_key());
    }

    /// Decimal amounts convert to the nearest cent.
    #[test]
    fn decimal_amounts_round_to_cents(cents in 0i64..10_000_000_000) {
        let decimal = cents as f64 / 100.0;
        prop_assert_eq!(MoneyAmount::from_decimal(decimal).unwrap().cents(), cents);
    }
}
