//! Integration test: PaperExchange through the ExchangeGateway port
//!
//! Entry -> protective orders -> price moves -> residual order cleanup

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use swarm_core::{
    ConditionalOrder, InstrumentConstraints, LimitOrder, MarketOrder, Side, TriggerDirection,
};
use swarm_gateway::{PaperCall, PaperExchange, RetryPolicy};
use swarm_ports::{ExchangeGateway, GatewayError};

fn exchange() -> Arc<PaperExchange> {
    Arc::new(PaperExchange::new().with_instrument(
        "ETH-USDT-SWAP",
        InstrumentConstraints::new(dec!(0.01), dec!(0.01)).with_contract_value(dec!(0.1)),
        dec!(2000),
    ))
}

fn market(side: Side, quantity: rust_decimal::Decimal) -> MarketOrder {
    MarketOrder {
        client_order_id: "entry-1".to_string(),
        symbol: "ETH-USDT-SWAP".to_string(),
        side,
        quantity,
    }
}

#[tokio::test]
async fn test_take_profit_fill_leaves_orphaned_stop() {
    let _ = env_logger::try_init();
    let exchange = exchange();
    let gateway: Arc<dyn ExchangeGateway> = exchange.clone();

    gateway.place_market_order(&market(Side::Buy, dec!(5))).await.unwrap();
    assert_eq!(exchange.position("ETH-USDT-SWAP"), dec!(5));

    gateway
        .place_limit_order(&LimitOrder {
            client_order_id: "tp-1".to_string(),
            symbol: "ETH-USDT-SWAP".to_string(),
            side: Side::Sell,
            quantity: dec!(5),
            price: dec!(2050),
            reduce_only: true,
        })
        .await
        .unwrap();
    gateway
        .place_conditional_order(&ConditionalOrder {
            client_order_id: "sl-1".to_string(),
            symbol: "ETH-USDT-SWAP".to_string(),
            side: Side::Sell,
            quantity: dec!(5),
            trigger_price: dec!(1980),
            trigger_direction: TriggerDirection::Falling,
            reduce_only: true,
        })
        .await
        .unwrap();
    assert_eq!(exchange.open_order_count("ETH-USDT-SWAP"), 2);

    // Target hit: position closes, stop remains resting
    exchange.set_last_price("ETH-USDT-SWAP", dec!(2055));
    assert_eq!(gateway.get_position_size("ETH-USDT-SWAP").await.unwrap(), dec!(0));
    assert_eq!(exchange.open_order_count("ETH-USDT-SWAP"), 1);

    // A later dip fires the orphan, but reduce-only cannot open a short
    exchange.set_last_price("ETH-USDT-SWAP", dec!(1970));
    assert_eq!(exchange.position("ETH-USDT-SWAP"), dec!(0));

    gateway.cancel_all_orders("ETH-USDT-SWAP").await.unwrap();
    assert_eq!(exchange.open_order_count("ETH-USDT-SWAP"), 0);
}

#[tokio::test]
async fn test_already_crossed_trigger_is_rejected() {
    let exchange = exchange();
    exchange.place_market_order(&market(Side::Sell, dec!(1))).await.unwrap();

    // Short stop below the market would fire immediately
    let err = exchange
        .place_conditional_order(&ConditionalOrder {
            client_order_id: "sl-1".to_string(),
            symbol: "ETH-USDT-SWAP".to_string(),
            side: Side::Buy,
            quantity: dec!(1),
            trigger_price: dec!(1990),
            trigger_direction: TriggerDirection::Rising,
            reduce_only: true,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, "51277");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_scripted_readings_then_real_position() {
    let exchange = exchange();
    exchange.place_market_order(&market(Side::Buy, dec!(2))).await.unwrap();
    exchange.script_positions("ETH-USDT-SWAP", [dec!(0), dec!(0)]);

    assert_eq!(exchange.get_position_size("ETH-USDT-SWAP").await.unwrap(), dec!(0));
    assert_eq!(exchange.get_position_size("ETH-USDT-SWAP").await.unwrap(), dec!(0));
    assert_eq!(exchange.get_position_size("ETH-USDT-SWAP").await.unwrap(), dec!(2));
    assert_eq!(exchange.call_count(PaperCall::PositionSize), 3);
}

#[tokio::test(start_paused = true)]
async fn test_injected_transient_failure_is_retried() {
    let exchange = exchange();
    exchange.fail_next(
        PaperCall::LastPrice,
        GatewayError::transient("50001", "service temporarily unavailable"),
    );

    let policy = RetryPolicy::default().with_backoff(Duration::from_millis(10), Duration::from_millis(10));
    let price = policy
        .run("get_last_price", || exchange.get_last_price("ETH-USDT-SWAP"))
        .await
        .unwrap();

    assert_eq!(price, dec!(2000));
    assert_eq!(exchange.call_count(PaperCall::LastPrice), 2);
}

#[tokio::test]
async fn test_unknown_instrument_is_rejected() {
    let exchange = exchange();
    let err = exchange
        .get_instrument_constraints("DOGE-USDT-SWAP")
        .await
        .unwrap_err();
    assert!(!err.is_transient());
    assert!(exchange.get_candles("ETH-USDT-SWAP", swarm_core::Timeframe::M15, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_call_log_keeps_only_recent_calls() {
    let exchange = PaperExchange::new()
        .with_instrument(
            "ETH-USDT-SWAP",
            InstrumentConstraints::new(dec!(0.01), dec!(0.01)),
            dec!(2000),
        )
        .with_call_log_limit(3);

    for _ in 0..5 {
        exchange.get_last_price("ETH-USDT-SWAP").await.unwrap();
    }
    exchange.get_position_size("ETH-USDT-SWAP").await.unwrap();

    let calls = exchange.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].0, PaperCall::PositionSize);
    // Counters are unaffected by the cap
    assert_eq!(exchange.call_count(PaperCall::LastPrice), 5);
}
