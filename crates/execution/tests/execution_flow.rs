//! Integration test: OrderExecutor + PositionWatchdog against PaperExchange
//!
//! Entry -> protective orders -> position closes -> residual orders cancelled

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use swarm_clock::{Shutdown, StopReason};
use swarm_core::{InstrumentConstraints, RiskOrder, Side};
use swarm_execution::{
    ExecutionConfig, OrderExecutor, TradeStage, WatchdogConfig, WatchdogLauncher,
};
use swarm_gateway::{PaperCall, PaperExchange};
use swarm_ports::GatewayError;

const SYMBOL: &str = "ETH-USDT-SWAP";

fn constraints() -> InstrumentConstraints {
    InstrumentConstraints::new(dec!(0.01), dec!(0.01))
}

fn setup(shutdown: &Shutdown) -> (Arc<PaperExchange>, OrderExecutor) {
    let exchange = Arc::new(PaperExchange::new().with_instrument(SYMBOL, constraints(), dec!(2000)));
    let watchdog = WatchdogConfig::default()
        .with_timing(Duration::from_secs(2), Duration::from_secs(5))
        .with_max_checks(50);
    let launcher = Arc::new(WatchdogLauncher::new(exchange.clone(), watchdog, shutdown.signal()));
    let executor = OrderExecutor::new(exchange.clone(), launcher, ExecutionConfig::default());
    (exchange, executor)
}

fn long_order() -> RiskOrder {
    RiskOrder {
        symbol: SYMBOL.to_string(),
        side: Side::Buy,
        quantity: dec!(0.5),
        entry_price: dec!(2000),
        stop_price: dec!(1994),
        target_price: dec!(2014.4),
    }
}

#[tokio::test(start_paused = true)]
async fn test_protected_entry_then_cleanup_after_take_profit() {
    let _ = env_logger::try_init();
    let shutdown = Shutdown::new();
    let (exchange, executor) = setup(&shutdown);

    let report = executor.execute(&long_order(), &constraints()).await.unwrap();
    assert!(report.is_protected());
    assert_eq!(exchange.position(SYMBOL), dec!(0.5));
    assert_eq!(exchange.open_order_count(SYMBOL), 2);

    // Target reached: take-profit fills, stop-loss is orphaned
    exchange.set_last_price(SYMBOL, dec!(2015));
    assert_eq!(exchange.position(SYMBOL), dec!(0));
    assert_eq!(exchange.open_order_count(SYMBOL), 1);

    let summary = report.watchdog.unwrap().await.unwrap();
    assert_eq!(summary.reason, StopReason::Finished);
    assert_eq!(summary.ticks, 3);
    assert_eq!(exchange.open_order_count(SYMBOL), 0);
    assert_eq!(exchange.call_count(PaperCall::CancelAll), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_cancels_once_then_stops_polling() {
    let _ = env_logger::try_init();
    let shutdown = Shutdown::new();
    let (exchange, executor) = setup(&shutdown);

    let report = executor.execute(&long_order(), &constraints()).await.unwrap();
    // Open, transient zero, open, then flat for good
    exchange.script_positions(SYMBOL, [dec!(0.5), dec!(0), dec!(0.5), dec!(0), dec!(0), dec!(0)]);
    exchange.set_position(SYMBOL, dec!(0));

    let summary = report.watchdog.unwrap().await.unwrap();
    assert_eq!(summary.reason, StopReason::Finished);
    assert_eq!(summary.ticks, 6);
    assert_eq!(exchange.call_count(PaperCall::CancelAll), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(exchange.call_count(PaperCall::PositionSize), 6);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_entry_places_nothing() {
    let shutdown = Shutdown::new();
    let (exchange, executor) = setup(&shutdown);
    exchange.fail_next(
        PaperCall::PlaceMarket,
        GatewayError::rejected("51008", "insufficient margin"),
    );

    let err = executor.execute(&long_order(), &constraints()).await.unwrap_err();
    assert_eq!(err.stage(), TradeStage::Entry);
    assert_eq!(exchange.call_count(PaperCall::PlaceLimit), 0);
    assert_eq!(exchange.call_count(PaperCall::PlaceConditional), 0);
    assert!(!executor.launcher().is_watching(SYMBOL));
}

#[tokio::test(start_paused = true)]
async fn test_take_profit_failure_still_watches_position() {
    let shutdown = Shutdown::new();
    let (exchange, executor) = setup(&shutdown);
    exchange.fail_next(
        PaperCall::PlaceLimit,
        GatewayError::rejected("51000", "parameter error"),
    );

    let report = executor.execute(&long_order(), &constraints()).await.unwrap();
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.stage(), TradeStage::TakeProfit);
    assert!(report.stop_loss.is_none());
    assert_eq!(exchange.call_count(PaperCall::PlaceConditional), 0);
    assert!(report.watchdog.is_some());
    assert!(executor.launcher().is_watching(SYMBOL));

    shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_stop_above_moved_market_is_corrected() {
    let shutdown = Shutdown::new();
    let (exchange, executor) = setup(&shutdown);
    // Market slipped below the planned stop between planning and entry
    exchange.set_last_price(SYMBOL, dec!(1990));

    let report = executor.execute(&long_order(), &constraints()).await.unwrap();
    assert!(report.is_protected());
    // 1990 * (1 - 0.003)
    assert_eq!(report.order.stop_price, dec!(1984.03));

    shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_price_failure_keeps_planned_stop() {
    let shutdown = Shutdown::new();
    let (exchange, executor) = setup(&shutdown);
    for _ in 0..3 {
        exchange.fail_next(
            PaperCall::LastPrice,
            GatewayError::transient("timeout", "read timed out"),
        );
    }

    let report = executor.execute(&long_order(), &constraints()).await.unwrap();
    assert!(report.is_protected());
    assert_eq!(report.order.stop_price, dec!(1994));
    assert_eq!(exchange.call_count(PaperCall::LastPrice), 3);

    shutdown.trigger();
}
