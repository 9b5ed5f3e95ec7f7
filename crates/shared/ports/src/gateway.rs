use async_trait::async_trait;
use swarm_core::{
    Candle, ConditionalOrder, InstrumentConstraints, LimitOrder, MarketOrder, OrderAck, Price,
    Quantity, Timeframe,
};

use crate::error::GatewayResult;

/// Port to the external exchange
///
/// Every call may fail with a structured [`crate::GatewayError`]; none of them
/// fail silently. Implementations must not retry internally: retrying is the
/// caller's policy.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Submit a market order
    async fn place_market_order(&self, order: &MarketOrder) -> GatewayResult<OrderAck>;

    /// Submit a limit order
    async fn place_limit_order(&self, order: &LimitOrder) -> GatewayResult<OrderAck>;

    /// Submit a trigger-based order
    async fn place_conditional_order(&self, order: &ConditionalOrder) -> GatewayResult<OrderAck>;

    /// Cancel every regular and conditional order resting on `symbol`
    async fn cancel_all_orders(&self, symbol: &str) -> GatewayResult<()>;

    /// Absolute size of the open position on `symbol` (zero when flat)
    async fn get_position_size(&self, symbol: &str) -> GatewayResult<Quantity>;

    /// Last traded price
    async fn get_last_price(&self, symbol: &str) -> GatewayResult<Price>;

    /// Recent candles; ordering is not guaranteed
    async fn get_candles(
        &self,
        symbol: &str,
        interval: Timeframe,
        limit: usize,
    ) -> GatewayResult<Vec<Candle>>;

    /// Lot step, minimum size and contract value for `symbol`
    async fn get_instrument_constraints(&self, symbol: &str)
    -> GatewayResult<InstrumentConstraints>;

    /// Gateway name for logging
    fn name(&self) -> &str {
        "ExchangeGateway"
    }
}
