//! Paper Exchange
//!
//! In-memory [`ExchangeGateway`] for dry runs and tests.
//!
//! - Market orders fill immediately at the last price
//! - Limit orders rest until price crosses them (marketable ones fill at once)
//! - Conditional orders rest until their trigger fires; a trigger that is
//!   already satisfied at placement is rejected
//! - Reduce-only fills never flip or grow a position
//! - Position readings can be scripted per symbol, and the next call of any
//!   kind can be made to fail
//!
//! All state sits behind one short synchronous lock that is never held across
//! an `.await`.

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use swarm_core::{
    Candle, ConditionalOrder, InstrumentConstraints, LimitOrder, MarketOrder, OrderAck, Price,
    Quantity, Side, Symbol, Timeframe, TriggerDirection,
};
use swarm_ports::{ExchangeGateway, GatewayError, GatewayResult};

/// Calls kept in the log unless overridden with
/// [`PaperExchange::with_call_log_limit`]
pub const CALL_LOG_LIMIT: usize = 1024;

/// Kinds of gateway call, for failure injection and the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperCall {
    PlaceMarket,
    PlaceLimit,
    PlaceConditional,
    CancelAll,
    PositionSize,
    LastPrice,
    Candles,
    Constraints,
}

#[derive(Debug, Clone)]
enum RestingKind {
    Limit { price: Price },
    Conditional {
        trigger_price: Price,
        direction: TriggerDirection,
    },
}

#[derive(Debug, Clone)]
struct RestingOrder {
    exchange_order_id: String,
    symbol: Symbol,
    side: Side,
    quantity: Quantity,
    reduce_only: bool,
    kind: RestingKind,
}

impl RestingOrder {
    fn is_triggered(&self, price: Price) -> bool {
        match &self.kind {
            RestingKind::Limit { price: limit } => match self.side {
                Side::Buy => price <= *limit,
                Side::Sell => price >= *limit,
            },
            RestingKind::Conditional {
                trigger_price,
                direction,
            } => direction.is_triggered(price, *trigger_price),
        }
    }
}

#[derive(Default)]
struct PaperState {
    prices: HashMap<Symbol, Price>,
    constraints: HashMap<Symbol, InstrumentConstraints>,
    candles: HashMap<Symbol, Vec<Candle>>,
    /// Signed position (positive = long)
    positions: HashMap<Symbol, Quantity>,
    /// Readings served by `get_position_size` before the real position
    scripted_positions: HashMap<Symbol, VecDeque<Quantity>>,
    resting: Vec<RestingOrder>,
    failures: HashMap<PaperCall, VecDeque<GatewayError>>,
    /// Most recent calls, oldest first
    calls: VecDeque<(PaperCall, Symbol)>,
    call_counts: HashMap<PaperCall, usize>,
    call_log_limit: Option<usize>,
    next_id: u64,
}

impl PaperState {
    fn enter(&mut self, call: PaperCall, symbol: &str) -> GatewayResult<()> {
        *self.call_counts.entry(call).or_default() += 1;
        let limit = self.call_log_limit.unwrap_or(CALL_LOG_LIMIT);
        if limit > 0 {
            while self.calls.len() >= limit {
                self.calls.pop_front();
            }
            self.calls.push_back((call, symbol.to_string()));
        }
        if let Some(error) = self.failures.get_mut(&call).and_then(|q| q.pop_front()) {
            debug!("[PAPER] injected failure on {:?} {}: {}", call, symbol, error);
            return Err(error);
        }
        Ok(())
    }

    fn next_order_id(&mut self) -> String {
        self.next_id += 1;
        format!("paper-{}", self.next_id)
    }

    fn fill(&mut self, symbol: &str, side: Side, quantity: Quantity, reduce_only: bool) -> Quantity {
        let position = self.positions.entry(symbol.to_string()).or_insert(Decimal::ZERO);
        let signed = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };

        let applied = if reduce_only {
            // Only the part that moves the position toward zero
            let reducing = (side == Side::Sell && *position > Decimal::ZERO)
                || (side == Side::Buy && *position < Decimal::ZERO);
            if !reducing {
                return Decimal::ZERO;
            }
            let capped = quantity.min(position.abs());
            if side == Side::Buy { capped } else { -capped }
        } else {
            signed
        };

        *position += applied;
        applied.abs()
    }

    fn trigger_resting(&mut self, symbol: &str, price: Price) {
        let (fired, kept): (Vec<RestingOrder>, Vec<RestingOrder>) = std::mem::take(&mut self.resting)
            .into_iter()
            .partition(|o| o.symbol == symbol && o.is_triggered(price));
        self.resting = kept;

        for order in fired {
            let filled = self.fill(&order.symbol, order.side, order.quantity, order.reduce_only);
            info!(
                "[PAPER] {} {} {} fired at {} (filled {})",
                order.exchange_order_id, order.symbol, order.side, price, filled
            );
        }
    }
}

/// In-memory exchange
#[derive(Default)]
pub struct PaperExchange {
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Register an instrument with its constraints and price
    pub fn with_instrument(
        self,
        symbol: impl Into<Symbol>,
        constraints: InstrumentConstraints,
        last_price: Price,
    ) -> Self {
        let symbol = symbol.into();
        {
            let mut state = self.state.lock();
            state.constraints.insert(symbol.clone(), constraints);
            state.prices.insert(symbol, last_price);
        }
        self
    }

    /// Builder: Keep at most `limit` calls in the log (zero disables it)
    pub fn with_call_log_limit(self, limit: usize) -> Self {
        self.state.lock().call_log_limit = Some(limit);
        self
    }

    /// Register `symbol` unless it is already known
    pub fn ensure_instrument(&self, symbol: &str, constraints: InstrumentConstraints) {
        self.state
            .lock()
            .constraints
            .entry(symbol.to_string())
            .or_insert(constraints);
    }

    /// Move the last price and fire any resting order it crosses
    pub fn set_last_price(&self, symbol: &str, price: Price) {
        let mut state = self.state.lock();
        state.prices.insert(symbol.to_string(), price);
        state.trigger_resting(symbol, price);
    }

    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.state.lock().candles.insert(symbol.to_string(), candles);
    }

    /// Force the signed position, bypassing orders
    pub fn set_position(&self, symbol: &str, quantity: Quantity) {
        self.state.lock().positions.insert(symbol.to_string(), quantity);
    }

    /// Queue position readings served before the real position
    pub fn script_positions(&self, symbol: &str, readings: impl IntoIterator<Item = Quantity>) {
        self.state
            .lock()
            .scripted_positions
            .entry(symbol.to_string())
            .or_default()
            .extend(readings);
    }

    /// Make the next call of `call` fail with `error`
    pub fn fail_next(&self, call: PaperCall, error: GatewayError) {
        self.state.lock().failures.entry(call).or_default().push_back(error);
    }

    /// Signed position on `symbol`
    pub fn position(&self, symbol: &str) -> Quantity {
        self.state
            .lock()
            .positions
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Number of resting orders on `symbol`
    pub fn open_order_count(&self, symbol: &str) -> usize {
        self.state
            .lock()
            .resting
            .iter()
            .filter(|o| o.symbol == symbol)
            .count()
    }

    /// The most recent calls, oldest first
    pub fn calls(&self) -> Vec<(PaperCall, Symbol)> {
        self.state.lock().calls.iter().cloned().collect()
    }

    /// How many times `call` was made since creation
    pub fn call_count(&self, call: PaperCall) -> usize {
        self.state.lock().call_counts.get(&call).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ExchangeGateway for PaperExchange {
    async fn place_market_order(&self, order: &MarketOrder) -> GatewayResult<OrderAck> {
        let mut state = self.state.lock();
        state.enter(PaperCall::PlaceMarket, &order.symbol)?;

        if order.quantity <= Decimal::ZERO {
            return Err(GatewayError::rejected("51000", "quantity must be positive"));
        }
        let Some(price) = state.prices.get(&order.symbol).copied() else {
            return Err(GatewayError::rejected("51001", format!("no price for {}", order.symbol)));
        };

        state.fill(&order.symbol, order.side, order.quantity, false);
        let exchange_order_id = state.next_order_id();
        info!(
            "[PAPER] market {} {} {} filled at {}",
            order.symbol, order.side, order.quantity, price
        );
        Ok(OrderAck {
            client_order_id: order.client_order_id.clone(),
            exchange_order_id,
        })
    }

    async fn place_limit_order(&self, order: &LimitOrder) -> GatewayResult<OrderAck> {
        let mut state = self.state.lock();
        state.enter(PaperCall::PlaceLimit, &order.symbol)?;

        if order.quantity <= Decimal::ZERO || order.price <= Decimal::ZERO {
            return Err(GatewayError::rejected("51000", "invalid limit order"));
        }

        let exchange_order_id = state.next_order_id();
        state.resting.push(RestingOrder {
            exchange_order_id: exchange_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            reduce_only: order.reduce_only,
            kind: RestingKind::Limit { price: order.price },
        });
        if let Some(price) = state.prices.get(&order.symbol).copied() {
            state.trigger_resting(&order.symbol, price);
        }

        Ok(OrderAck {
            client_order_id: order.client_order_id.clone(),
            exchange_order_id,
        })
    }

    async fn place_conditional_order(&self, order: &ConditionalOrder) -> GatewayResult<OrderAck> {
        let mut state = self.state.lock();
        state.enter(PaperCall::PlaceConditional, &order.symbol)?;

        if order.quantity <= Decimal::ZERO || order.trigger_price <= Decimal::ZERO {
            return Err(GatewayError::rejected("51000", "invalid conditional order"));
        }
        if let Some(price) = state.prices.get(&order.symbol).copied()
            && order.trigger_direction.is_triggered(price, order.trigger_price)
        {
            return Err(GatewayError::rejected(
                "51277",
                format!(
                    "trigger {} already crossed by last price {}",
                    order.trigger_price, price
                ),
            ));
        }

        let exchange_order_id = state.next_order_id();
        state.resting.push(RestingOrder {
            exchange_order_id: exchange_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            reduce_only: order.reduce_only,
            kind: RestingKind::Conditional {
                trigger_price: order.trigger_price,
                direction: order.trigger_direction,
            },
        });

        Ok(OrderAck {
            client_order_id: order.client_order_id.clone(),
            exchange_order_id,
        })
    }

    async fn cancel_all_orders(&self, symbol: &str) -> GatewayResult<()> {
        let mut state = self.state.lock();
        state.enter(PaperCall::CancelAll, symbol)?;
        let before = state.resting.len();
        state.resting.retain(|o| o.symbol != symbol);
        info!(
            "[PAPER] cancelled {} orders on {}",
            before - state.resting.len(),
            symbol
        );
        Ok(())
    }

    async fn get_position_size(&self, symbol: &str) -> GatewayResult<Quantity> {
        let mut state = self.state.lock();
        state.enter(PaperCall::PositionSize, symbol)?;
        if let Some(reading) = state
            .scripted_positions
            .get_mut(symbol)
            .and_then(|q| q.pop_front())
        {
            return Ok(reading.abs());
        }
        Ok(state
            .positions
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO)
            .abs())
    }

    async fn get_last_price(&self, symbol: &str) -> GatewayResult<Price> {
        let mut state = self.state.lock();
        state.enter(PaperCall::LastPrice, symbol)?;
        state
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| GatewayError::rejected("51001", format!("no price for {}", symbol)))
    }

    async fn get_candles(
        &self,
        symbol: &str,
        _interval: Timeframe,
        limit: usize,
    ) -> GatewayResult<Vec<Candle>> {
        let mut state = self.state.lock();
        state.enter(PaperCall::Candles, symbol)?;
        let candles = state.candles.get(symbol).cloned().unwrap_or_default();
        let skip = candles.len().saturating_sub(limit);
        Ok(candles.into_iter().skip(skip).collect())
    }

    async fn get_instrument_constraints(
        &self,
        symbol: &str,
    ) -> GatewayResult<InstrumentConstraints> {
        let mut state = self.state.lock();
        state.enter(PaperCall::Constraints, symbol)?;
        state
            .constraints
            .get(symbol)
            .cloned()
            .ok_or_else(|| GatewayError::rejected("51001", format!("unknown instrument {}", symbol)))
    }

    fn name(&self) -> &str {
        "PaperExchange"
    }
}
