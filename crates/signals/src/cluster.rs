//! Cluster Detection
//!
//! A cluster exists for a direction when enough *distinct* symbols signalled
//! that direction inside the window. Repeated alerts from one symbol count
//! once.
//!
//! ## Gates
//!
//! Notify fires iff:
//! - `|distinct| >= threshold`
//! - `now - last_notified_at >= notify_cooldown`
//! - `distinct != last_composition` (an unchanged cluster is never re-announced)
//!
//! Trade fires iff, evaluated after notify and with the cluster still holding:
//! - `now - last_traded_at >= trade_cooldown`
//! - `now - last_notified_at >= trade_confirm_delay`
//!
//! Each direction has its own [`ClusterState`] behind its own lock. Decision
//! and commit happen under that lock, so decisions for one direction are
//! totally ordered and two trades cannot be armed concurrently.

use chrono::Duration;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use swarm_core::{Direction, NotifyEvent, Signal, Symbol, Timeframe, Timestamp};

/// Thresholds and cooldowns for one timeframe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterParams {
    /// Minimum number of distinct symbols
    pub threshold: usize,
    /// Rolling window length
    pub window: Duration,
    /// Minimum time between two announcements
    pub notify_cooldown: Duration,
    /// Minimum time between two cluster trades
    pub trade_cooldown: Duration,
    /// Minimum dwell after the last announcement before trading
    pub trade_confirm_delay: Duration,
    /// Whether the trade gate is evaluated at all
    pub trading_enabled: bool,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            threshold: 6,
            window: Duration::minutes(60),
            notify_cooldown: Duration::minutes(5),
            trade_cooldown: Duration::minutes(30),
            trade_confirm_delay: Duration::zero(),
            trading_enabled: false,
        }
    }
}

impl ClusterParams {
    /// Builder: Set threshold
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Builder: Set window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Builder: Set notify cooldown
    pub fn with_notify_cooldown(mut self, cooldown: Duration) -> Self {
        self.notify_cooldown = cooldown;
        self
    }

    /// Builder: Enable the trade gate
    pub fn with_trading(mut self, trade_cooldown: Duration, confirm_delay: Duration) -> Self {
        self.trading_enabled = true;
        self.trade_cooldown = trade_cooldown;
        self.trade_confirm_delay = confirm_delay;
        self
    }
}

/// Per (timeframe, direction) memory of past decisions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterState {
    pub last_notified_at: Option<Timestamp>,
    pub last_traded_at: Option<Timestamp>,
    /// Composition at the last announcement
    pub last_composition: BTreeSet<Symbol>,
}

/// A cluster that passed the trade gate
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTrade {
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub symbols: BTreeSet<Symbol>,
    /// Most recent signal of the cluster
    pub trigger: Signal,
}

/// What happened for one direction on one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterDecision {
    pub direction: Direction,
    pub notify: Option<NotifyEvent>,
    pub trade: Option<ClusterTrade>,
}

impl ClusterDecision {
    pub fn is_empty(&self) -> bool {
        self.notify.is_none() && self.trade.is_none()
    }
}

fn elapsed(since: Option<Timestamp>, now: Timestamp, cooldown: Duration) -> bool {
    match since {
        Some(at) => now - at >= cooldown,
        None => true,
    }
}

/// Cluster detector for one timeframe
pub struct ClusterDetector {
    timeframe: Timeframe,
    params: ClusterParams,
    up: Mutex<ClusterState>,
    down: Mutex<ClusterState>,
}

impl ClusterDetector {
    pub fn new(timeframe: Timeframe, params: ClusterParams) -> Self {
        Self {
            timeframe,
            params,
            up: Mutex::new(ClusterState::default()),
            down: Mutex::new(ClusterState::default()),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    fn state(&self, direction: Direction) -> &Mutex<ClusterState> {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Copy of the current state for a direction
    pub fn state_of(&self, direction: Direction) -> ClusterState {
        self.state(direction).lock().clone()
    }

    /// Distinct symbols per direction, plus the most recent signal for each
    fn partition(snapshot: &[Signal], direction: Direction) -> (BTreeSet<Symbol>, Option<&Signal>) {
        let mut symbols = BTreeSet::new();
        let mut latest: Option<&Signal> = None;
        for signal in snapshot.iter().filter(|s| s.direction == direction) {
            symbols.insert(signal.symbol.clone());
            if latest.is_none_or(|l| signal.received_at >= l.received_at) {
                latest = Some(signal);
            }
        }
        (symbols, latest)
    }

    /// Evaluate a window snapshot at `now`
    ///
    /// Returns one decision per direction that produced a notify or a trade.
    pub fn evaluate(&self, snapshot: &[Signal], now: Timestamp) -> Vec<ClusterDecision> {
        let mut decisions = Vec::new();

        for direction in Direction::ALL {
            let (distinct, latest) = Self::partition(snapshot, direction);
            let Some(latest) = latest else {
                continue;
            };
            if distinct.len() < self.params.threshold {
                continue;
            }

            let decision = self.decide(direction, distinct, latest, now);
            if !decision.is_empty() {
                decisions.push(decision);
            }
        }

        decisions
    }

    fn decide(
        &self,
        direction: Direction,
        distinct: BTreeSet<Symbol>,
        latest: &Signal,
        now: Timestamp,
    ) -> ClusterDecision {
        let mut state = self.state(direction).lock();

        let notify = if elapsed(state.last_notified_at, now, self.params.notify_cooldown)
            && distinct != state.last_composition
        {
            state.last_notified_at = Some(now);
            state.last_composition = distinct.clone();
            info!(
                "[CLUSTER] {} {} fired with {} symbols",
                self.timeframe,
                direction,
                distinct.len()
            );
            Some(NotifyEvent {
                timeframe: self.timeframe,
                direction,
                symbols: distinct.clone(),
                fired_at: now,
            })
        } else {
            debug!(
                "[CLUSTER] {} {} holds with {} symbols, notify suppressed",
                self.timeframe,
                direction,
                distinct.len()
            );
            None
        };

        let trade = match state.last_notified_at {
            Some(notified_at)
                if self.params.trading_enabled
                    && elapsed(state.last_traded_at, now, self.params.trade_cooldown)
                    && now - notified_at >= self.params.trade_confirm_delay =>
            {
                state.last_traded_at = Some(now);
                info!(
                    "[CLUSTER] {} {} armed trade on {}",
                    self.timeframe, direction, latest.symbol
                );
                Some(ClusterTrade {
                    timeframe: self.timeframe,
                    direction,
                    symbols: distinct,
                    trigger: latest.clone(),
                })
            }
            _ => None,
        };

        ClusterDecision {
            direction,
            notify,
            trade,
        }
    }
}
