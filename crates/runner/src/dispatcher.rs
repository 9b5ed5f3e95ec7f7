//! Dispatcher
//!
//! The single entry point for signals. The request path only validates,
//! de-duplicates, appends and hands off: cluster evaluation runs on the
//! per-timeframe [`crate::ClusterLoop`] (woken early by new signals) and trades
//! run on the [`crate::TradeWorker`]. Nothing here awaits exchange I/O.
//!
//! ```text
//! ingest(signal)
//!   ├─ validate ──────────────► Rejected
//!   ├─ DedupFilter ───────────► Duplicate
//!   ├─ message ───────────────► outbox
//!   ├─ SignalWindow.append          (not SCALP)
//!   ├─ ConfluenceDetector ────► listener + outbox   (untyped, 3WAVESUP)
//!   ├─ individual trade ──────► trade queue         (untyped, SCALP)
//!   └─ wake cluster loop ─────► Accepted            (untyped, MTF)
//!
//! SCALP alerts skip the windows entirely, so they trade on any timeframe.
//!
//! evaluate_clusters(tf)
//!   SignalWindow.snapshot ──► ClusterDetector ──► NotifyEvent ──► listener + outbox
//!                                             └─► ClusterTrade ──► trade queue
//! ```

use log::{debug, info, warn};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use swarm_core::{
    ConfluenceEvent, NotifyEvent, Signal, SignalKind, Timeframe, Timestamp, TradeIntent,
    TradeOrigin,
};
use swarm_notify::NotificationOutbox;
use swarm_ports::{AuditEvent, Clock, EventListener, Recorder, TradeOutcome};
use swarm_signals::{
    ClusterDetector, ClusterTrade, ConfluenceDetector, DedupFilter, IngestResult, SignalWindow,
    ValidationError,
};
use tokio::sync::{Notify, mpsc};
use tokio::sync::mpsc::error::TrySendError;

use crate::config::{SwarmConfig, TradingConfig};
use crate::payload::{AlertPayload, SymbolStyle};

/// Collaborators the dispatcher reports to
pub struct DispatcherParts {
    pub clock: Arc<dyn Clock>,
    pub listener: Arc<dyn EventListener>,
    pub recorder: Arc<dyn Recorder>,
    pub outbox: Arc<NotificationOutbox>,
    /// `None` when trading is disabled
    pub trades: Option<mpsc::Sender<TradeIntent>>,
}

pub struct Dispatcher {
    clock: Arc<dyn Clock>,
    windows: HashMap<Timeframe, Arc<SignalWindow>>,
    detectors: HashMap<Timeframe, Arc<ClusterDetector>>,
    /// One filter per timeframe so paired timeframes never suppress each other
    dedup: HashMap<Timeframe, DedupFilter>,
    scalp_dedup: DedupFilter,
    confluence: ConfluenceDetector,
    wake: HashMap<Timeframe, Arc<Notify>>,
    listener: Arc<dyn EventListener>,
    recorder: Arc<dyn Recorder>,
    outbox: Arc<NotificationOutbox>,
    trades: Option<mpsc::Sender<TradeIntent>>,
    trading: TradingConfig,
    symbol_style: SymbolStyle,
    last_individual_trade: Mutex<Option<Timestamp>>,
}

impl Dispatcher {
    pub fn new(config: &SwarmConfig, parts: DispatcherParts) -> Self {
        let mut windows = HashMap::new();
        let mut detectors = HashMap::new();
        let mut dedup = HashMap::new();
        let mut wake = HashMap::new();

        for timeframe in config.tracked_timeframes() {
            let clustered = config.cluster_timeframes.contains(&timeframe);
            // The detector counts everything in the snapshot, so a cluster
            // window must span exactly the cluster duration
            let duration = if clustered {
                config.cluster.window
            } else {
                config.confluence.window
            };
            windows.insert(
                timeframe,
                Arc::new(SignalWindow::with_capacity(
                    timeframe,
                    duration,
                    config.window_capacity,
                )),
            );
            dedup.insert(timeframe, DedupFilter::new(config.dedup_window));

            if clustered {
                detectors.insert(
                    timeframe,
                    Arc::new(ClusterDetector::new(timeframe, config.cluster.clone())),
                );
                wake.insert(timeframe, Arc::new(Notify::new()));
            }
        }

        info!(
            "[DISPATCH] tracking {:?}, clusters on {:?}, trading {}",
            windows.keys().collect::<Vec<_>>(),
            detectors.keys().collect::<Vec<_>>(),
            if parts.trades.is_some() { "on" } else { "off" }
        );

        Self {
            clock: parts.clock,
            windows,
            detectors,
            dedup,
            scalp_dedup: DedupFilter::new(config.dedup_window),
            confluence: ConfluenceDetector::new(config.confluence.clone()),
            wake,
            listener: parts.listener,
            recorder: parts.recorder,
            outbox: parts.outbox,
            trades: parts.trades,
            trading: config.trading.clone(),
            symbol_style: config.symbol_style,
            last_individual_trade: Mutex::new(None),
        }
    }

    /// Timeframes with a cluster detector
    pub fn cluster_timeframes(&self) -> Vec<Timeframe> {
        let mut timeframes: Vec<Timeframe> = self.detectors.keys().copied().collect();
        timeframes.sort();
        timeframes
    }

    pub fn window(&self, timeframe: Timeframe) -> Option<&Arc<SignalWindow>> {
        self.windows.get(&timeframe)
    }

    pub fn detector(&self, timeframe: Timeframe) -> Option<&Arc<ClusterDetector>> {
        self.detectors.get(&timeframe)
    }

    /// Handle used to tick the cluster loop of `timeframe` early
    pub fn wake_handle(&self, timeframe: Timeframe) -> Option<Arc<Notify>> {
        self.wake.get(&timeframe).cloned()
    }

    /// Normalize a raw alert body and ingest it
    pub fn ingest_raw(&self, raw: &str) -> IngestResult {
        let now = self.clock.now();
        match AlertPayload::parse(raw).and_then(|p| p.into_signal(now, self.symbol_style)) {
            Ok(signal) => self.ingest(signal),
            Err(reason) => self.reject(reason),
        }
    }

    /// Hand a normalized signal to the core
    pub fn ingest(&self, signal: Signal) -> IngestResult {
        if let Err(reason) = validate(&signal) {
            return self.reject(reason);
        }
        match signal.kind {
            SignalKind::Scalp => self.ingest_scalp(signal),
            _ => self.ingest_windowed(signal),
        }
    }

    fn ingest_windowed(&self, signal: Signal) -> IngestResult {
        let timeframe = signal.timeframe;
        let routed = match signal.kind {
            SignalKind::Cluster => self.detectors.contains_key(&timeframe),
            SignalKind::Waves => !self.confluence.partners_of(timeframe).is_empty(),
            _ => true,
        };
        let window = match self.windows.get(&timeframe) {
            Some(window) if routed => window,
            _ => {
                self.forward_message(&signal);
                return self.reject(ValidationError::UntrackedTimeframe(timeframe.to_string()));
            }
        };

        let now = self.clock.now();
        if let Some(dedup) = self.dedup.get(&timeframe)
            && dedup.check_and_record(&signal, now)
        {
            self.recorder.record(AuditEvent::SignalDuplicate { signal });
            return IngestResult::Duplicate;
        }

        self.forward_message(&signal);
        window.append(signal.clone());
        self.accept(&signal);

        if matches!(signal.kind, SignalKind::Generic | SignalKind::Waves) {
            self.check_confluence(&signal);
        }
        if signal.kind == SignalKind::Generic {
            self.individual_trade(&signal, now);
        }
        if matches!(signal.kind, SignalKind::Generic | SignalKind::Cluster)
            && let Some(wake) = self.wake.get(&timeframe)
        {
            wake.notify_one();
        }
        IngestResult::Accepted
    }

    fn ingest_scalp(&self, signal: Signal) -> IngestResult {
        if signal.entry.is_none() {
            return self.reject(ValidationError::MissingField("entry"));
        }

        let now = self.clock.now();
        if self.scalp_dedup.check_and_record(&signal, now) {
            self.recorder.record(AuditEvent::SignalDuplicate { signal });
            return IngestResult::Duplicate;
        }

        self.forward_message(&signal);
        self.accept(&signal);
        if !self.trading.enabled || !self.trading.individual_enabled {
            debug!("[DISPATCH] scalp on {} not traded: individual trading off", signal.symbol);
        }
        self.individual_trade(&signal, now);
        IngestResult::Accepted
    }

    fn accept(&self, signal: &Signal) {
        debug!(
            "[DISPATCH] accepted {:?} {} {} {}",
            signal.kind, signal.symbol, signal.direction, signal.timeframe
        );
        self.recorder.record(AuditEvent::SignalAccepted {
            signal: signal.clone(),
        });
    }

    fn reject(&self, reason: ValidationError) -> IngestResult {
        warn!("[DISPATCH] signal rejected: {}", reason);
        self.recorder.record(AuditEvent::SignalRejected {
            reason: reason.to_string(),
            at: self.clock.now(),
        });
        IngestResult::Rejected(reason)
    }

    fn forward_message(&self, signal: &Signal) {
        if let Some(message) = &signal.message {
            self.outbox.push(message.clone());
        }
    }

    fn check_confluence(&self, signal: &Signal) {
        for partner in self.confluence.partners_of(signal.timeframe) {
            let Some(window) = self.windows.get(&partner) else {
                continue;
            };
            let snapshot = window.snapshot(self.clock.now());
            if let Some(event) = self.confluence.check(signal, &snapshot) {
                self.emit_confluence(event);
            }
        }
    }

    fn emit_confluence(&self, event: ConfluenceEvent) {
        self.listener.on_confluence_event(&event);
        self.outbox.push(event.to_string());
        self.recorder.record(AuditEvent::Confluence { event });
    }

    fn individual_trade(&self, signal: &Signal, now: Timestamp) {
        if !self.trading.enabled || !self.trading.individual_enabled || signal.entry.is_none() {
            return;
        }

        let side = self.trading.direction_policy.side_for(signal.direction);
        let intent = TradeIntent::from_signal(signal, side, TradeOrigin::Signal, now);

        let cooldown_left = {
            let mut last = self.last_individual_trade.lock();
            let previous: Option<Timestamp> = *last;
            match previous {
                Some(previous) if now - previous < self.trading.individual_cooldown => {
                    Some(self.trading.individual_cooldown - (now - previous))
                }
                _ => {
                    *last = Some(now);
                    None
                }
            }
        };

        if let Some(remaining) = cooldown_left {
            info!(
                "[DISPATCH] {} blocked by trade cooldown ({}s left)",
                signal.symbol,
                remaining.num_seconds()
            );
            self.recorder.record(AuditEvent::TradeAttempt {
                intent,
                outcome: TradeOutcome::Skipped {
                    reason: "trade cooldown".to_string(),
                },
                at: now,
            });
            return;
        }

        self.submit_intent(intent);
    }

    /// Evaluate the cluster condition of `timeframe` now
    ///
    /// Called by the cluster loop; returns the events that fired.
    pub fn evaluate_clusters(&self, timeframe: Timeframe) -> Vec<NotifyEvent> {
        let (Some(window), Some(detector)) =
            (self.windows.get(&timeframe), self.detectors.get(&timeframe))
        else {
            return Vec::new();
        };

        let now = self.clock.now();
        let snapshot = window.snapshot(now);
        if let Some(dedup) = self.dedup.get(&timeframe) {
            dedup.purge(now);
        }
        self.scalp_dedup.purge(now);

        let mut fired = Vec::new();
        for decision in detector.evaluate(&snapshot, now) {
            if let Some(event) = decision.notify {
                self.listener.on_cluster_event(&event);
                self.outbox.push(event.to_string());
                self.recorder.record(AuditEvent::ClusterNotified {
                    event: event.clone(),
                });
                fired.push(event);
            }
            if let Some(trade) = decision.trade {
                let intent = self.cluster_intent(&trade, now);
                self.submit_intent(intent);
            }
        }
        fired
    }

    fn cluster_intent(&self, trade: &ClusterTrade, now: Timestamp) -> TradeIntent {
        let side = self.trading.direction_policy.side_for(trade.direction);
        let origin = TradeOrigin::Cluster {
            symbols: trade.symbols.clone(),
        };

        match &self.trading.cluster_symbol {
            Some(symbol) => TradeIntent {
                symbol: symbol.clone(),
                direction: trade.direction,
                side,
                timeframe: trade.timeframe,
                origin,
                entry: None,
                stop: None,
                target: None,
                created_at: now,
            },
            None => TradeIntent::from_signal(&trade.trigger, side, origin, now),
        }
    }

    fn submit_intent(&self, intent: TradeIntent) {
        self.listener.on_trade_intent(&intent);

        let Some(trades) = &self.trades else {
            debug!("[DISPATCH] trading off, intent on {} dropped", intent.symbol);
            return;
        };

        match trades.try_send(intent) {
            Ok(()) => {}
            Err(TrySendError::Full(intent)) | Err(TrySendError::Closed(intent)) => {
                warn!("[DISPATCH] trade queue unavailable, {} skipped", intent.symbol);
                self.outbox.push(format!(
                    "⏭ TRADE SKIPPED {} {}: trade queue unavailable",
                    intent.symbol, intent.side
                ));
                self.recorder.record(AuditEvent::TradeAttempt {
                    at: self.clock.now(),
                    intent,
                    outcome: TradeOutcome::Skipped {
                        reason: "trade queue unavailable".to_string(),
                    },
                });
            }
        }
    }
}

/// Structural checks the payload layer cannot express
fn validate(signal: &Signal) -> Result<(), ValidationError> {
    if signal.symbol.trim().is_empty() {
        return Err(ValidationError::MissingField("symbol"));
    }

    for (field, price) in [
        ("entry", signal.entry),
        ("stop", signal.stop),
        ("target", signal.target),
    ] {
        if let Some(price) = price
            && price <= Decimal::ZERO
        {
            return Err(ValidationError::InvalidField {
                field,
                value: price.to_string(),
            });
        }
    }

    if let (Some(entry), Some(stop), Some(target)) = (signal.entry, signal.stop, signal.target) {
        let opposite_sides = (stop < entry && target > entry) || (stop > entry && target < entry);
        if !opposite_sides {
            return Err(ValidationError::InconsistentPrices(format!(
                "entry {} stop {} target {}",
                entry, stop, target
            )));
        }
    }
    Ok(())
}
