use swarm_core::{ConfluenceEvent, NotifyEvent, TradeIntent};

/// Callbacks the core invokes on its caller
///
/// Called from background loops, so implementations must return quickly and
/// hand any I/O off to their own tasks.
pub trait EventListener: Send + Sync {
    fn on_cluster_event(&self, _event: &NotifyEvent) {}

    fn on_trade_intent(&self, _intent: &TradeIntent) {}

    fn on_confluence_event(&self, _event: &ConfluenceEvent) {}
}

/// Listener that ignores everything
pub struct NoopListener;

impl EventListener for NoopListener {}
