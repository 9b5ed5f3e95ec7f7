//! Periodic cluster evaluation for one timeframe

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use swarm_clock::{ScheduledTask, TaskError, TickOutcome};
use swarm_core::Timeframe;

use crate::dispatcher::Dispatcher;

pub struct ClusterLoop {
    dispatcher: Arc<Dispatcher>,
    timeframe: Timeframe,
    name: String,
}

impl ClusterLoop {
    pub fn new(dispatcher: Arc<Dispatcher>, timeframe: Timeframe) -> Self {
        Self {
            dispatcher,
            timeframe,
            name: format!("cluster-{}", timeframe),
        }
    }
}

#[async_trait]
impl ScheduledTask for ClusterLoop {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&mut self) -> Result<TickOutcome, TaskError> {
        if self.dispatcher.detector(self.timeframe).is_none() {
            return Err(TaskError::new(format!(
                "no cluster detector for {}",
                self.timeframe
            )));
        }

        let fired = self.dispatcher.evaluate_clusters(self.timeframe);
        if !fired.is_empty() {
            debug!("[CLUSTER] {} tick fired {} events", self.timeframe, fired.len());
        }
        Ok(TickOutcome::Continue)
    }
}
