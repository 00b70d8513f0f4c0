//! The shared sampling scheduler.
//!
//! One background task drives every actively polled item; per-item timer
//! objects are never allocated, so timer churn stays O(1) regardless of
//! item count. Each tick walks the registered items under the manager
//! lock and runs the due ones through the read/evaluate path.

use crate::manager::MonitorEngine;
use crate::source::AddressSpace;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Handle to the running scheduler.
#[derive(Debug)]
pub struct SamplingScheduler {
    thread: Option<std::thread::JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl SamplingScheduler {
    /// Stops the scheduler and waits for its thread to finish.
    pub fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SamplingScheduler {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Builder for [`SamplingScheduler`].
pub struct SamplingSchedulerBuilder<A: AddressSpace> {
    engine: Arc<MonitorEngine<A>>,
    granularity: Duration,
}

impl<A: AddressSpace + 'static> SamplingSchedulerBuilder<A> {
    /// Starts from the engine's configured minimum sampling interval.
    pub fn new(engine: Arc<MonitorEngine<A>>) -> Self {
        let granularity = engine.config().min_sampling_interval;
        Self {
            engine,
            granularity,
        }
    }

    /// Overrides the tick granularity.
    pub fn granularity(mut self, granularity: Duration) -> Self {
        self.granularity = granularity;
        self
    }

    /// Spawns the scheduler. Must be called from within a tokio runtime.
    pub fn build(self) -> SamplingScheduler {
        let granularity = self.granularity.max(Duration::from_millis(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = self.engine;
        let runtime_handle = tokio::runtime::Handle::current();

        let thread = std::thread::spawn(move || {
            runtime_handle.block_on(async move {
                run_scheduler(engine, shutdown_rx, granularity).await;
            });
        });

        SamplingScheduler {
            thread: Some(thread),
            shutdown: shutdown_tx,
        }
    }
}

async fn run_scheduler<A: AddressSpace>(
    engine: Arc<MonitorEngine<A>>,
    mut shutdown_rx: watch::Receiver<bool>,
    granularity: Duration,
) {
    log::debug!("sampling scheduler started (granularity {granularity:?})");
    let mut ticker = tokio::time::interval(granularity);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    log::debug!("sampling scheduler stopped");
                    return;
                }
            }
            _ = ticker.tick() => {
                engine.sample_due_items(Instant::now(), granularity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SamplingSchedulerBuilder;
    use crate::manager::{EngineConfig, MonitorEngine, MonitoredItemSpec};
    use crate::simulator::{SimulatedAddressSpace, SimulatedNode};
    use crate::source::{NodeId, TargetRef};
    use std::sync::Arc;
    use std::time::Duration;
    use uamon_core::Variant;

    #[tokio::test(flavor = "multi_thread")]
    async fn polls_and_delivers_changes() {
        let _ = env_logger::builder().is_test(true).try_init();
        let space = Arc::new(SimulatedAddressSpace::new());
        let node = NodeId::new(1, 10);
        space.add_node(node, SimulatedNode::analog(Variant::Float(1.0)));

        let engine = Arc::new(MonitorEngine::new(
            space.clone(),
            EngineConfig {
                min_sampling_interval: Duration::from_millis(10),
                ..Default::default()
            },
        ));
        let created = engine
            .create_item(
                TargetRef::value_of(node),
                MonitoredItemSpec {
                    sampling_interval: Duration::from_millis(10),
                    queue_size: 8,
                    ..Default::default()
                },
            )
            .expect("create");
        let (initial, _) = engine.drain(created.id, 16).expect("initial drain");
        assert_eq!(initial.len(), 1);

        let scheduler = SamplingSchedulerBuilder::new(engine.clone()).build();

        space.set_value(node, Variant::Float(2.0));
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        let mut delivered = Vec::new();
        while delivered.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let (notifications, _) = engine.drain(created.id, 16).expect("drain");
            delivered.extend(notifications);
        }
        assert_eq!(delivered.len(), 1, "one significant change expected");
        assert_eq!(delivered[0].value.value, Variant::Float(2.0));

        scheduler.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_halts_polling() {
        let space = Arc::new(SimulatedAddressSpace::new());
        let node = NodeId::new(1, 11);
        space.add_node(node, SimulatedNode::analog(Variant::Float(1.0)));

        let engine = Arc::new(MonitorEngine::new(
            space.clone(),
            EngineConfig {
                min_sampling_interval: Duration::from_millis(10),
                ..Default::default()
            },
        ));
        let created = engine
            .create_item(
                TargetRef::value_of(node),
                MonitoredItemSpec {
                    sampling_interval: Duration::from_millis(10),
                    queue_size: 8,
                    ..Default::default()
                },
            )
            .expect("create");
        engine.drain(created.id, 16).expect("initial drain");

        let scheduler = SamplingSchedulerBuilder::new(engine.clone())
            .granularity(Duration::from_millis(10))
            .build();
        scheduler.stop();

        space.set_value(node, Variant::Float(3.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let (notifications, _) = engine.drain(created.id, 16).expect("drain");
        assert!(notifications.is_empty(), "no polls after stop");
    }
}
