// Poll controller - Repeating refresh task per zone
use crate::application::aggregator::ReadingAggregator;
use crate::application::display::{DisplaySink, TemperatureUnit, render};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Clone)]
pub struct PollController {
    aggregator: ReadingAggregator,
    sink: Arc<dyn DisplaySink>,
    unit: TemperatureUnit,
}

impl PollController {
    pub fn new(aggregator: ReadingAggregator, sink: Arc<dyn DisplaySink>, unit: TemperatureUnit) -> Self {
        Self {
            aggregator,
            sink,
            unit,
        }
    }

    pub fn interval(&self) -> Duration {
        self.aggregator.config().poll_interval()
    }

    /// Run one poll cycle against the current time.
    pub async fn poll_once(&self) -> bool {
        self.poll_at(Utc::now()).await
    }

    /// Run one poll cycle as if it were `now`. Returns whether the display
    /// was updated; on failure the previous display is left as it was.
    pub async fn poll_at(&self, now: DateTime<Utc>) -> bool {
        let zone_id = self.aggregator.zone_id();
        let window_start = self.aggregator.window_start(now);

        match self.aggregator.refresh(window_start).await {
            Ok(snapshot) => {
                tracing::info!(
                    zone = zone_id,
                    rows = snapshot.stats.total_rows,
                    unique = snapshot.stats.unique_rows,
                    skipped = snapshot.stats.skipped_rows,
                    "Poll cycle complete"
                );
                render(&snapshot, self.unit, self.sink.as_ref());
                true
            }
            Err(e) => {
                tracing::error!(zone = zone_id, error = %e, "Poll cycle failed, keeping previous display");
                false
            }
        }
    }

    /// Spawn the repeating task: one cycle right away, then one per interval.
    ///
    /// Cycles run inside the task one after another, so a slow query delays
    /// the next tick instead of racing it.
    pub fn start(&self) -> PollHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let controller = self.clone();
        let period = self.interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = controller.poll_once() => {}
                            _ = stop_rx.changed() => break,
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            tracing::debug!(zone = controller.aggregator.zone_id(), "Poll task stopped");
        });

        PollHandle { stop_tx, task }
    }
}

/// Handle to a running poll task. Dropping it stops the task as well.
pub struct PollHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Signal the task to stop; an in-flight query is abandoned.
    pub fn stop(self) -> JoinHandle<()> {
        let _ = self.stop_tx.send(true);
        self.task
    }
}
