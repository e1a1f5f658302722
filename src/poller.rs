//! Change notification for input pins by polling.
//!
//! The expander's INT lines are not wired to the host, so the interrupt flags
//! are sampled on a fixed interval instead. A change is seen at most one
//! interval late, and a pin that toggles twice between two ticks looks
//! unchanged.
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::Pollable;

/// The state a poll task ticks against.
pub(crate) trait PollTarget: Send + Sync {
    /// Run one tick on behalf of the task started as `generation`.
    ///
    /// Returns `false` once that task is no longer wanted.
    fn tick(&self, generation: u64) -> bool;
}

/// A running poll task and the token that ends it.
struct PollTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// `{Stopped, Running}` state machine around one poll task.
///
/// Without a tokio runtime the state machine still runs but nothing is
/// scheduled; ticks then have to be driven by hand with
/// [`Mcp23s17::poll`](crate::Mcp23s17::poll).
pub struct InterruptPoller {
    interval: Duration,
    runtime: Option<Handle>,
    target: Option<Weak<dyn PollTarget>>,
    generation: u64,
    running: bool,
    task: Option<PollTask>,
}

impl InterruptPoller {
    pub(crate) fn new(interval: Duration, runtime: Option<Handle>) -> Self {
        Self {
            interval,
            runtime,
            target: None,
            generation: 0,
            running: false,
            task: None,
        }
    }

    pub(crate) fn attach(&mut self, target: Weak<dyn PollTarget>) {
        self.target = Some(target);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True while a background task is ticking.
    pub fn is_scheduled(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.handle.is_finished())
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }
}

impl Pollable for InterruptPoller {
    fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.generation = self.generation.wrapping_add(1);

        match (&self.runtime, &self.target) {
            (Some(runtime), Some(target)) => {
                let (stop, stop_rx) = oneshot::channel();
                let handle = runtime.spawn(run(
                    target.clone(),
                    self.generation,
                    self.interval,
                    stop_rx,
                ));
                self.task = Some(PollTask { stop, handle });
                info!(interval = ?self.interval, "interrupt poller started");
            }
            _ => debug!("interrupt poller running without a runtime, ticks are manual"),
        }
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.generation = self.generation.wrapping_add(1);

        if let Some(task) = self.task.take() {
            // Err means the task already ended on its own.
            let _ = task.stop.send(());
            info!("interrupt poller stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Drop for InterruptPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    target: Weak<dyn PollTarget>,
    generation: u64,
    interval: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    // A tick only gets scheduled after the previous one returned.
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let Some(target) = target.upgrade() else {
                    break;
                };
                if !target.tick(generation) {
                    break;
                }
            }
        }
    }
    debug!(generation, "poll task finished");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Counter {
        ticks: AtomicUsize,
        poller: Mutex<Option<u64>>,
    }

    impl PollTarget for Counter {
        fn tick(&self, generation: u64) -> bool {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            *self.poller.lock().unwrap() == Some(generation)
        }
    }

    #[test]
    fn start_stop_without_runtime() {
        let mut poller = InterruptPoller::new(Duration::from_millis(50), None);
        assert!(!poller.is_running());

        poller.start();
        poller.start();
        assert!(poller.is_running());
        assert!(!poller.is_scheduled());

        poller.stop();
        poller.stop();
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let counter = Arc::new(Counter {
            ticks: AtomicUsize::new(0),
            poller: Mutex::new(None),
        });
        let mut poller =
            InterruptPoller::new(Duration::from_millis(50), Some(Handle::current()));
        let target: Arc<dyn PollTarget> = counter.clone();
        poller.attach(Arc::downgrade(&target));

        poller.start();
        *counter.poller.lock().unwrap() = Some(poller.generation);
        assert!(poller.is_scheduled());

        time::sleep(Duration::from_millis(40)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(120)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 3);

        poller.stop();
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_ends_task() {
        let counter = Arc::new(Counter {
            ticks: AtomicUsize::new(0),
            poller: Mutex::new(None),
        });
        let mut poller =
            InterruptPoller::new(Duration::from_millis(50), Some(Handle::current()));
        let target: Arc<dyn PollTarget> = counter.clone();
        poller.attach(Arc::downgrade(&target));

        // target never acknowledges the generation, the first tick ends the task
        poller.start();
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), 1);
        assert!(!poller.is_scheduled());
    }
}
