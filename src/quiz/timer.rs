use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

use super::session::SessionEvent;

/// Delivers [`SessionEvent::Tick`] into a session's event channel once per period.
///
/// The ticker never touches session state itself; ticks are queued behind user input and
/// applied by whoever drains the channel. Stopping or dropping the ticker ends the task,
/// after which no further tick is sent.
#[derive(Debug)]
pub struct Ticker {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn on the current tokio runtime. The first tick fires one `period` from now.
    pub fn spawn(events: mpsc::UnboundedSender<SessionEvent>, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut tick = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = tick.tick() => {
                        if events.send(SessionEvent::Tick).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(target: "quizsmith::timer", "Ticker stopped");
        });
        debug!(target: "quizsmith::timer", period_ms = period.as_millis() as u64, "Ticker armed");
        Self { shutdown, handle: Some(handle) }
    }

    /// Stop the ticker and wait for its task to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
