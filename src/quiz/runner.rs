use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::SessionError;

use super::session::{Finalization, QuizSession, SessionEvent, Transition};
use super::timer::Ticker;

/// Drives a [`QuizSession`] from a single event queue shared by user input and the timer.
#[derive(Debug)]
pub struct SessionRunner {
    session: QuizSession,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionRunner {
    pub fn new(session: QuizSession) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self { session, events_tx, events_rx }
    }

    /// Handle for an input source. The run ends as abandoned once every sender is gone
    /// and no timer is armed.
    pub fn sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.events_tx.clone()
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// Apply events until the session is finalized. `on_event` sees the session after
    /// every event along with the outcome, including rejected input.
    pub async fn run<F>(self, mut on_event: F) -> Result<Finalization, SessionError>
    where
        F: FnMut(&QuizSession, &Result<Transition, SessionError>),
    {
        let SessionRunner { mut session, events_tx, mut events_rx } = self;
        let mut ticker = session
            .has_timer()
            .then(|| Ticker::spawn(events_tx.clone(), Duration::from_secs(1)));
        drop(events_tx);

        while let Some(event) = events_rx.recv().await {
            let outcome = session.apply(event);
            if let Err(e) = &outcome {
                warn!(target: "quizsmith::runner", error = %e, "Input rejected");
            }
            on_event(&session, &outcome);

            if let Ok(Transition::Finalized(finalization)) = outcome {
                if let Some(ticker) = ticker.take() {
                    ticker.stop().await;
                }
                info!(target: "quizsmith::runner", reason = ?finalization.reason, "Session run complete");
                return Ok(finalization);
            }
        }

        warn!(target: "quizsmith::runner", "Event channel closed before finalization");
        Err(SessionError::Abandoned)
    }
}
