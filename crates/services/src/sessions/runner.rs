use std::error::Error as _;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use quiz_core::model::{RawQuestion, SessionOutcome};

use super::service::{QuizSession, Transition};
use super::view::SessionSnapshot;
use super::workflow::QuizLoopService;
use crate::error::SessionError;

const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 32;

/// Player input forwarded to the session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizCommand {
    Answer(usize),
    Retry,
    Close,
}

/// Notifications that are not visible in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    Finished(SessionOutcome),
    PersistenceFailed { score: u32, message: String },
    Rejected { message: String },
}

/// Client side of a running quiz.
#[derive(Debug)]
pub struct QuizHandle {
    commands: mpsc::Sender<QuizCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: mpsc::Receiver<QuizEvent>,
    task: JoinHandle<()>,
}

impl QuizHandle {
    /// # Errors
    ///
    /// Returns `SessionError::RunnerStopped` if the session task has ended.
    pub async fn answer(&self, selected: usize) -> Result<(), SessionError> {
        self.send(QuizCommand::Answer(selected)).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::RunnerStopped` if the session task has ended.
    pub async fn retry(&self) -> Result<(), SessionError> {
        self.send(QuizCommand::Retry).await
    }

    async fn send(&self, command: QuizCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::RunnerStopped)
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every published snapshot from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Next notification, or `None` once the task has ended and the queue is drained.
    ///
    /// At most a fixed number of notifications are queued; later ones are dropped until
    /// the client catches up.
    pub async fn next_event(&mut self) -> Option<QuizEvent> {
        self.events.recv().await
    }

    /// Stop the session task and wait for it to exit.
    pub async fn close(self) {
        let _ = self.commands.send(QuizCommand::Close).await;
        if let Err(err) = self.task.await {
            warn!(error = %err, "quiz task ended abnormally");
        }
    }
}

/// Runs one quiz session on a dedicated task.
///
/// Commands and timer transitions are handled by the same task, one at a time, so a
/// locked question can never be locked again by a late tick or a late answer.
pub struct QuizRunner;

impl QuizRunner {
    /// Start a session over `bank` and spawn the task driving it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuestionBank` before anything is spawned.
    pub fn spawn(
        service: QuizLoopService,
        bank: Vec<RawQuestion>,
    ) -> Result<QuizHandle, SessionError> {
        let session = service.start_session(bank)?;
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let task = tokio::spawn(run(service, session, command_rx, snapshot_tx, event_tx));

        Ok(QuizHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events: event_rx,
            task,
        })
    }
}

async fn run(
    service: QuizLoopService,
    mut session: QuizSession,
    mut commands: mpsc::Receiver<QuizCommand>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: mpsc::Sender<QuizEvent>,
) {
    loop {
        let transition = tokio::select! {
            biased;
            command = commands.recv() => {
                match command {
                    None | Some(QuizCommand::Close) => break,
                    Some(QuizCommand::Answer(selected)) => {
                        if let Err(err) = session.answer(selected) {
                            reject(&events, &err);
                        }
                    }
                    Some(QuizCommand::Retry) => {
                        if let Err(err) = service.retry(&mut session) {
                            reject(&events, &err);
                        }
                    }
                }
                None
            }
            transition = session.wait_timer() => Some(transition),
        };

        match transition {
            Some(Ok(Transition::Finished(outcome))) => {
                // Runs to completion outside the select so a command cannot cut the write short.
                if let Err(err) = service.finalize_score(&mut session).await {
                    publish(
                        &events,
                        QuizEvent::PersistenceFailed {
                            score: outcome.score(),
                            message: error_chain(&err),
                        },
                    );
                }
                publish(&events, QuizEvent::Finished(outcome));
            }
            Some(Err(err)) => warn!(error = %err, "quiz transition failed"),
            Some(Ok(_)) | None => {}
        }

        snapshots.send_replace(session.snapshot());
    }

    session.close();
    debug!("quiz task stopped");
}

fn reject(events: &mpsc::Sender<QuizEvent>, err: &SessionError) {
    debug!(error = %err, "quiz command rejected");
    publish(
        events,
        QuizEvent::Rejected {
            message: err.to_string(),
        },
    );
}

fn publish(events: &mpsc::Sender<QuizEvent>, event: QuizEvent) {
    match events.try_send(event) {
        Ok(()) | Err(TrySendError::Closed(_)) => {}
        Err(TrySendError::Full(event)) => warn!(?event, "quiz event queue full, dropping event"),
    }
}

fn error_chain(err: &SessionError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiz_core::model::QuizSettings;
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryScoreStore;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unread_events_are_capped() {
        let settings = QuizSettings::new(600, 1_000, 5).unwrap();
        let service =
            QuizLoopService::new(fixed_clock(), settings, Arc::new(InMemoryScoreStore::new()))
                .with_seed(Some(1));
        let bank = vec![RawQuestion::with_correct_text("Q", ["a", "b"], "a")];
        let handle = QuizRunner::spawn(service, bank).unwrap();

        for _ in 0..EVENT_BUFFER + 10 {
            handle.retry().await.unwrap();
        }

        let QuizHandle {
            commands,
            mut events,
            task,
            ..
        } = handle;
        drop(commands);
        task.await.unwrap();

        let mut queued = 0;
        while let Some(event) = events.recv().await {
            assert!(matches!(event, QuizEvent::Rejected { .. }));
            queued += 1;
        }
        assert_eq!(queued, EVENT_BUFFER);
    }
}
