use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::dto::quiz_dto::SessionView;
use crate::error::{Error, Result};
use crate::models::answer::AnswerValue;
use crate::models::question::Quiz;
use crate::services::lockdown_service::{LockdownMonitor, RemoteProctor, Tick, TokioCountdown};
use crate::services::quiz_session::QuizSession;
use crate::services::report_service::{ReportService, ScoreReport};

const COMMAND_BUFFER: usize = 32;

enum Command {
    View(oneshot::Sender<SessionView>),
    Select(AnswerValue, oneshot::Sender<Result<SessionView>>),
    Advance(oneshot::Sender<Result<SessionView>>),
    Submit(oneshot::Sender<Result<ScoreReport>>),
    Visibility(bool, oneshot::Sender<SessionView>),
    Close,
}

struct Entry {
    commands: mpsc::Sender<Command>,
    last_seen: Instant,
}

/// Live quiz sessions, one tokio task each.
///
/// A session task owns its [`QuizSession`] and applies commands and countdown
/// ticks one at a time, so a session never sees concurrent mutation.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Entry>>>,
    warning_seconds: u32,
    tick_period: Duration,
}

impl SessionRegistry {
    pub fn new(warning_seconds: u32, tick_period: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            warning_seconds,
            tick_period,
        }
    }

    /// Starts a session for `quiz`. With `require_lockdown`, a host that
    /// cannot lock is refused instead of running unwatched.
    pub fn create(
        &self,
        quiz: Quiz,
        lockdown_supported: bool,
        require_lockdown: bool,
    ) -> Result<SessionView> {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let monitor = LockdownMonitor::new(
            Box::new(RemoteProctor::new(lockdown_supported)),
            Box::new(TokioCountdown::new(self.tick_period, tick_tx)),
            self.warning_seconds,
        );
        if require_lockdown {
            monitor.ensure_supported()?;
        }
        let mut session = QuizSession::new(monitor);
        session.load(quiz)?;

        let id = session.id();
        let view = SessionView::from_session(&session);
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run_session(session, rx, tick_rx));

        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .insert(
                id,
                Entry {
                    commands: tx,
                    last_seen: Instant::now(),
                },
            );
        Ok(view)
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView> {
        self.request(id, Command::View).await
    }

    pub async fn select(&self, id: Uuid, answer: AnswerValue) -> Result<SessionView> {
        self.request(id, |reply| Command::Select(answer, reply))
            .await?
    }

    pub async fn advance(&self, id: Uuid) -> Result<SessionView> {
        self.request(id, Command::Advance).await?
    }

    pub async fn submit(&self, id: Uuid) -> Result<ScoreReport> {
        self.request(id, Command::Submit).await?
    }

    pub async fn set_visibility(&self, id: Uuid, visible: bool) -> Result<SessionView> {
        self.request(id, |reply| Command::Visibility(visible, reply))
            .await
    }

    /// The client navigated away: stop the session task, which cancels any
    /// countdown and releases the lock.
    pub async fn close(&self, id: Uuid) -> Result<()> {
        let entry = self
            .sessions
            .lock()
            .expect("session registry mutex poisoned")
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Quiz session {} not found", id)))?;
        let _ = entry.commands.send(Command::Close).await;
        Ok(())
    }

    /// Closes sessions nobody has touched for `ttl`. Returns how many.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let expired: Vec<(Uuid, Entry)> = {
            let mut sessions = self
                .sessions
                .lock()
                .expect("session registry mutex poisoned");
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, e)| e.last_seen.elapsed() >= ttl)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|e| (id, e)))
                .collect()
        };

        for (id, entry) in &expired {
            tracing::info!(session_id = %id, "Closing idle quiz session");
            let _ = entry.commands.send(Command::Close).await;
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn request<T>(
        &self,
        id: Uuid,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let sender = {
            let mut sessions = self
                .sessions
                .lock()
                .expect("session registry mutex poisoned");
            let entry = sessions
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("Quiz session {} not found", id)))?;
            entry.last_seen = Instant::now();
            entry.commands.clone()
        };

        let (tx, rx) = oneshot::channel();
        sender
            .send(command(tx))
            .await
            .map_err(|_| Error::NotFound(format!("Quiz session {} has ended", id)))?;
        rx.await
            .map_err(|_| Error::Internal(format!("Quiz session {} stopped responding", id)))
    }
}

async fn run_session(
    mut session: QuizSession,
    mut commands: mpsc::Receiver<Command>,
    mut ticks: mpsc::UnboundedReceiver<Tick>,
) {
    let id = session.id();
    loop {
        tokio::select! {
            // ticks first: an expiring countdown beats a queued answer
            biased;
            Some(tick) = ticks.recv() => {
                session.on_tick(tick);
            }
            command = commands.recv() => {
                match command {
                    Some(Command::Close) | None => break,
                    Some(command) => handle(&mut session, command),
                }
            }
        }
    }
    session.close();
    tracing::debug!(session_id = %id, "Quiz session task stopped");
}

fn handle(session: &mut QuizSession, command: Command) {
    match command {
        Command::View(reply) => {
            let _ = reply.send(SessionView::from_session(session));
        }
        Command::Select(answer, reply) => {
            let result = session
                .select(answer)
                .map(|_| ())
                .map(|()| SessionView::from_session(session));
            let _ = reply.send(result);
        }
        Command::Advance(reply) => {
            let result = session
                .advance()
                .map(|_| SessionView::from_session(session));
            let _ = reply.send(result);
        }
        Command::Submit(reply) => {
            let result = session.submit().map(|result| {
                ReportService::build(session.title(), session.questions(), &result)
            });
            let _ = reply.send(result);
        }
        Command::Visibility(visible, reply) => {
            if visible {
                session.visibility_restored();
            } else {
                session.visibility_lost();
            }
            let _ = reply.send(SessionView::from_session(session));
        }
        Command::Close => {}
    }
}
