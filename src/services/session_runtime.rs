//! Hosts each [`GameSession`] on its own tokio task.
//!
//! The task owns the state machine and is the only code touching it; player
//! commands and timer callbacks arrive on one mpsc channel and are applied in
//! arrival order. Updates are fanned out on the session's [`SseHub`]. Terminal
//! results are handed to the [`LeaderboardGateway`] on a detached task so a
//! slow leaderboard never stalls play.
//!
//! A task that receives no command for [`SessionContext::idle_ttl`] stops on
//! its own. Running timers deliver commands, so only idle or finished
//! sessions expire.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::FaceCatalog,
    dto::{
        session::SessionSnapshot,
        sse::{ScoreSubmitFailedEvent, ScoreSubmittedEvent, ServerEvent},
    },
    error::ServiceError,
    game::{
        DeckSource, Difficulty, GameResult, GameRules, GameSession, Scheduler, SessionError,
        SessionEvent, SessionUpdate, TimerId, TimerKind,
    },
    gateway::LeaderboardGateway,
    state::SseHub,
};

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<T>;

/// Messages processed by a session task.
pub enum SessionCommand {
    /// Apply a player command.
    Apply {
        /// Command to apply.
        event: SessionEvent,
        /// Receives the outcome.
        reply: Reply<Result<Vec<SessionUpdate>, SessionError>>,
    },
    /// Capture the current view.
    Snapshot {
        /// Receives the outcome.
        reply: Reply<SessionSnapshot>,
    },
    /// A scheduled callback fired.
    Timer {
        /// Handle the callback was scheduled under.
        id: TimerId,
        /// What the callback is for.
        kind: TimerKind,
    },
    /// Stop the task.
    Shutdown,
}

/// Real-time [`Scheduler`]: one sleeping task per timer, aborted on cancel.
///
/// Holds only a weak sender so pending timers never keep a dropped session
/// alive.
pub struct TokioScheduler {
    commands: mpsc::WeakSender<SessionCommand>,
    next_id: u64,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Scheduler delivering callbacks on `commands`.
    pub fn new(commands: mpsc::WeakSender<SessionCommand>) -> Self {
        Self {
            commands,
            next_id: 0,
            timers: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> std::time::Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerId {
        self.timers.retain(|_, handle| !handle.is_finished());

        let id = TimerId::new(self.next_id);
        self.next_id += 1;

        let commands = self.commands.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(SessionCommand::Timer { id, kind }).await;
            }
        });
        self.timers.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

/// Cloneable handle to a running session task.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::Sender<SessionCommand>,
    events: Arc<SseHub>,
}

impl SessionHandle {
    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Hub broadcasting the session's updates.
    pub fn events(&self) -> &SseHub {
        &self.events
    }

    /// Apply a player command and wait for the updates it produced.
    pub async fn apply(&self, event: SessionEvent) -> Result<Vec<SessionUpdate>, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Apply { event, reply }).await?;
        let result = rx.await.map_err(|_| self.gone())?;
        Ok(result?)
    }

    /// Current view of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.gone())
    }

    /// Ask the task to stop. Pending timers are aborted with it.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, command: SessionCommand) -> Result<(), ServiceError> {
        self.commands.send(command).await.map_err(|_| self.gone())
    }

    fn gone(&self) -> ServiceError {
        ServiceError::SessionGone(self.id.to_string())
    }
}

/// Called with the session id once its task has stopped.
pub type StopHook = Arc<dyn Fn(Uuid) + Send + Sync>;

/// Everything a session task needs besides its deck source.
#[derive(Clone)]
pub struct SessionContext {
    /// Game tunables the session is built with.
    pub rules: GameRules,
    /// Images resolved into snapshots.
    pub faces: FaceCatalog,
    /// Destination of finished results.
    pub gateway: Arc<dyn LeaderboardGateway>,
    /// Quiet period after which the task stops.
    pub idle_ttl: Duration,
    /// Runs after the task stops, whatever the reason.
    pub on_stop: Option<StopHook>,
}

/// Build a session and start its task.
pub fn spawn<D>(
    id: Uuid,
    context: SessionContext,
    dealer: D,
    difficulty: Difficulty,
) -> Result<SessionHandle, SessionError>
where
    D: DeckSource + 'static,
{
    let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
    let scheduler = TokioScheduler::new(tx.downgrade());
    let session = GameSession::new(context.rules.clone(), scheduler, dealer, difficulty)?;
    let events = Arc::new(SseHub::new(EVENT_CAPACITY));

    tokio::spawn(run(id, session, rx, events.clone(), context));
    info!(session = %id, %difficulty, "session spawned");

    Ok(SessionHandle {
        id,
        commands: tx,
        events,
    })
}

async fn run<D: DeckSource>(
    id: Uuid,
    mut session: GameSession<TokioScheduler, D>,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: Arc<SseHub>,
    context: SessionContext,
) {
    loop {
        let command = match tokio::time::timeout(context.idle_ttl, commands.recv()).await {
            Ok(Some(command)) => command,
            Ok(None) => break,
            Err(_) => {
                info!(session = %id, phase = ?session.phase(), "session idle; stopping");
                break;
            }
        };
        match command {
            SessionCommand::Apply { event, reply } => {
                let result = session.handle(event);
                if let Ok(updates) = &result {
                    publish(id, updates, &events, &context);
                }
                let _ = reply.send(result);
            }
            SessionCommand::Timer { id: timer, kind } => {
                let updates = session.on_timer(timer, kind);
                publish(id, &updates, &events, &context);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot::capture(id, &session, &context.faces));
            }
            SessionCommand::Shutdown => break,
        }
    }
    info!(session = %id, "session stopped");
    if let Some(on_stop) = &context.on_stop {
        on_stop(id);
    }
}

fn publish(id: Uuid, updates: &[SessionUpdate], events: &Arc<SseHub>, context: &SessionContext) {
    for update in updates {
        match ServerEvent::from_update(update) {
            Ok(event) => events.broadcast(event),
            Err(err) => warn!(session = %id, error = %err, "failed to encode session update"),
        }
        if let SessionUpdate::Finished { result } = update {
            submit_result(id, result.clone(), events.clone(), context.gateway.clone());
        }
    }
}

fn submit_result(
    id: Uuid,
    result: GameResult,
    events: Arc<SseHub>,
    gateway: Arc<dyn LeaderboardGateway>,
) {
    tokio::spawn(async move {
        let record = result.record;
        let event = match gateway.submit(record.clone()).await {
            Ok(()) => {
                debug!(session = %id, score = record.score, "score submitted");
                ServerEvent::json(
                    Some("score_submitted".to_owned()),
                    &ScoreSubmittedEvent { record },
                )
            }
            Err(err) => {
                warn!(session = %id, error = %err, "score submission failed");
                ServerEvent::json(
                    Some("score_submit_failed".to_owned()),
                    &ScoreSubmitFailedEvent {
                        record,
                        message: err.to_string(),
                    },
                )
            }
        };
        match event {
            Ok(event) => events.broadcast(event),
            Err(err) => warn!(session = %id, error = %err, "failed to encode submission event"),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use tokio::sync::broadcast;

    use super::*;
    use crate::{
        game::{FixedDeck, ScoreRecord, SessionPhase},
        gateway::{GatewayError, GatewayResult},
    };

    #[derive(Default)]
    struct RecordingGateway {
        submitted: Mutex<Vec<ScoreRecord>>,
        fail: bool,
    }

    impl LeaderboardGateway for RecordingGateway {
        fn submit(&self, record: ScoreRecord) -> BoxFuture<'static, GatewayResult<()>> {
            let outcome = if self.fail {
                Err(GatewayError::Degraded)
            } else {
                self.submitted.lock().unwrap().push(record);
                Ok(())
            };
            Box::pin(async move { outcome })
        }

        fn list(&self, _limit: usize) -> BoxFuture<'static, GatewayResult<Vec<ScoreRecord>>> {
            let records = self.submitted.lock().unwrap().clone();
            Box::pin(async move { Ok(records) })
        }
    }

    const NORMAL_LAYOUT: [u32; 20] = [1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10];

    fn context(gateway: Arc<RecordingGateway>) -> SessionContext {
        SessionContext {
            rules: GameRules::default(),
            faces: FaceCatalog::numbered(15),
            gateway,
            idle_ttl: Duration::from_secs(600),
            on_stop: None,
        }
    }

    fn spawn_normal(gateway: Arc<RecordingGateway>) -> SessionHandle {
        spawn_with(context(gateway))
    }

    fn spawn_with(context: SessionContext) -> SessionHandle {
        spawn(
            Uuid::new_v4(),
            context,
            FixedDeck::new(NORMAL_LAYOUT.to_vec()),
            Difficulty::Normal,
        )
        .unwrap()
    }

    async fn next_named(rx: &mut broadcast::Receiver<ServerEvent>, name: &str) -> ServerEvent {
        loop {
            let event = rx.recv().await.unwrap();
            if event.event.as_deref() == Some(name) {
                return event;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_loss_is_submitted_through_gateway() {
        let gateway = Arc::new(RecordingGateway::default());
        let handle = spawn_normal(gateway.clone());
        let mut rx = handle.events().subscribe();

        handle
            .apply(SessionEvent::Start {
                player_name: "ada".into(),
                difficulty: Difficulty::Normal,
            })
            .await
            .unwrap();
        next_named(&mut rx, "cards_hidden").await;

        for slot in [0, 1] {
            handle.apply(SessionEvent::Flip { slot }).await.unwrap();
        }
        next_named(&mut rx, "pair_matched").await;

        let finished = next_named(&mut rx, "finished").await;
        assert!(finished.data.contains(r#""success":false"#));
        next_named(&mut rx, "score_submitted").await;

        let submitted = gateway.submitted.lock().unwrap().clone();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].player_name, "ada");
        assert_eq!(submitted[0].score, 0);
        assert_eq!(submitted[0].time_taken, 60);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Lost);
        assert_eq!(snapshot.matched_pairs, 1);
        assert_eq!(snapshot.remaining_secs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_is_reported_and_session_stays_terminal() {
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..RecordingGateway::default()
        });
        let handle = spawn_normal(gateway);
        let mut rx = handle.events().subscribe();

        handle
            .apply(SessionEvent::Start {
                player_name: "bob".into(),
                difficulty: Difficulty::Normal,
            })
            .await
            .unwrap();
        let failed = next_named(&mut rx, "score_submit_failed").await;
        assert!(failed.data.contains("bob"));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Lost);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_commands_surface_session_errors() {
        let handle = spawn_normal(Arc::new(RecordingGateway::default()));
        let err = handle
            .apply(SessionEvent::Start {
                player_name: " ".into(),
                difficulty: Difficulty::Normal,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let ignored = handle.apply(SessionEvent::Flip { slot: 0 }).await.unwrap();
        assert!(ignored.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_task() {
        let handle = spawn_normal(Arc::new(RecordingGateway::default()));
        handle.shutdown().await;
        tokio::task::yield_now().await;
        assert!(matches!(
            handle.snapshot().await,
            Err(ServiceError::SessionGone(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_session_stops_after_idle_ttl() {
        let stopped = Arc::new(Mutex::new(Vec::<Uuid>::new()));
        let recorder = stopped.clone();
        let handle = spawn_with(SessionContext {
            idle_ttl: Duration::from_secs(15),
            on_stop: Some(Arc::new(move |id: Uuid| recorder.lock().unwrap().push(id))),
            ..context(Arc::new(RecordingGateway::default()))
        });
        handle
            .apply(SessionEvent::Start {
                player_name: "ada".into(),
                difficulty: Difficulty::Normal,
            })
            .await
            .unwrap();

        // Preview plus forty seconds of play: ticks keep the task alive.
        tokio::time::sleep(Duration::from_secs(50)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Playing);
        assert!(stopped.lock().unwrap().is_empty());

        // Lost at 60s, then fifteen quiet seconds.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(stopped.lock().unwrap().clone(), vec![handle.id()]);
        assert!(matches!(
            handle.snapshot().await,
            Err(ServiceError::SessionGone(_))
        ));
    }
}
