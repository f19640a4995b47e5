use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::checkpoints::{ActiveCheckpoint, Response, Verdict};
use crate::db::Database;
use crate::error::{EngagementError, Result};
use crate::models::{CompletionRecord, MediaCursor};

use super::{EngagementEvent, EngagementSession, Notice, SessionBuilder, SessionState};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub watched_fraction: f64,
    pub attention_score: u8,
    pub checkpoints_completed: usize,
    pub checkpoints_total: usize,
    pub active_checkpoint: Option<ActiveCheckpoint>,
    pub notice: Option<Notice>,
}

impl EngagementSnapshot {
    fn capture(session: &EngagementSession) -> Self {
        Self {
            session_id: session.id().to_string(),
            state: session.state(),
            watched_fraction: session.watched_fraction(),
            attention_score: session.attention_score(),
            checkpoints_completed: session.checkpoints().iter().filter(|cp| cp.completed).count(),
            checkpoints_total: session.checkpoints().len(),
            active_checkpoint: session.active_checkpoint().cloned(),
            notice: session.notice().cloned(),
        }
    }
}

/// Async front for one mounted lesson: serializes host events onto the
/// session, runs the periodic idle check, publishes events and writes
/// progress.
#[derive(Clone)]
pub struct EngagementController {
    session: Arc<Mutex<EngagementSession>>,
    db: Database,
    events: broadcast::Sender<EngagementEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel_token: Arc<Mutex<Option<CancellationToken>>>,
    /// Completion record whose write failed; retried on the next tick or unmount.
    unsaved: Arc<Mutex<Option<CompletionRecord>>>,
    tick_interval: Duration,
    progress_every_ticks: Option<u32>,
}

impl EngagementController {
    pub fn mount(builder: SessionBuilder, db: Database) -> Result<Self> {
        let session = builder.build(Instant::now().into_std())?;
        let tick_interval = Duration::from_secs(session.config().idle_check_interval_seconds);
        let progress_every_ticks = session.config().progress_write_every_ticks;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            db,
            events,
            ticker: Arc::new(Mutex::new(None)),
            cancel_token: Arc::new(Mutex::new(None)),
            unsaved: Arc::new(Mutex::new(None)),
            tick_interval,
            progress_every_ticks,
        })
    }

    /// Overrides the ticker period, which otherwise follows
    /// `idleCheckIntervalSeconds`.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Result<Self> {
        if tick_interval.is_zero() {
            return Err(EngagementError::Configuration(
                "tick interval must be greater than zero".into(),
            ));
        }
        self.tick_interval = tick_interval;
        Ok(self)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngagementEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> EngagementSnapshot {
        let session = self.session.lock().await;
        EngagementSnapshot::capture(&session)
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    pub async fn enable(&self) -> Result<()> {
        self.dispatch(|session, now| session.enable(now)).await?;
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn time_update(&self, cursor: MediaCursor) {
        self.dispatch(|session, now| session.on_time_update(cursor, now))
            .await;
    }

    pub async fn activity(&self) {
        self.dispatch(|session, now| session.on_activity(now)).await;
    }

    pub async fn visibility_change(&self, visible: bool) {
        self.dispatch(|session, now| session.on_visibility_change(visible, now))
            .await;
    }

    pub async fn submit_response(&self, response: Response) -> Result<Verdict> {
        self.dispatch(|session, now| session.submit_response(&response, now))
            .await
    }

    pub async fn input_changed(&self, text: String) -> Option<Verdict> {
        self.dispatch(|session, now| session.on_input_changed(&text, now))
            .await
    }

    pub async fn seek(&self, target: f64) -> Result<()> {
        self.dispatch(|session, _| session.seek(target)).await
    }

    pub async fn seeking(&self, attempted: f64) -> bool {
        self.dispatch(|session, _| session.on_seeking(attempted)).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.dispatch(|session, now| session.resume(now)).await
    }

    pub async fn ended(&self) {
        self.dispatch(|session, _| session.on_ended()).await;
    }

    /// Replay: forget stored progress and start over with new checkpoints.
    pub async fn reset(&self) -> Result<()> {
        self.cancel_ticker().await;
        *self.unsaved.lock().await = None;

        let (course_id, lesson_id) = self
            .dispatch(|session, now| {
                session.reset(now).map(|_| {
                    let lesson = session.lesson();
                    (lesson.course_id.clone(), lesson.lesson_id.clone())
                })
            })
            .await?;

        self.db
            .delete_progress(&course_id, &lesson_id)
            .await
            .map_err(EngagementError::Persistence)?;
        info!("Progress for {}/{} cleared for replay", course_id, lesson_id);
        Ok(())
    }

    /// Lesson view is going away: stop the ticker and flush what is unsaved.
    pub async fn unmount(&self) {
        self.cancel_ticker().await;
        self.retry_unsaved().await;

        let session = self.session.lock().await;
        info!(
            "Session {} unmounted in state {}",
            session.id(),
            session.state().as_str()
        );
    }

    async fn dispatch<T, F>(&self, action: F) -> T
    where
        F: FnOnce(&mut EngagementSession, std::time::Instant) -> T,
    {
        let (result, events, completion) = {
            let mut session = self.session.lock().await;
            let result = action(&mut session, Instant::now().into_std());
            (result, session.drain_events(), session.take_completion())
        };

        for event in events {
            // No subscribers is fine; events are advisory.
            let _ = self.events.send(event);
        }

        if let Some(record) = completion {
            self.persist_completion(record).await;
        }

        result
    }

    async fn persist_completion(&self, record: CompletionRecord) {
        match self.db.save_progress(&record, Utc::now()).await {
            Ok(()) => info!(
                "Saved completion for {}/{}",
                record.course_id, record.lesson_id
            ),
            Err(err) => {
                error!(
                    "Failed to save completion for {}/{}: {err:#}",
                    record.course_id, record.lesson_id
                );
                *self.unsaved.lock().await = Some(record);
            }
        }
    }

    async fn retry_unsaved(&self) {
        let pending = self.unsaved.lock().await.take();
        if let Some(record) = pending {
            self.persist_completion(record).await;
        }
    }

    async fn write_partial_progress(&self) {
        let record = {
            let session = self.session.lock().await;
            if session.state() == SessionState::Completed {
                return;
            }
            session.progress_record()
        };

        if let Err(err) = self.db.save_progress(&record, Utc::now()).await {
            warn!(
                "Failed to save partial progress for {}/{}: {err:#}",
                record.course_id, record.lesson_id
            );
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.cancel_token.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        let controller = self.clone();
        let tick_interval = self.tick_interval;
        let progress_every = self.progress_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    // Kept running while blocked; the tick also ends the feedback dwell.
                    _ = interval.tick() => {
                        controller.retry_unsaved().await;

                        let state = controller
                            .dispatch(|session, now| {
                                session.tick(now);
                                session.state()
                            })
                            .await;

                        if state == SessionState::Completed {
                            info!("Session completed; idle ticker stopping");
                            break;
                        }

                        ticks = ticks.wrapping_add(1);
                        if let Some(every) = progress_every {
                            if ticks % every == 0 {
                                controller.write_partial_progress().await;
                            }
                        }
                    }
                    _ = token.cancelled() => {
                        info!("Idle ticker cancelled");
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(token) = self.cancel_token.lock().await.take() {
            token.cancel();
        }
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    /// True while the periodic idle check is running.
    pub async fn ticker_running(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
