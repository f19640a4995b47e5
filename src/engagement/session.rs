//! The per-lesson engagement session.
//!
//! One `EngagementSession` is built when a lesson view mounts and dropped when
//! it unmounts. All mutation happens through its methods on a single thread;
//! every check-then-set (most importantly the active checkpoint slot) finishes
//! inside one call.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::attention::{ActivityMonitor, AlwaysAttentive, AttentionScore, AttentivenessSignal};
use crate::checkpoints::{
    content::payload_or_fallback, ActiveCheckpoint, CheckpointResolver, CheckpointScheduler,
    ContentProvider, FallbackContent, Response, Verdict,
};
use crate::error::{EngagementError, Result};
use crate::media::MediaHost;
use crate::models::{
    Checkpoint, CheckpointKind, CheckpointStatus, CompletionRecord, LessonContext, MediaCursor,
    WatchedInterval,
};
use crate::settings::{EngagementConfig, RetryPolicy};
use crate::tracking::SegmentTracker;

use super::completion::CompletionEvaluator;
use super::events::{EngagementEvent, Notice};
use super::state::{BlockReason, SessionState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Collects the collaborators of a session before the checkpoint set is
/// generated.
pub struct SessionBuilder {
    lesson: LessonContext,
    config: EngagementConfig,
    host: Box<dyn MediaHost>,
    content: Box<dyn ContentProvider>,
    signal: Box<dyn AttentivenessSignal>,
    seed: Option<u64>,
}

impl SessionBuilder {
    pub fn new(lesson: LessonContext, host: Box<dyn MediaHost>) -> Self {
        Self {
            lesson,
            config: EngagementConfig::default(),
            host,
            content: Box::new(FallbackContent),
            signal: Box::new(AlwaysAttentive),
            seed: None,
        }
    }

    pub fn config(mut self, config: EngagementConfig) -> Self {
        self.config = config;
        self
    }

    pub fn content(mut self, content: Box<dyn ContentProvider>) -> Self {
        self.content = content;
        self
    }

    pub fn signal(mut self, signal: Box<dyn AttentivenessSignal>) -> Self {
        self.signal = signal;
        self
    }

    /// Makes checkpoint placement and fingerprint codes reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self, now: Instant) -> Result<EngagementSession> {
        self.config.validate()?;

        let duration = self
            .host
            .duration()
            .filter(|duration| duration.is_finite() && *duration > 0.0)
            .ok_or_else(|| {
                EngagementError::Configuration("media duration is missing or not positive".into())
            })?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let scheduler = CheckpointScheduler::from_config(&self.config)?;
        let checkpoints = scheduler.generate(duration, &mut rng, self.content.as_ref(), &self.lesson)?;

        let session = EngagementSession {
            id: Uuid::new_v4().to_string(),
            evaluator: CompletionEvaluator::new(self.config.required_watch_fraction),
            tracker: SegmentTracker::new(self.config.merge_epsilon_seconds),
            monitor: ActivityMonitor::new(
                Duration::from_secs(self.config.idle_threshold_seconds),
                now,
            ),
            last_time: self.host.current_time(),
            lesson: self.lesson,
            config: self.config,
            duration,
            state: SessionState::Locked,
            scheduler,
            checkpoints,
            resolver: CheckpointResolver::new(),
            score: AttentionScore::default(),
            signal: self.signal,
            content: self.content,
            host: self.host,
            rng,
            suppressed: None,
            resume_at: None,
            notice: None,
            events: Vec::new(),
            pending_completion: None,
            completed_at: None,
        };

        log_info!(
            "Session {} mounted for {}/{} ({:.1}s, {} checkpoints)",
            session.id,
            session.lesson.course_id,
            session.lesson.lesson_id,
            session.duration,
            session.checkpoints.len()
        );

        Ok(session)
    }
}

pub struct EngagementSession {
    id: String,
    lesson: LessonContext,
    config: EngagementConfig,
    duration: f64,
    state: SessionState,
    tracker: SegmentTracker,
    scheduler: CheckpointScheduler,
    checkpoints: Vec<Checkpoint>,
    resolver: CheckpointResolver,
    monitor: ActivityMonitor,
    score: AttentionScore,
    evaluator: CompletionEvaluator,
    signal: Box<dyn AttentivenessSignal>,
    content: Box<dyn ContentProvider>,
    host: Box<dyn MediaHost>,
    rng: StdRng,
    /// Last cursor position the session accepted; seeks while blocked revert here.
    last_time: f64,
    /// Re-armed checkpoint that may not fire until the cursor leaves its window.
    suppressed: Option<usize>,
    /// End of the positive-feedback dwell after a correct answer.
    resume_at: Option<Instant>,
    notice: Option<Notice>,
    events: Vec<EngagementEvent>,
    pending_completion: Option<CompletionRecord>,
    completed_at: Option<DateTime<Utc>>,
}

impl EngagementSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lesson(&self) -> &LessonContext {
        &self.lesson
    }

    pub fn config(&self) -> &EngagementConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn watched_fraction(&self) -> f64 {
        self.tracker.watched_fraction(self.duration)
    }

    pub fn watched_intervals(&self) -> &[WatchedInterval] {
        self.tracker.intervals()
    }

    pub fn attention_score(&self) -> u8 {
        self.score.value()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn active_checkpoint(&self) -> Option<&ActiveCheckpoint> {
        self.resolver.active()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<EngagementEvent> {
        std::mem::take(&mut self.events)
    }

    /// Completion record awaiting persistence. Yields it at most once.
    pub fn take_completion(&mut self) -> Option<CompletionRecord> {
        self.pending_completion.take()
    }

    /// Current progress as a record, partial unless the lesson is complete.
    pub fn progress_record(&self) -> CompletionRecord {
        let fraction = self.watched_fraction();
        match self.completed_at {
            Some(completed_at) => CompletionRecord::completed(
                &self.lesson.course_id,
                &self.lesson.lesson_id,
                fraction,
                self.score.value(),
                completed_at,
            ),
            None => CompletionRecord::partial(
                &self.lesson.course_id,
                &self.lesson.lesson_id,
                fraction,
                self.score.value(),
            ),
        }
    }

    /// For hosts without a visibility API; hidden-tab detection is skipped.
    pub fn disable_visibility_tracking(&mut self) {
        log_warn!("Visibility tracking unavailable for session {}; feature disabled", self.id);
        self.monitor.disable_visibility_tracking();
    }

    /// Learner opted in to verification.
    pub fn enable(&mut self, now: Instant) -> Result<()> {
        match self.state {
            SessionState::Locked => {
                self.monitor.record_activity(now);
                self.transition(SessionState::Playing);
                Ok(())
            }
            SessionState::Playing => Ok(()),
            from => Err(EngagementError::InvalidTransition {
                from,
                action: "enable",
            }),
        }
    }

    pub fn on_time_update(&mut self, cursor: MediaCursor, now: Instant) {
        match self.state {
            SessionState::Locked => {
                if cursor.is_playing {
                    log_warn!("Playback started before verification was enabled; pausing");
                    if let Err(err) = self.host.pause() {
                        log_warn!("Failed to pause locked session {}: {err}", self.id);
                    }
                }
            }
            SessionState::Blocked(_) => {}
            SessionState::Completed => {
                self.tracker.record(cursor, cursor.is_playing);
                self.last_time = cursor.time;
            }
            SessionState::Playing => {
                let attentive = cursor.is_playing
                    && self.monitor.tab_visible()
                    && !self.monitor.is_idle(now)
                    && self.signal.is_attentive();
                self.tracker.record(cursor, attentive);
                self.last_time = cursor.time;

                self.release_suppressed(cursor.time);
                self.trigger_due_checkpoint(cursor.time);
                self.evaluate_completion();
            }
        }
    }

    pub fn on_ended(&mut self) {
        if self.state != SessionState::Playing {
            return;
        }
        self.evaluate_completion();
        if self.state == SessionState::Playing {
            log_info!(
                "Lesson {} ended without completion: watched {:.1}%, {}/{} checkpoints",
                self.lesson.lesson_id,
                self.watched_fraction() * 100.0,
                self.checkpoints.iter().filter(|cp| cp.completed).count(),
                self.checkpoints.len()
            );
        }
    }

    /// Pointer, keyboard or click activity from the learner.
    pub fn on_activity(&mut self, now: Instant) {
        self.monitor.record_activity(now);
        if self.state == SessionState::Blocked(BlockReason::Inactivity)
            && self.config.auto_resume_on_activity
        {
            let _ = self.resume_playback(now);
        }
    }

    pub fn on_visibility_change(&mut self, visible: bool, now: Instant) {
        if !self.monitor.set_tab_visible(visible, now) {
            return;
        }

        match (visible, self.state) {
            (false, SessionState::Playing) => {
                self.block_for(BlockReason::TabHidden);
            }
            (true, SessionState::Blocked(BlockReason::TabHidden))
                if self.config.auto_resume_on_activity =>
            {
                let _ = self.resume_playback(now);
            }
            _ => {}
        }
    }

    /// Periodic check driven by the host timer: feedback dwell expiry, idle
    /// detection and the low-attention nudge.
    pub fn tick(&mut self, now: Instant) {
        if let Some(resume_at) = self.resume_at {
            if now >= resume_at {
                self.resume_at = None;
                let _ = self.resume_playback(now);
            }
        }

        if self.state != SessionState::Playing {
            return;
        }

        if !self.monitor.tab_visible() {
            self.block_for(BlockReason::TabHidden);
            return;
        }

        if self.monitor.newly_idle(now) {
            if self.block_for(BlockReason::Inactivity) {
                self.monitor.flag_idle();
            }
            return;
        }

        self.maybe_nudge();
    }

    /// Explicit answer to the active checkpoint.
    pub fn submit_response(&mut self, response: &Response, now: Instant) -> Result<Verdict> {
        self.monitor.record_activity(now);
        let verdict = self
            .resolver
            .submit(response)
            .ok_or(EngagementError::InvalidTransition {
                from: self.state,
                action: "answer a checkpoint",
            })?;
        self.apply_verdict(verdict, now);
        Ok(verdict)
    }

    /// Keystrokes for fingerprint checkpoints; resolves without a submit.
    pub fn on_input_changed(&mut self, text: &str, now: Instant) -> Option<Verdict> {
        self.monitor.record_activity(now);
        let verdict = self.resolver.input_changed(text)?;
        self.apply_verdict(verdict, now);
        Some(verdict)
    }

    /// Seek requested through the engine.
    pub fn seek(&mut self, target: f64) -> Result<()> {
        if !self.state.allows_seek() {
            log_info!("Seek to {:.1}s rejected while {}", target, self.state.as_str());
            self.raise(Notice::SeekBlocked);
            return Err(EngagementError::SeekRejected { state: self.state });
        }

        self.host.set_current_time(target)?;
        self.last_time = target;
        Ok(())
    }

    /// The host moved `currentTime` on its own (native scrubber). Reverts the
    /// move while seeking is not allowed. Returns `true` when reverted.
    pub fn on_seeking(&mut self, attempted: f64) -> bool {
        if self.state.allows_seek() {
            self.last_time = attempted;
            return false;
        }
        if attempted == self.last_time {
            return false;
        }

        log_info!(
            "Reverting seek to {:.1}s while {}; staying at {:.1}s",
            attempted,
            self.state.as_str(),
            self.last_time
        );
        if let Err(err) = self.host.set_current_time(self.last_time) {
            log_warn!("Failed to revert seek for session {}: {err}", self.id);
        }
        self.raise(Notice::SeekBlocked);
        true
    }

    /// Learner pressed resume after an inactivity/tab block or a failed
    /// autoplay.
    pub fn resume(&mut self, now: Instant) -> Result<()> {
        match self.state {
            SessionState::Blocked(BlockReason::Inactivity) => {}
            SessionState::Blocked(BlockReason::TabHidden) if self.monitor.tab_visible() => {}
            SessionState::Blocked(BlockReason::Checkpoint) if !self.resolver.is_active() => {
                self.resume_at = None;
            }
            from => {
                return Err(EngagementError::InvalidTransition {
                    from,
                    action: "resume",
                })
            }
        }
        self.resume_playback(now)
    }

    /// Replay the lesson from scratch with a freshly randomized checkpoint set.
    pub fn reset(&mut self, now: Instant) -> Result<()> {
        let checkpoints = self.scheduler.generate(
            self.duration,
            &mut self.rng,
            self.content.as_ref(),
            &self.lesson,
        )?;

        if let Err(err) = self.host.pause() {
            log_warn!("Failed to pause during reset of session {}: {err}", self.id);
        }

        self.checkpoints = checkpoints;
        self.tracker.clear();
        self.resolver = CheckpointResolver::new();
        self.monitor = ActivityMonitor::new(
            Duration::from_secs(self.config.idle_threshold_seconds),
            now,
        );
        self.score = AttentionScore::default();
        self.suppressed = None;
        self.resume_at = None;
        self.notice = None;
        self.pending_completion = None;
        self.completed_at = None;
        self.last_time = self.host.current_time();
        self.transition(SessionState::Locked);

        log_info!(
            "Session {} reset with {} new checkpoints",
            self.id,
            self.checkpoints.len()
        );
        Ok(())
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        log_info!("Session {}: {} -> {}", self.id, from.as_str(), to.as_str());
        self.events.push(EngagementEvent::StateChanged { from, to });
    }

    fn raise(&mut self, notice: Notice) {
        self.notice = Some(notice.clone());
        self.events.push(EngagementEvent::Notice(notice));
    }

    fn reward_attention(&mut self, points: u8) {
        let before = self.score.value();
        self.score.reward(points);
        self.announce_score(before);
    }

    fn penalize_attention(&mut self, points: u8) {
        let before = self.score.value();
        self.score.penalize(points);
        self.announce_score(before);
    }

    fn announce_score(&mut self, before: u8) {
        let score = self.score.value();
        if score != before {
            self.events.push(EngagementEvent::AttentionChanged { score });
        }
    }

    fn release_suppressed(&mut self, time: f64) {
        if let Some(index) = self.suppressed {
            if !self.checkpoints[index].is_due_at(time) {
                self.suppressed = None;
            }
        }
    }

    fn trigger_due_checkpoint(&mut self, time: f64) {
        if self.resolver.is_active() {
            return;
        }

        let due = self
            .checkpoints
            .iter()
            .enumerate()
            .find(|(index, checkpoint)| {
                Some(*index) != self.suppressed && checkpoint.is_pending() && checkpoint.is_due_at(time)
            })
            .map(|(index, checkpoint)| (index, checkpoint.clone()));

        if let Some((index, checkpoint)) = due {
            self.activate_checkpoint(Some(index), checkpoint);
        }
    }

    fn activate_checkpoint(&mut self, index: Option<usize>, checkpoint: Checkpoint) -> bool {
        if self.resolver.is_active() {
            return false;
        }

        // Without a confirmed pause the checkpoint stays pending and fires on
        // the next update inside its window.
        if let Err(err) = self.host.pause() {
            log_warn!("Could not pause for checkpoint {}: {err}", checkpoint.id);
            return false;
        }

        if !self.resolver.activate(index, &checkpoint, &mut self.rng) {
            return false;
        }
        if let Some(index) = index {
            self.checkpoints[index].status = CheckpointStatus::Active;
        }

        let code = self.resolver.active().and_then(|active| active.code.clone());
        log_info!(
            "Checkpoint {} ({}) activated at {:.1}s",
            checkpoint.id,
            checkpoint.kind.as_str(),
            self.last_time
        );
        self.events.push(EngagementEvent::CheckpointActivated {
            id: checkpoint.id,
            kind: checkpoint.kind,
            prompt: checkpoint.payload.prompt,
            code,
        });
        self.transition(SessionState::Blocked(BlockReason::Checkpoint));
        true
    }

    fn apply_verdict(&mut self, verdict: Verdict, now: Instant) {
        let Some((index, id)) = self
            .resolver
            .active()
            .map(|active| (active.index, active.checkpoint.id.clone()))
        else {
            return;
        };

        log_info!("Checkpoint {} answered: {:?}", id, verdict);
        self.events.push(EngagementEvent::CheckpointAnswered {
            id,
            correct: verdict.is_correct(),
        });

        match verdict {
            Verdict::Correct => {
                self.resolver.finish();
                if let Some(index) = index {
                    let checkpoint = &mut self.checkpoints[index];
                    checkpoint.completed = true;
                    checkpoint.status = CheckpointStatus::Resolved;
                }
                self.reward_attention(self.config.correct_reward);
                self.raise(Notice::CorrectAnswer);

                let dwell = Duration::from_millis(self.config.feedback_dwell_ms);
                if dwell.is_zero() {
                    let _ = self.resume_playback(now);
                } else {
                    self.resume_at = Some(now + dwell);
                }
            }
            Verdict::Incorrect => {
                self.penalize_attention(self.config.incorrect_penalty);
                match self.config.retry_policy {
                    RetryPolicy::InPlace => self.raise(Notice::IncorrectAnswer { retry: true }),
                    RetryPolicy::ReArm => {
                        self.resolver.finish();
                        if let Some(index) = index {
                            self.checkpoints[index].status = CheckpointStatus::Pending;
                            self.suppressed = Some(index);
                        }
                        self.raise(Notice::IncorrectAnswer { retry: false });
                        let _ = self.resume_playback(now);
                    }
                }
            }
        }
    }

    /// Pause and block for a disengagement signal. Leaves the state alone
    /// when the host refuses to pause.
    fn block_for(&mut self, reason: BlockReason) -> bool {
        if let Err(err) = self.host.pause() {
            log_warn!("Could not pause session {} for {:?}: {err}", self.id, reason);
            return false;
        }

        self.penalize_attention(self.config.idle_penalty);
        self.raise(match reason {
            BlockReason::TabHidden => Notice::TabHiddenPaused,
            _ => Notice::InactivityPaused,
        });
        self.transition(SessionState::Blocked(reason));
        true
    }

    fn resume_playback(&mut self, now: Instant) -> Result<()> {
        // Tab went away while already blocked: hand over to the tab-hidden
        // block without playing and without a penalty.
        if !self.monitor.tab_visible() {
            log_info!("Session {} stays paused; tab is hidden", self.id);
            self.raise(Notice::TabHiddenPaused);
            self.transition(SessionState::Blocked(BlockReason::TabHidden));
            return Ok(());
        }

        if let Err(err) = self.host.play() {
            log_warn!("Host refused to resume session {}: {err}", self.id);
            self.raise(Notice::TapToResume);
            return Err(err);
        }

        self.monitor.record_activity(now);
        self.notice = None;
        self.transition(SessionState::Playing);
        self.evaluate_completion();
        Ok(())
    }

    fn maybe_nudge(&mut self) {
        let Some(nudge) = self.config.low_attention_nudge else {
            return;
        };
        if !self.score.is_below(nudge.threshold) || self.resolver.is_active() {
            return;
        }
        if !self.rng.gen_bool(nudge.probability) {
            return;
        }

        log_info!(
            "Attention score {} below {}; presenting a nudge",
            self.score.value(),
            nudge.threshold
        );
        let payload = payload_or_fallback(self.content.as_ref(), CheckpointKind::Attention, &self.lesson);
        let checkpoint = Checkpoint::new(
            format!("nudge-{}", Uuid::new_v4()),
            self.last_time,
            CheckpointKind::Attention,
            payload,
        );
        self.activate_checkpoint(None, checkpoint);
    }

    fn evaluate_completion(&mut self) {
        if self.state != SessionState::Playing {
            return;
        }

        let fraction = self.watched_fraction();
        if !self.evaluator.is_satisfied(fraction, &self.checkpoints) {
            return;
        }

        let completed_at = Utc::now();
        let record = CompletionRecord::completed(
            &self.lesson.course_id,
            &self.lesson.lesson_id,
            fraction,
            self.score.value(),
            completed_at,
        );

        self.completed_at = Some(completed_at);
        self.resume_at = None;
        self.transition(SessionState::Completed);
        log_info!(
            "Lesson {}/{} completed ({:.1}% watched, attention {})",
            self.lesson.course_id,
            self.lesson.lesson_id,
            fraction * 100.0,
            self.score.value()
        );
        self.events.push(EngagementEvent::LessonCompleted(record.clone()));
        self.pending_completion = Some(record);
    }
}
