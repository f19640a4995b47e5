#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

use lessonguard_lib::{
    CheckpointKind, EngagementConfig, EngagementError, EngagementSession, LessonContext,
    MediaCursor, MediaHost, Result, SessionBuilder, SessionState,
};

pub const LESSON_SECS: f64 = 600.0;
pub const STEP_SECS: f64 = 0.25;

/// What the fake media element has been asked to do.
#[derive(Debug, Default)]
pub struct HostLog {
    pub time: f64,
    pub playing: bool,
    pub duration: Option<f64>,
    pub plays: u32,
    pub pauses: u32,
    pub seeks: Vec<f64>,
    pub fail_play: bool,
    pub fail_pause: bool,
}

#[derive(Debug, Clone)]
pub struct FakeHost {
    log: Arc<Mutex<HostLog>>,
}

impl FakeHost {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            log: Arc::new(Mutex::new(HostLog {
                duration,
                ..HostLog::default()
            })),
        }
    }

    pub fn log(&self) -> MutexGuard<'_, HostLog> {
        self.log.lock().unwrap()
    }
}

impl MediaHost for FakeHost {
    fn current_time(&self) -> f64 {
        self.log().time
    }

    fn set_current_time(&mut self, time: f64) -> Result<()> {
        let mut log = self.log();
        log.time = time;
        log.seeks.push(time);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.log().duration
    }

    fn play(&mut self) -> Result<()> {
        let mut log = self.log();
        if log.fail_play {
            return Err(EngagementError::HostMedia("autoplay blocked".into()));
        }
        log.plays += 1;
        log.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut log = self.log();
        if log.fail_pause {
            return Err(EngagementError::HostMedia("pause refused".into()));
        }
        log.pauses += 1;
        log.playing = false;
        Ok(())
    }
}

pub fn lesson() -> LessonContext {
    LessonContext::new("course-1", "lesson-1").with_title("Ownership basics")
}

/// Config scheduling exactly `count` checkpoints of `kind` on a 600s lesson.
pub fn config_with_checkpoints(count: usize, kind: CheckpointKind) -> EngagementConfig {
    EngagementConfig {
        checkpoint_interval_seconds: 10_000.0,
        min_checkpoint_count: count,
        checkpoint_kinds: vec![kind],
        low_attention_nudge: None,
        ..EngagementConfig::default()
    }
}

pub fn no_checkpoints() -> EngagementConfig {
    config_with_checkpoints(0, CheckpointKind::Quiz)
}

pub fn builder(host: &FakeHost, config: EngagementConfig) -> SessionBuilder {
    SessionBuilder::new(lesson(), Box::new(host.clone()))
        .config(config)
        .seed(7)
}

pub fn session(host: &FakeHost, config: EngagementConfig, now: Instant) -> EngagementSession {
    builder(host, config).build(now).unwrap()
}

/// Feed playing time updates from `from` to `to` while the session keeps
/// accepting them. Returns the last time sent.
pub fn play_until(session: &mut EngagementSession, from: f64, to: f64, now: Instant) -> f64 {
    let steps = ((to - from) / STEP_SECS).round() as usize;
    let mut time = from;
    for step in 0..=steps {
        time = from + step as f64 * STEP_SECS;
        session.on_time_update(MediaCursor::playing(time), now);
        if !matches!(session.state(), SessionState::Playing | SessionState::Completed) {
            break;
        }
    }
    time
}
