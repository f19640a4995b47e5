//! Headless lesson simulator.
//!
//! Drives one lesson through the engagement controller with a simulated media
//! element and learner, printing every engine event as a JSON line and the
//! final snapshot at the end.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::broadcast::error::RecvError;

use lessonguard_lib::{
    init_logging, BlockReason, CheckpointKind, Database, EngagementConfig, EngagementController,
    LessonContext, MediaCursor, MediaHost, Response, SessionBuilder, SessionState, SettingsStore,
    SimulatedPresence,
};

/// Simulated media advance per time update, in seconds.
const STEP_SECS: f64 = 0.25;

/// Play one lesson through the engagement engine with a simulated learner.
#[derive(Debug, Parser)]
#[command(name = "lessonguard")]
struct Cli {
    /// Lesson length in seconds.
    #[arg(long, default_value_t = 600.0)]
    duration: f64,

    /// Engagement settings JSON; defaults apply when absent.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// SQLite progress database; in-memory when absent.
    #[arg(long)]
    db: Option<PathBuf>,

    #[arg(long, default_value = "demo-course")]
    course: String,

    #[arg(long, default_value = "demo-lesson")]
    lesson: String,

    /// Seed for checkpoint placement, codes and learner behaviour.
    #[arg(long)]
    seed: Option<u64>,

    /// Chance that the learner's first answer to a checkpoint is wrong.
    #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
    wrong_rate: f64,

    /// Media time at which the learner switches tabs once.
    #[arg(long)]
    hide_tab_at: Option<f64>,

    /// Threshold for a randomly distracted learner (0 means always present).
    #[arg(long)]
    distraction: Option<f64>,
}

fn parse_probability(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw.parse().map_err(|err| format!("not a number: {err}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not a probability in [0, 1]"))
    }
}

#[derive(Debug)]
struct HostState {
    time: f64,
    playing: bool,
    duration: f64,
}

/// In-process stand-in for a video element.
#[derive(Debug, Clone)]
struct SimulatedHost {
    state: Arc<Mutex<HostState>>,
}

impl SimulatedHost {
    fn new(duration: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                time: 0.0,
                playing: false,
                duration,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn advance(&self, secs: f64) -> MediaCursor {
        let mut state = self.lock();
        if state.playing {
            state.time = (state.time + secs).min(state.duration);
        }
        MediaCursor {
            time: state.time,
            is_playing: state.playing,
        }
    }

    fn is_at_end(&self) -> bool {
        let state = self.lock();
        state.time >= state.duration
    }
}

impl MediaHost for SimulatedHost {
    fn current_time(&self) -> f64 {
        self.lock().time
    }

    fn set_current_time(&mut self, time: f64) -> lessonguard_lib::Result<()> {
        let mut state = self.lock();
        state.time = time.clamp(0.0, state.duration);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        Some(self.lock().duration)
    }

    fn play(&mut self) -> lessonguard_lib::Result<()> {
        self.lock().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> lessonguard_lib::Result<()> {
        self.lock().playing = false;
        Ok(())
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngagementConfig> {
    match path {
        Some(path) => Ok(SettingsStore::new(path)?.engagement()),
        None => Ok(EngagementConfig::default()),
    }
}

/// What the simulated learner types or does for the active checkpoint.
fn answer_for(kind: CheckpointKind, answer: Option<&str>, key_phrases: &[String]) -> Response {
    if kind.is_gesture() {
        return Response::Gesture;
    }
    let text = answer
        .map(str::to_string)
        .or_else(|| key_phrases.first().map(|phrase| format!("it is {phrase}")))
        .unwrap_or_else(|| "I was watching".to_string());
    Response::Text(text)
}

/// Auto-resume may already have restarted playback, so a refused resume is
/// only logged.
async fn resume(controller: &EngagementController) {
    if let Err(err) = controller.resume().await {
        info!("Resume skipped: {err}");
    }
}

async fn answer_checkpoint(controller: &EngagementController, rng: &mut StdRng, wrong_rate: f64) -> Result<()> {
    let Some(active) = controller.snapshot().await.active_checkpoint else {
        // Correct answer already in; skip the feedback dwell.
        resume(controller).await;
        return Ok(());
    };

    let kind = active.checkpoint.kind;
    if active.attempts == 0 && !kind.is_gesture() && rng.gen_bool(wrong_rate) {
        controller
            .submit_response(Response::Text("not sure".into()))
            .await
            .context("wrong answer rejected")?;
        return Ok(());
    }

    if kind == CheckpointKind::FingerprintCode {
        let code = active.code.unwrap_or_default();
        let mut typed = String::new();
        for digit in code.chars() {
            typed.push(digit);
            controller.input_changed(typed.clone()).await;
        }
        return Ok(());
    }

    let payload = &active.checkpoint.payload;
    let response = answer_for(kind, payload.answer.as_deref(), &payload.key_phrases);
    controller.submit_response(response).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = load_config(cli.settings)?;
    let db = match cli.db {
        Some(path) => Database::new(path)?,
        None => Database::open_in_memory()?,
    };
    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut learner = StdRng::seed_from_u64(seed);

    let host = SimulatedHost::new(cli.duration);
    let lesson = LessonContext::new(&cli.course, &cli.lesson);
    let mut builder = SessionBuilder::new(lesson, Box::new(host.clone()))
        .config(config)
        .seed(seed);
    if let Some(threshold) = cli.distraction {
        builder = builder.signal(Box::new(SimulatedPresence::new(seed, threshold)));
    }

    let controller = EngagementController::mount(builder, db.clone())?;

    let mut events = controller.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => eprintln!("failed to encode event: {err}"),
                },
                Err(RecvError::Lagged(skipped)) => eprintln!("skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut tab_hidden_once = false;
    let mut host_for_play = host.clone();

    while !host.is_at_end() {
        match controller.state().await {
            SessionState::Locked => {
                controller.enable().await?;
                host_for_play.play()?;
            }
            SessionState::Blocked(BlockReason::Checkpoint) => {
                answer_checkpoint(&controller, &mut learner, cli.wrong_rate).await?;
            }
            SessionState::Blocked(BlockReason::TabHidden) => {
                controller.visibility_change(true).await;
                resume(&controller).await;
            }
            SessionState::Blocked(BlockReason::Inactivity) => {
                controller.activity().await;
                resume(&controller).await;
            }
            SessionState::Playing | SessionState::Completed => {
                let cursor = host.advance(STEP_SECS);
                if let Some(at) = cli.hide_tab_at {
                    if !tab_hidden_once && cursor.time >= at {
                        tab_hidden_once = true;
                        controller.visibility_change(false).await;
                        continue;
                    }
                }
                controller.time_update(cursor).await;
                controller.activity().await;
            }
        }
        tokio::task::yield_now().await;
    }

    controller.ended().await;
    controller.unmount().await;

    let snapshot = controller.snapshot().await;
    let stored = db
        .get_progress(&cli.course, &cli.lesson)
        .await
        .context("failed to read back lesson progress")?;

    // Let the printer drain what is already queued before it goes away.
    tokio::task::yield_now().await;
    printer.abort();

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    match stored {
        Some(progress) => println!("{}", serde_json::to_string_pretty(&progress)?),
        None => println!("no progress stored for {}/{}", cli.course, cli.lesson),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_rate_must_be_a_probability() {
        assert!(Cli::try_parse_from(["lessonguard", "--wrong-rate", "0.25"]).is_ok());
        assert!(Cli::try_parse_from(["lessonguard", "--wrong-rate", "1.5"]).is_err());
        assert!(Cli::try_parse_from(["lessonguard", "--wrong-rate", "-0.1"]).is_err());
        assert!(Cli::try_parse_from(["lessonguard", "--wrong-rate", "often"]).is_err());
    }
}
