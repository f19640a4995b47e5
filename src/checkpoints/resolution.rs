//! Lifecycle of the single active checkpoint and kind-specific answer checks.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Checkpoint, CheckpointKind, CheckpointPayload, CheckpointStatus};

/// A learner's answer to the active checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Response {
    /// Typed or selected text.
    Text(String),
    /// A completed click or drag gesture.
    Gesture,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Grade `response` against a checkpoint of `kind`.
///
/// `code` is the fingerprint shown at activation and only matters for
/// [`CheckpointKind::FingerprintCode`].
pub fn evaluate_response(
    kind: CheckpointKind,
    payload: &CheckpointPayload,
    response: &Response,
    code: Option<&str>,
) -> Verdict {
    let text = match response {
        Response::Gesture if kind.is_gesture() => return Verdict::Correct,
        Response::Gesture => return Verdict::Incorrect,
        Response::Text(text) => text,
    };

    let correct = match kind {
        CheckpointKind::ClickTarget | CheckpointKind::DragTarget => true,
        CheckpointKind::TextInput | CheckpointKind::Quiz | CheckpointKind::Attention => {
            match payload.answer.as_deref() {
                Some(answer) => normalize(text) == normalize(answer),
                // Nothing to compare against; any non-empty answer passes.
                None => !text.trim().is_empty(),
            }
        }
        CheckpointKind::CodeChallenge | CheckpointKind::Conceptual => {
            let text = normalize(text);
            if payload.key_phrases.is_empty() {
                !text.is_empty()
            } else {
                payload
                    .key_phrases
                    .iter()
                    .map(|phrase| normalize(phrase))
                    .any(|phrase| !phrase.is_empty() && text.contains(&phrase))
            }
        }
        CheckpointKind::FingerprintCode => code.is_some_and(|code| text.trim() == code),
    };

    if correct {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

/// The one checkpoint currently presented to the learner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCheckpoint {
    /// Position in the scheduled set; `None` for low-attention nudges.
    pub index: Option<usize>,
    pub checkpoint: Checkpoint,
    /// Four-digit code shown for fingerprint checkpoints.
    pub code: Option<String>,
    pub attempts: u32,
}

impl ActiveCheckpoint {
    pub fn is_scheduled(&self) -> bool {
        self.index.is_some()
    }
}

/// Owns the single active-checkpoint slot.
///
/// `activate` checks and fills the slot in one step, so two checkpoints can
/// never be presented at once.
#[derive(Debug, Default)]
pub struct CheckpointResolver {
    active: Option<ActiveCheckpoint>,
}

impl CheckpointResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveCheckpoint> {
        self.active.as_ref()
    }

    /// Present `checkpoint`. Returns `false` and leaves the slot untouched
    /// when another checkpoint is already active.
    pub fn activate<R: Rng>(&mut self, index: Option<usize>, checkpoint: &Checkpoint, rng: &mut R) -> bool {
        if self.active.is_some() {
            return false;
        }

        let code = (checkpoint.kind == CheckpointKind::FingerprintCode)
            .then(|| rng.gen_range(1000..=9999u32).to_string());

        let mut checkpoint = checkpoint.clone();
        checkpoint.status = CheckpointStatus::Active;

        self.active = Some(ActiveCheckpoint {
            index,
            checkpoint,
            code,
            attempts: 0,
        });
        true
    }

    /// Grade an explicit submission. `None` when nothing is active.
    pub fn submit(&mut self, response: &Response) -> Option<Verdict> {
        let active = self.active.as_mut()?;
        active.attempts += 1;
        Some(evaluate_response(
            active.checkpoint.kind,
            &active.checkpoint.payload,
            response,
            active.code.as_deref(),
        ))
    }

    /// Incremental input for fingerprint checkpoints. Returns `Correct` the
    /// moment the typed text matches the code; partial input is never graded
    /// as incorrect.
    pub fn input_changed(&mut self, text: &str) -> Option<Verdict> {
        let active = self.active.as_mut()?;
        if active.checkpoint.kind != CheckpointKind::FingerprintCode {
            return None;
        }

        let code = active.code.as_deref()?;
        if text.trim() == code {
            active.attempts += 1;
            Some(Verdict::Correct)
        } else {
            None
        }
    }

    /// Empty the slot, handing back what was active.
    pub fn finish(&mut self) -> Option<ActiveCheckpoint> {
        self.active.take()
    }
}
