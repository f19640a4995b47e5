//! Checkpoint content collaborator and the built-in fallback table.

use crate::error::{EngagementError, Result};
use crate::models::{CheckpointKind, CheckpointPayload, LessonContext};

/// Supplies question/answer payloads for scheduled checkpoints.
pub trait ContentProvider: Send {
    fn payload_for(&self, kind: CheckpointKind, lesson: &LessonContext) -> Result<CheckpointPayload>;
}

/// Generic payloads used when no collaborator is plugged in or it fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackContent;

impl ContentProvider for FallbackContent {
    fn payload_for(&self, kind: CheckpointKind, _lesson: &LessonContext) -> Result<CheckpointPayload> {
        Ok(fallback_payload(kind))
    }
}

pub fn fallback_payload(kind: CheckpointKind) -> CheckpointPayload {
    match kind {
        CheckpointKind::Quiz => CheckpointPayload {
            prompt: "Were you following along with the lesson? Type \"yes\" to continue.".into(),
            answer: Some("yes".into()),
            ..CheckpointPayload::default()
        },
        CheckpointKind::Attention => CheckpointPayload {
            prompt: "Attention check: type \"continue\" to keep watching.".into(),
            answer: Some("continue".into()),
            ..CheckpointPayload::default()
        },
        CheckpointKind::CodeChallenge => CheckpointPayload {
            prompt: "Describe in one line how you would apply what was just shown in code.".into(),
            key_phrases: vec![
                "function".into(),
                "variable".into(),
                "loop".into(),
                "return".into(),
                "call".into(),
            ],
            ..CheckpointPayload::default()
        },
        CheckpointKind::Conceptual => CheckpointPayload {
            prompt: "In your own words, what is the main idea of this section?".into(),
            key_phrases: vec![
                "because".into(),
                "means".into(),
                "used".into(),
                "example".into(),
            ],
            ..CheckpointPayload::default()
        },
        CheckpointKind::ClickTarget => CheckpointPayload {
            prompt: "Click the highlighted target to continue.".into(),
            visual: Some("target".into()),
            ..CheckpointPayload::default()
        },
        CheckpointKind::TextInput => CheckpointPayload {
            prompt: "Type the word \"focus\" to continue.".into(),
            answer: Some("focus".into()),
            ..CheckpointPayload::default()
        },
        CheckpointKind::DragTarget => CheckpointPayload {
            prompt: "Drag the marker into the box to continue.".into(),
            visual: Some("drop-zone".into()),
            ..CheckpointPayload::default()
        },
        CheckpointKind::FingerprintCode => CheckpointPayload {
            prompt: "Type the code shown on screen.".into(),
            ..CheckpointPayload::default()
        },
    }
}

/// Asks `provider` for a payload and falls back to the built-in table on
/// failure. Content problems never abort scheduling.
pub fn payload_or_fallback(
    provider: &dyn ContentProvider,
    kind: CheckpointKind,
    lesson: &LessonContext,
) -> CheckpointPayload {
    match provider.payload_for(kind, lesson) {
        Ok(payload) if !payload.prompt.trim().is_empty() => payload,
        Ok(_) => {
            let err = EngagementError::ContentUnavailable(format!("empty prompt for {}", kind.as_str()));
            log::warn!("{err}; using fallback payload");
            fallback_payload(kind)
        }
        Err(err) => {
            log::warn!("{err}; using fallback payload for {}", kind.as_str());
            fallback_payload(kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl ContentProvider for Unavailable {
        fn payload_for(&self, kind: CheckpointKind, _lesson: &LessonContext) -> Result<CheckpointPayload> {
            Err(EngagementError::ContentUnavailable(format!("no content for {}", kind.as_str())))
        }
    }

    #[test]
    fn every_kind_has_a_fallback_prompt() {
        for kind in CheckpointKind::ALL {
            assert!(!fallback_payload(kind).prompt.is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn failing_provider_falls_back() {
        let lesson = LessonContext::new("course", "lesson");
        let payload = payload_or_fallback(&Unavailable, CheckpointKind::TextInput, &lesson);
        assert_eq!(payload, fallback_payload(CheckpointKind::TextInput));
    }
}
