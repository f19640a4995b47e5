mod common;

use std::time::{Duration, Instant};

use lessonguard_lib::models::CheckpointStatus;
use lessonguard_lib::settings::LowAttentionNudge;
use lessonguard_lib::{
    BlockReason, CheckpointKind, EngagementConfig, EngagementError, EngagementEvent, MediaCursor,
    Notice, Response, RetryPolicy, SessionState, Verdict,
};

use common::{
    builder, config_with_checkpoints, no_checkpoints, play_until, session, FakeHost, LESSON_SECS,
    STEP_SECS,
};

fn host() -> FakeHost {
    FakeHost::new(Some(LESSON_SECS))
}

fn text(value: &str) -> Response {
    Response::Text(value.into())
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

#[test]
fn build_requires_a_known_duration() {
    let host = FakeHost::new(None);
    let err = builder(&host, no_checkpoints()).build(Instant::now()).err();
    assert!(matches!(err, Some(EngagementError::Configuration(_))));

    let host = FakeHost::new(Some(f64::NAN));
    assert!(builder(&host, no_checkpoints()).build(Instant::now()).is_err());
}

#[test]
fn build_rejects_invalid_config() {
    let config = EngagementConfig {
        required_watch_fraction: 0.0,
        ..EngagementConfig::default()
    };
    let err = builder(&host(), config).build(Instant::now()).err();
    assert!(matches!(err, Some(EngagementError::Configuration(_))));
}

#[test]
fn locked_session_pauses_playback_and_credits_nothing() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);

    assert_eq!(session.state(), SessionState::Locked);
    session.on_time_update(MediaCursor::playing(5.0), now);

    assert_eq!(host.log().pauses, 1);
    assert_eq!(session.watched_fraction(), 0.0);
    assert!(matches!(
        session.seek(30.0),
        Err(EngagementError::SeekRejected {
            state: SessionState::Locked
        })
    ));
}

#[test]
fn enable_only_from_locked() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);

    session.enable(now).unwrap();
    session.enable(now).unwrap();
    assert_eq!(session.state(), SessionState::Playing);

    session.on_visibility_change(false, now);
    assert!(matches!(
        session.enable(now),
        Err(EngagementError::InvalidTransition { action: "enable", .. })
    ));
}

#[test]
fn lesson_without_checkpoints_completes_at_ninety_percent() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    assert!(session.checkpoints().is_empty());

    session.enable(now).unwrap();
    play_until(&mut session, 0.0, 539.0, now);
    assert_eq!(session.state(), SessionState::Playing);
    assert!(session.take_completion().is_none());

    play_until(&mut session, 539.0 + STEP_SECS, 540.0, now);
    assert_eq!(session.state(), SessionState::Completed);

    let record = session.take_completion().unwrap();
    assert!(record.completed);
    assert!(record.completed_at.is_some());
    assert!(record.watched_fraction >= 0.9 - 1e-9);
    assert_eq!(record.course_id, "course-1");

    let events = session.drain_events();
    assert!(events.contains(&EngagementEvent::StateChanged {
        from: SessionState::Locked,
        to: SessionState::Playing,
    }));
    let completions = events
        .iter()
        .filter(|event| matches!(event, EngagementEvent::LessonCompleted(_)))
        .count();
    assert_eq!(completions, 1);
}

#[test]
fn completion_fires_once_and_rewatch_stays_completed() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);

    session.enable(now).unwrap();
    play_until(&mut session, 0.0, 560.0, now);
    assert!(session.take_completion().is_some());
    session.drain_events();

    play_until(&mut session, 560.0 + STEP_SECS, LESSON_SECS, now);
    session.on_ended();

    assert_eq!(session.state(), SessionState::Completed);
    assert!(session.take_completion().is_none());
    assert!(!session
        .drain_events()
        .iter()
        .any(|event| matches!(event, EngagementEvent::LessonCompleted(_))));
}

#[test]
fn completed_session_reverts_seeks() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);

    session.enable(now).unwrap();
    play_until(&mut session, 0.0, 560.0, now);
    assert_eq!(session.state(), SessionState::Completed);

    assert!(matches!(
        session.seek(10.0),
        Err(EngagementError::SeekRejected {
            state: SessionState::Completed
        })
    ));
    assert_eq!(host.log().time, 0.0);
    assert_eq!(session.notice(), Some(&Notice::SeekBlocked));

    assert!(session.on_seeking(20.0));
    assert_eq!(host.log().time, 560.0);
    assert_eq!(session.state(), SessionState::Completed);
}

#[test]
fn repeated_updates_do_not_inflate_coverage() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.enable(now).unwrap();

    for _ in 0..200 {
        session.on_time_update(MediaCursor::playing(42.0), now);
    }
    assert_eq!(session.watched_fraction(), 0.0);

    play_until(&mut session, 42.0, 102.0, now);
    assert!((session.watched_fraction() - 0.1).abs() < 1e-9);
}

#[test]
fn idle_and_paused_seconds_are_not_credited() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.enable(now).unwrap();

    play_until(&mut session, 0.0, 10.0, now);
    let credited = session.watched_fraction();

    play_until(&mut session, 10.0 + STEP_SECS, 40.0, now + secs(30));
    for step in 0..40 {
        let time = 50.0 + step as f64 * STEP_SECS;
        session.on_time_update(MediaCursor::paused(time), now);
    }

    assert_eq!(session.watched_fraction(), credited);
    assert_eq!(session.watched_intervals().len(), 1);
}

#[test]
fn checkpoint_blocks_on_first_update_inside_its_window() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(1, CheckpointKind::Quiz), now);
    let trigger = session.checkpoints()[0].trigger_time;

    session.enable(now).unwrap();
    let stopped = play_until(&mut session, 0.0, LESSON_SECS, now);

    assert!(stopped >= trigger && stopped < trigger + 1.0);
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));
    assert_eq!(host.log().pauses, 1);
    assert_eq!(session.checkpoints()[0].status, CheckpointStatus::Active);

    // Updates while blocked neither re-pause nor credit time.
    let fraction = session.watched_fraction();
    session.on_time_update(MediaCursor::playing(stopped + 0.5), now);
    assert_eq!(host.log().pauses, 1);
    assert_eq!(session.watched_fraction(), fraction);

    let active = session.active_checkpoint().unwrap();
    assert!(active.is_scheduled());
    assert_eq!(active.checkpoint.kind, CheckpointKind::Quiz);
}

#[test]
fn correct_answer_resumes_after_feedback_dwell() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(1, CheckpointKind::Quiz), now);
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, LESSON_SECS, now);

    assert_eq!(session.submit_response(&text(" Yes "), now).unwrap(), Verdict::Correct);
    assert_eq!(session.notice(), Some(&Notice::CorrectAnswer));
    assert!(session.checkpoints()[0].completed);
    assert!(session.active_checkpoint().is_none());
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));

    session.tick(now + Duration::from_millis(1500));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));

    session.tick(now + secs(3));
    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(host.log().plays, 1);
    assert!(session.notice().is_none());
}

#[test]
fn wrong_answer_in_place_keeps_checkpoint_active() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(1, CheckpointKind::Quiz), now);
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, LESSON_SECS, now);

    assert_eq!(session.submit_response(&text("no"), now).unwrap(), Verdict::Incorrect);
    assert_eq!(session.attention_score(), 90);
    assert_eq!(session.notice(), Some(&Notice::IncorrectAnswer { retry: true }));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));
    assert_eq!(session.active_checkpoint().unwrap().attempts, 1);

    assert_eq!(session.submit_response(&text("YES"), now).unwrap(), Verdict::Correct);
    assert_eq!(session.attention_score(), 95);
}

#[test]
fn wrong_answer_re_arm_fires_again_on_next_pass() {
    let host = host();
    let now = Instant::now();
    let config = EngagementConfig {
        retry_policy: RetryPolicy::ReArm,
        ..config_with_checkpoints(1, CheckpointKind::Quiz)
    };
    let mut session = session(&host, config, now);
    let trigger = session.checkpoints()[0].trigger_time;
    session.enable(now).unwrap();
    let stopped = play_until(&mut session, 0.0, LESSON_SECS, now);

    assert_eq!(session.submit_response(&text("nope"), now).unwrap(), Verdict::Incorrect);
    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(session.notice(), Some(&Notice::IncorrectAnswer { retry: false }));
    assert!(session.active_checkpoint().is_none());
    assert!(session.checkpoints()[0].is_pending());

    // Still inside the window: no immediate re-trigger.
    session.on_time_update(MediaCursor::playing(stopped + 0.5), now);
    assert_eq!(session.state(), SessionState::Playing);

    session.on_time_update(MediaCursor::playing(trigger + 2.0), now);
    session.seek(trigger - 5.0).unwrap();
    play_until(&mut session, trigger - 5.0, LESSON_SECS, now);

    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));
    assert_eq!(host.log().pauses, 2);
}

#[test]
fn completion_waits_for_every_checkpoint() {
    let host = host();
    let now = Instant::now();
    let config = EngagementConfig {
        retry_policy: RetryPolicy::ReArm,
        feedback_dwell_ms: 0,
        ..config_with_checkpoints(1, CheckpointKind::Quiz)
    };
    let mut session = session(&host, config, now);
    let trigger = session.checkpoints()[0].trigger_time;
    session.enable(now).unwrap();
    let stopped = play_until(&mut session, 0.0, LESSON_SECS, now);

    session.submit_response(&text("skip"), now).unwrap();
    play_until(&mut session, stopped + STEP_SECS, LESSON_SECS, now);
    session.on_ended();

    assert!(session.watched_fraction() >= 0.9);
    assert_eq!(session.state(), SessionState::Playing);
    assert!(session.take_completion().is_none());

    session.seek(trigger - 3.0).unwrap();
    play_until(&mut session, trigger - 3.0, LESSON_SECS, now);
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));

    session.submit_response(&text("yes"), now).unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert!(session.take_completion().unwrap().completed);
}

#[test]
fn fingerprint_resolves_when_typed_code_matches() {
    let host = host();
    let now = Instant::now();
    let config = EngagementConfig {
        feedback_dwell_ms: 0,
        ..config_with_checkpoints(1, CheckpointKind::FingerprintCode)
    };
    let mut session = session(&host, config, now);
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, LESSON_SECS, now);

    let code = session.active_checkpoint().unwrap().code.clone().unwrap();
    assert_eq!(code.len(), 4);
    assert_eq!(session.on_input_changed("0000", now), None);

    let mut typed = String::new();
    let digits: Vec<char> = code.chars().collect();
    for digit in &digits[..3] {
        typed.push(*digit);
        assert_eq!(session.on_input_changed(&typed, now), None);
    }
    typed.push(digits[3]);

    assert_eq!(session.on_input_changed(&typed, now), Some(Verdict::Correct));
    assert_eq!(session.state(), SessionState::Playing);
    assert!(session.checkpoints()[0].completed);
}

#[test]
fn gesture_checkpoint_accepts_completed_gesture() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(1, CheckpointKind::DragTarget), now);
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, LESSON_SECS, now);

    assert_eq!(
        session.submit_response(&Response::Gesture, now).unwrap(),
        Verdict::Correct
    );
}

#[test]
fn answer_without_active_checkpoint_is_rejected() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.enable(now).unwrap();

    assert!(matches!(
        session.submit_response(&text("yes"), now),
        Err(EngagementError::InvalidTransition { .. })
    ));
    assert_eq!(session.on_input_changed("1234", now), None);
}

#[test]
fn failed_pause_leaves_checkpoint_pending() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(1, CheckpointKind::Quiz), now);
    let trigger = session.checkpoints()[0].trigger_time;
    session.enable(now).unwrap();

    host.log().fail_pause = true;
    session.on_time_update(MediaCursor::playing(trigger), now);
    assert_eq!(session.state(), SessionState::Playing);
    assert!(session.checkpoints()[0].is_pending());
    assert!(session.active_checkpoint().is_none());

    host.log().fail_pause = false;
    session.on_time_update(MediaCursor::playing(trigger + 0.5), now);
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));
}

#[test]
fn hidden_tab_blocks_immediately() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, 20.0, now);

    session.on_visibility_change(false, now);
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::TabHidden));
    assert_eq!(session.notice(), Some(&Notice::TabHiddenPaused));
    assert_eq!(session.attention_score(), 95);
    assert_eq!(host.log().pauses, 1);

    assert!(session.resume(now).is_err());

    session.on_visibility_change(true, now);
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::TabHidden));
    session.resume(now).unwrap();
    assert_eq!(session.state(), SessionState::Playing);
}

#[test]
fn visibility_tracking_can_be_disabled() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.disable_visibility_tracking();
    session.enable(now).unwrap();

    session.on_visibility_change(false, now);
    session.tick(now + secs(1));
    assert_eq!(session.state(), SessionState::Playing);
}

#[test]
fn idle_tick_blocks_for_inactivity() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.enable(now).unwrap();

    session.tick(now + secs(20));
    assert_eq!(session.state(), SessionState::Playing);

    session.tick(now + secs(26));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Inactivity));
    assert_eq!(session.notice(), Some(&Notice::InactivityPaused));
    assert_eq!(session.attention_score(), 95);

    session.tick(now + secs(31));
    assert_eq!(session.attention_score(), 95);

    session.resume(now + secs(32)).unwrap();
    session.tick(now + secs(40));
    assert_eq!(session.state(), SessionState::Playing);
}

#[test]
fn activity_resumes_only_when_configured() {
    let host = host();
    let now = Instant::now();
    let mut manual = session(&host, no_checkpoints(), now);
    manual.enable(now).unwrap();
    manual.tick(now + secs(26));
    manual.on_activity(now + secs(27));
    assert_eq!(manual.state(), SessionState::Blocked(BlockReason::Inactivity));

    let config = EngagementConfig {
        auto_resume_on_activity: true,
        ..no_checkpoints()
    };
    let mut auto = session(&host, config, now);
    auto.enable(now).unwrap();
    auto.tick(now + secs(26));
    auto.on_activity(now + secs(27));
    assert_eq!(auto.state(), SessionState::Playing);
}

#[test]
fn refused_play_asks_learner_to_tap() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.enable(now).unwrap();
    session.tick(now + secs(26));

    host.log().fail_play = true;
    assert!(matches!(session.resume(now + secs(27)), Err(EngagementError::HostMedia(_))));
    assert_eq!(session.notice(), Some(&Notice::TapToResume));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Inactivity));

    host.log().fail_play = false;
    session.resume(now + secs(28)).unwrap();
    assert_eq!(session.state(), SessionState::Playing);
}

#[test]
fn seeks_are_rejected_and_reverted_while_blocked() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, no_checkpoints(), now);
    session.enable(now).unwrap();

    session.seek(100.0).unwrap();
    assert_eq!(host.log().time, 100.0);
    play_until(&mut session, 100.0, 110.0, now);

    session.on_visibility_change(false, now);
    assert!(matches!(
        session.seek(300.0),
        Err(EngagementError::SeekRejected { .. })
    ));
    assert_eq!(session.notice(), Some(&Notice::SeekBlocked));

    assert!(session.on_seeking(300.0));
    assert_eq!(host.log().time, 110.0);
    assert!(!session.on_seeking(110.0));
}

#[test]
fn attention_score_stays_in_bounds() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(1, CheckpointKind::Quiz), now);
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, LESSON_SECS, now);

    for _ in 0..15 {
        session.submit_response(&text("wrong"), now).unwrap();
    }
    assert_eq!(session.attention_score(), 0);

    session.submit_response(&text("yes"), now).unwrap();
    assert_eq!(session.attention_score(), 5);
}

#[test]
fn low_attention_nudge_does_not_count_toward_completion() {
    let host = host();
    let now = Instant::now();
    let config = EngagementConfig {
        feedback_dwell_ms: 0,
        low_attention_nudge: Some(LowAttentionNudge {
            threshold: 100,
            probability: 1.0,
        }),
        ..no_checkpoints()
    };
    let mut session = session(&host, config, now);
    session.enable(now).unwrap();

    session.on_visibility_change(false, now);
    session.on_visibility_change(true, now);
    session.resume(now).unwrap();
    assert_eq!(session.attention_score(), 95);

    session.tick(now + secs(1));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));
    let active = session.active_checkpoint().unwrap();
    assert!(!active.is_scheduled());
    assert_eq!(active.checkpoint.kind, CheckpointKind::Attention);

    session.submit_response(&text("continue"), now + secs(1)).unwrap();
    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(session.attention_score(), 100);
    assert!(session.checkpoints().is_empty());
}

#[test]
fn reset_starts_over_locked() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(2, CheckpointKind::Quiz), now);
    let first_ids: Vec<String> = session.checkpoints().iter().map(|cp| cp.id.clone()).collect();

    session.enable(now).unwrap();
    play_until(&mut session, 0.0, LESSON_SECS, now);
    session.submit_response(&text("no"), now).unwrap();

    session.reset(now).unwrap();
    assert_eq!(session.state(), SessionState::Locked);
    assert_eq!(session.watched_fraction(), 0.0);
    assert_eq!(session.attention_score(), 100);
    assert!(session.active_checkpoint().is_none());
    assert_eq!(session.checkpoints().len(), 2);
    assert!(session
        .checkpoints()
        .iter()
        .all(|cp| cp.is_pending() && !first_ids.contains(&cp.id)));
}

#[test]
fn tab_hidden_during_feedback_dwell_stays_paused_without_penalty() {
    let host = host();
    let now = Instant::now();
    let mut session = session(&host, config_with_checkpoints(1, CheckpointKind::Quiz), now);
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, LESSON_SECS, now);

    session.submit_response(&text("yes"), now).unwrap();
    session.on_visibility_change(false, now + Duration::from_millis(500));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));

    session.tick(now + secs(3));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::TabHidden));
    assert_eq!(session.notice(), Some(&Notice::TabHiddenPaused));
    assert_eq!(host.log().plays, 0);
    assert_eq!(host.log().pauses, 1);
    assert_eq!(session.attention_score(), 100);

    session.on_visibility_change(true, now + secs(4));
    session.resume(now + secs(4)).unwrap();
    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(host.log().plays, 1);
}

#[test]
fn auto_resume_into_hidden_tab_keeps_playback_paused() {
    let host = host();
    let now = Instant::now();
    let config = EngagementConfig {
        auto_resume_on_activity: true,
        ..no_checkpoints()
    };
    let mut session = session(&host, config, now);
    session.enable(now).unwrap();
    session.tick(now + secs(26));
    assert_eq!(session.attention_score(), 95);

    session.on_visibility_change(false, now + secs(27));
    session.on_activity(now + secs(28));

    assert_eq!(session.state(), SessionState::Blocked(BlockReason::TabHidden));
    assert_eq!(host.log().plays, 0);
    assert_eq!(session.attention_score(), 95);
}

#[test]
fn nudge_holds_the_slot_while_cursor_crosses_a_checkpoint() {
    let host = host();
    let now = Instant::now();
    let config = EngagementConfig {
        low_attention_nudge: Some(LowAttentionNudge {
            threshold: 100,
            probability: 1.0,
        }),
        ..config_with_checkpoints(1, CheckpointKind::Quiz)
    };
    let mut session = session(&host, config, now);
    let trigger = session.checkpoints()[0].trigger_time;
    session.enable(now).unwrap();
    play_until(&mut session, 0.0, trigger - 2.0, now);

    session.on_visibility_change(false, now);
    session.on_visibility_change(true, now);
    session.resume(now).unwrap();
    session.drain_events();

    session.tick(now + secs(1));
    assert_eq!(session.state(), SessionState::Blocked(BlockReason::Checkpoint));
    assert!(!session.active_checkpoint().unwrap().is_scheduled());

    for step in 0..8 {
        let time = trigger - 0.5 + step as f64 * STEP_SECS;
        session.on_time_update(MediaCursor::playing(time), now + secs(1));
    }

    assert!(session.checkpoints()[0].is_pending());
    assert!(!session.active_checkpoint().unwrap().is_scheduled());
    let activations = session
        .drain_events()
        .iter()
        .filter(|event| matches!(event, EngagementEvent::CheckpointActivated { .. }))
        .count();
    assert_eq!(activations, 1);
}
