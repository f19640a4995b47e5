use std::time::{Duration, Instant};

/// Most recent input and visibility as reported by the host.
#[derive(Debug, Clone, Copy)]
pub struct ActivityState {
    pub last_activity_at: Instant,
    pub tab_visible: bool,
}

/// Watches for idle input and hidden tabs.
///
/// The monitor never touches the media element. It reports conditions and
/// the session decides which transition to request.
#[derive(Debug, Clone)]
pub struct ActivityMonitor {
    state: ActivityState,
    idle_threshold: Duration,
    visibility_supported: bool,
    idle_flagged: bool,
}

impl ActivityMonitor {
    pub fn new(idle_threshold: Duration, now: Instant) -> Self {
        Self {
            state: ActivityState {
                last_activity_at: now,
                tab_visible: true,
            },
            idle_threshold,
            visibility_supported: true,
            idle_flagged: false,
        }
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn record_activity(&mut self, now: Instant) {
        self.state.last_activity_at = now;
        self.idle_flagged = false;
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.state.last_activity_at) > self.idle_threshold
    }

    /// Idle and not yet reported since the last activity.
    pub fn newly_idle(&self, now: Instant) -> bool {
        !self.idle_flagged && self.is_idle(now)
    }

    pub fn flag_idle(&mut self) {
        self.idle_flagged = true;
    }

    /// Returns `true` when the visibility actually changed.
    pub fn set_tab_visible(&mut self, visible: bool, now: Instant) -> bool {
        if !self.visibility_supported || self.state.tab_visible == visible {
            return false;
        }
        self.state.tab_visible = visible;
        if visible {
            self.record_activity(now);
        }
        true
    }

    pub fn tab_visible(&self) -> bool {
        self.state.tab_visible
    }

    pub fn visibility_supported(&self) -> bool {
        self.visibility_supported
    }

    /// For hosts without a visibility API. The tab is treated as always visible.
    pub fn disable_visibility_tracking(&mut self) {
        self.visibility_supported = false;
        self.state.tab_visible = true;
    }
}
