//! Wall-clock timing of nested computational phases.

use std::time::Instant;

#[cfg(test)]
#[path = "timer_tests.rs"]
mod timer_tests;

/// Structure timing nested, named phases of a computation.
///
/// Every event is logged at debug level together with three durations in seconds, formatted as
/// `[diff/section/total]`: the time since the previous event, the time since the innermost open
/// phase began, and the time since the timer was created.
#[derive(Debug)]
pub struct PhaseTimer {
    /// The instant at which the timer was created.
    init_time: Instant,

    /// The instant of the previous event.
    prev_time: Instant,

    /// The names and start instants of the open phases, outermost first.
    phases: Vec<(String, Instant)>,
}

impl PhaseTimer {
    /// Creates a timer with no open phases.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            init_time: now,
            prev_time: now,
            phases: vec![],
        }
    }

    /// Logs the legend of the durations attached to every event. This is meant to be called once
    /// per run, before any timer is used.
    pub fn log_format() {
        log::debug!("Timing format: [diff/section/total]s");
    }

    /// Returns the number of open phases.
    pub fn depth(&self) -> usize {
        self.phases.len()
    }

    /// Opens a new phase nested inside any currently open phases.
    pub fn start(&mut self, event: &str) {
        let now = Instant::now();
        self.phases.push((event.to_string(), now));
        log::debug!("BEG OF {} {}", self.status(), self.durations(now));
        self.prev_time = now;
    }

    /// Marks the end of a step within the innermost open phase.
    pub fn checkpoint(&mut self, event: &str) {
        let now = Instant::now();
        log::debug!("END OF {event} {}", self.durations(now));
        self.prev_time = now;
    }

    /// Closes the innermost open phase. Does nothing if no phase is open.
    pub fn end(&mut self) {
        let now = Instant::now();
        if self.phases.is_empty() {
            log::warn!("Attempted to end a timing phase, but no phase is open.");
            return;
        }
        log::debug!("END OF {} {}", self.status(), self.durations(now));
        self.phases.pop();
        self.prev_time = now;
    }

    /// Returns the open phases, innermost first, separated by `<<`.
    fn status(&self) -> String {
        self.phases
            .iter()
            .rev()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(" << ")
    }

    /// Formats the `[diff/section/total]` durations at `now`.
    fn durations(&self, now: Instant) -> String {
        let section_start = self
            .phases
            .last()
            .map(|(_, t)| *t)
            .unwrap_or(self.init_time);
        format!(
            "[{:.3}/{:.3}/{:.3}]s",
            now.duration_since(self.prev_time).as_secs_f64(),
            now.duration_since(section_start).as_secs_f64(),
            now.duration_since(self.init_time).as_secs_f64(),
        )
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}
