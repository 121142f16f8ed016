//! Typewriter effect: reveals a string one character at a time.
//!
//! Completion is always delivered through a zero-delay timeout, never from
//! inside the call that caused it, and at most once per text.

use std::time::Duration;

use crate::schedule::{Channel, Scheduler, Slot, TimerId, TypePhase, Wake};

const MIN_CHAR_INTERVAL: Duration = Duration::from_millis(8);

/// Reveal pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypewriterTiming {
    pub char_interval: Duration,
    pub start_delay: Duration,
}

impl TypewriterTiming {
    /// Default start delay with a custom per-character interval.
    pub fn with_char_interval(char_interval: Duration) -> Self {
        Self {
            char_interval,
            ..Self::default()
        }
    }

    fn interval(self) -> Duration {
        self.char_interval.max(MIN_CHAR_INTERVAL)
    }
}

impl Default for TypewriterTiming {
    fn default() -> Self {
        Self {
            char_interval: Duration::from_millis(28),
            start_delay: Duration::from_millis(60),
        }
    }
}

#[derive(Debug)]
pub struct Typewriter {
    channel: Channel,
    timing: TypewriterTiming,
    reduced_motion: bool,

    text: String,
    char_count: usize,
    visible: usize,
    emitted: bool,

    /// Start delay, character interval or completion emit; never more than one.
    timer: Slot,
}

impl Typewriter {
    pub fn new(channel: Channel, timing: TypewriterTiming, reduced_motion: bool) -> Self {
        Self {
            channel,
            timing,
            reduced_motion,
            text: String::new(),
            char_count: 0,
            visible: 0,
            emitted: false,
            timer: Slot::default(),
        }
    }

    /// Starts typing `text` from the beginning, superseding any previous text.
    pub fn start(&mut self, sched: &mut Scheduler, text: impl Into<String>) {
        self.timer.clear(sched);
        self.text = text.into();
        self.char_count = self.text.chars().count();
        self.visible = 0;
        self.emitted = false;

        if self.reduced_motion || self.char_count == 0 {
            self.reveal_all(sched);
        } else {
            let id = sched.set_timeout(
                self.timing.start_delay,
                Wake::Typewriter(self.channel, TypePhase::Start),
            );
            self.timer.arm(sched, id);
        }
    }

    /// Drops the text and cancels pending timers. No completion follows.
    pub fn clear(&mut self, sched: &mut Scheduler) {
        self.timer.clear(sched);
        self.text.clear();
        self.char_count = 0;
        self.visible = 0;
        self.emitted = false;
    }

    pub fn set_reduced_motion(&mut self, sched: &mut Scheduler, on: bool) {
        self.reduced_motion = on;
        if on && self.is_started() && self.visible < self.char_count {
            self.reveal_all(sched);
        }
    }

    /// Handles a wake on this typewriter's channel.
    ///
    /// Returns true exactly once per text: when its completion is delivered.
    pub fn on_wake(&mut self, sched: &mut Scheduler, id: TimerId, phase: TypePhase) -> bool {
        if !self.timer.holds(id) {
            return false;
        }

        match phase {
            TypePhase::Start => {
                let id = sched.set_interval(
                    self.timing.interval(),
                    Wake::Typewriter(self.channel, TypePhase::Char),
                );
                self.timer.arm(sched, id);
                false
            }
            TypePhase::Char => {
                self.visible = (self.visible + 1).min(self.char_count);
                if self.visible == self.char_count {
                    self.schedule_emit(sched);
                }
                false
            }
            TypePhase::Emit => {
                self.timer.take_if(id);
                if self.emitted {
                    return false;
                }
                self.emitted = true;
                tracing::trace!(channel = ?self.channel, "typewriter complete");
                true
            }
        }
    }

    /// The revealed prefix, cut on a character boundary.
    pub fn visible_text(&self) -> &str {
        match self.text.char_indices().nth(self.visible) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    /// Whether every character is showing.
    pub fn is_revealed(&self) -> bool {
        self.visible >= self.char_count
    }

    /// Whether completion has been delivered.
    #[cfg(test)]
    pub fn is_complete(&self) -> bool {
        self.emitted
    }

    /// Whether the typing cursor should follow the text.
    pub fn shows_cursor(&self) -> bool {
        !self.reduced_motion && !self.is_revealed()
    }

    fn is_started(&self) -> bool {
        self.timer.is_armed() || self.emitted || self.visible > 0
    }

    fn reveal_all(&mut self, sched: &mut Scheduler) {
        self.visible = self.char_count;
        self.schedule_emit(sched);
    }

    fn schedule_emit(&mut self, sched: &mut Scheduler) {
        let id = sched.set_timeout(
            Duration::ZERO,
            Wake::Typewriter(self.channel, TypePhase::Emit),
        );
        self.timer.arm(sched, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Drains to `until`; returns how many completions were delivered.
    fn advance(tw: &mut Typewriter, sched: &mut Scheduler, until: Duration) -> usize {
        let mut completions = 0;
        while let Some(fired) = sched.pop_due(until) {
            if let Wake::Typewriter(_, phase) = fired.wake {
                if tw.on_wake(sched, fired.id, phase) {
                    completions += 1;
                }
            }
        }
        sched.settle(until);
        completions
    }

    fn typewriter(reduced_motion: bool) -> Typewriter {
        let timing = TypewriterTiming {
            char_interval: ms(10),
            start_delay: ms(50),
        };
        Typewriter::new(Channel::Command, timing, reduced_motion)
    }

    #[test]
    fn reveals_after_start_delay() {
        let mut sched = Scheduler::new(ms(16));
        let mut tw = typewriter(false);
        tw.start(&mut sched, "abc");

        assert_eq!(advance(&mut tw, &mut sched, ms(59)), 0);
        assert_eq!(tw.visible_text(), "");
        assert!(tw.shows_cursor());

        advance(&mut tw, &mut sched, ms(60));
        assert_eq!(tw.visible_text(), "a");
        advance(&mut tw, &mut sched, ms(70));
        assert_eq!(tw.visible_text(), "ab");

        assert_eq!(advance(&mut tw, &mut sched, ms(80)), 1);
        assert_eq!(tw.visible_text(), "abc");
        assert!(tw.is_complete());
        assert!(!tw.shows_cursor());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn reduced_motion_shows_everything_then_completes_async() {
        let mut sched = Scheduler::new(ms(16));
        let mut tw = typewriter(true);
        tw.start(&mut sched, "x@ios % exit");

        assert_eq!(tw.visible_text(), "x@ios % exit");
        assert!(!tw.is_complete());
        assert_eq!(advance(&mut tw, &mut sched, ms(0)), 1);
        assert_eq!(advance(&mut tw, &mut sched, ms(500)), 0);
    }

    #[test]
    fn empty_text_completes_async() {
        let mut sched = Scheduler::new(ms(16));
        let mut tw = typewriter(false);
        tw.start(&mut sched, "");

        assert!(tw.is_revealed());
        assert_eq!(advance(&mut tw, &mut sched, ms(0)), 1);
    }

    #[test]
    fn superseded_text_never_completes() {
        let mut sched = Scheduler::new(ms(16));
        let mut tw = typewriter(false);
        tw.start(&mut sched, "first");
        advance(&mut tw, &mut sched, ms(75));
        assert_eq!(tw.visible_text(), "fi");

        tw.start(&mut sched, "go");
        assert_eq!(tw.visible_text(), "");
        assert_eq!(advance(&mut tw, &mut sched, ms(1000)), 1);
        assert_eq!(tw.visible_text(), "go");
    }

    #[test]
    fn clear_cancels_completion() {
        let mut sched = Scheduler::new(ms(16));
        let mut tw = typewriter(true);
        tw.start(&mut sched, "abc");
        tw.clear(&mut sched);

        assert_eq!(advance(&mut tw, &mut sched, ms(100)), 0);
        assert_eq!(sched.pending(), 0);
        assert_eq!(tw.visible_text(), "");
    }

    #[test]
    fn reduced_motion_mid_reveal_finishes_once() {
        let mut sched = Scheduler::new(ms(16));
        let mut tw = typewriter(false);
        tw.start(&mut sched, "abcdef");
        advance(&mut tw, &mut sched, ms(70));

        tw.set_reduced_motion(&mut sched, true);
        assert_eq!(tw.visible_text(), "abcdef");
        assert_eq!(advance(&mut tw, &mut sched, ms(1000)), 1);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let mut sched = Scheduler::new(ms(16));
        let mut tw = typewriter(false);
        tw.start(&mut sched, "é█z");

        advance(&mut tw, &mut sched, ms(70));
        assert_eq!(tw.visible_text(), "é█");
    }

    #[test]
    fn char_interval_has_a_floor() {
        let timing = TypewriterTiming::with_char_interval(ms(1));
        assert_eq!(timing.interval(), MIN_CHAR_INTERVAL);
        assert_eq!(timing.start_delay, ms(60));
    }

    proptest! {
        #[test]
        fn completes_exactly_once(text in "\\PC{0,40}", interval in 1u64..40, reduced in any::<bool>()) {
            let mut sched = Scheduler::new(ms(16));
            let timing = TypewriterTiming { char_interval: ms(interval), start_delay: ms(60) };
            let mut tw = Typewriter::new(Channel::Banner, timing, reduced);
            tw.start(&mut sched, text.clone());

            let mut completions = 0;
            let mut last_len = 0;
            for step in 0..=200u64 {
                completions += advance(&mut tw, &mut sched, ms(step * 20));
                prop_assert!(tw.visible_text().len() >= last_len);
                last_len = tw.visible_text().len();
            }
            prop_assert_eq!(completions, 1);
            prop_assert_eq!(tw.visible_text(), text.as_str());
            prop_assert_eq!(sched.pending(), 0);
        }
    }
}
