//! Cooperative, single-threaded timer scheduling in virtual time.
//!
//! Frames, repeating intervals and one-shot timeouts all live in one
//! [`Scheduler`]. Nothing fires on its own: the host drains due timers with
//! [`Scheduler::pop_due`] and dispatches each [`Wake`] to whoever armed it.
//!
//! Components keep exactly one [`Slot`] per mechanism. Arming a slot cancels
//! the handle it held, and a fired timer is only acted on when its id is still
//! the one held by the slot, so a superseded callback can never mutate state.

use std::collections::BTreeMap;
use std::time::Duration;

/// Handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Which typewriter instance a wake belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Banner,
    Command,
    Exit,
}

/// Step of a typewriter's reveal cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePhase {
    /// Start delay elapsed; begin revealing characters.
    Start,
    /// Reveal the next character.
    Char,
    /// Deliver the completion notification.
    Emit,
}

/// Everything a timer can wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Progress clock of the sequence engine.
    EngineFrame,
    /// Line-map highlight cycling.
    MapCycle,
    Typewriter(Channel, TypePhase),
    /// Overlay dismissal after the exit command.
    ExitClose,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub wake: Wake,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    due: Duration,
    wake: Wake,
    /// `Some` for repeating timers.
    period: Option<Duration>,
}

/// Virtual-time scheduler.
#[derive(Debug)]
pub struct Scheduler {
    now: Duration,
    frame_interval: Duration,
    next_id: u64,
    timers: BTreeMap<TimerId, Timer>,
}

impl Scheduler {
    /// Creates a scheduler whose frames come every `frame_interval`.
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            frame_interval: frame_interval.max(Duration::from_millis(1)),
            next_id: 0,
            timers: BTreeMap::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Arms a one-shot callback for the next frame.
    pub fn request_frame(&mut self, wake: Wake) -> TimerId {
        self.arm(self.now + self.frame_interval, wake, None)
    }

    /// Arms a repeating timer. The first tick comes one period from now.
    pub fn set_interval(&mut self, period: Duration, wake: Wake) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.arm(self.now + period, wake, Some(period))
    }

    /// Arms a one-shot timer. A zero delay fires on the next drain.
    pub fn set_timeout(&mut self, delay: Duration, wake: Wake) -> TimerId {
        self.arm(self.now + delay, wake, None)
    }

    /// Cancels a timer. Unknown or already-fired ids are ignored.
    pub fn cancel(&mut self, id: TimerId) {
        self.timers.remove(&id);
    }

    /// Whether the timer is still armed.
    #[cfg(test)]
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Number of armed timers.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Earliest pending deadline.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.values().map(|t| t.due).min()
    }

    /// Takes the earliest timer due at or before `until`.
    ///
    /// Advances `now` to the timer's due time. Ties fire in arming order.
    /// Repeating timers are re-armed one period later under the same id.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired> {
        let (id, timer) = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(id, t)| (t.due, **id))
            .map(|(id, t)| (*id, *t))?;

        self.now = self.now.max(timer.due);
        match timer.period {
            Some(period) => {
                if let Some(t) = self.timers.get_mut(&id) {
                    t.due += period;
                }
            }
            None => {
                self.timers.remove(&id);
            }
        }

        Some(Fired {
            id,
            wake: timer.wake,
        })
    }

    /// Moves the clock forward to `until` once everything due is drained.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    fn arm(&mut self, due: Duration, wake: Wake, period: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, Timer { due, wake, period });
        id
    }
}

/// Holder for at most one timer handle of a given mechanism.
#[derive(Debug, Default)]
pub struct Slot(Option<TimerId>);

impl Slot {
    /// Stores `id`, cancelling whatever the slot held before.
    pub fn arm(&mut self, sched: &mut Scheduler, id: TimerId) {
        self.clear(sched);
        self.0 = Some(id);
    }

    /// Cancels the held timer, if any.
    pub fn clear(&mut self, sched: &mut Scheduler) {
        if let Some(id) = self.0.take() {
            sched.cancel(id);
        }
    }

    pub fn holds(&self, id: TimerId) -> bool {
        self.0 == Some(id)
    }

    pub fn is_armed(&self) -> bool {
        self.0.is_some()
    }

    /// Releases a fired one-shot. Returns false for stale ids.
    pub fn take_if(&mut self, id: TimerId) -> bool {
        if self.holds(id) {
            self.0 = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(sched: &mut Scheduler, until: Duration) -> Vec<Fired> {
        let mut fired = Vec::new();
        while let Some(f) = sched.pop_due(until) {
            fired.push(f);
        }
        sched.settle(until);
        fired
    }

    #[test]
    fn frames_fire_once() {
        let mut sched = Scheduler::new(ms(16));
        let id = sched.request_frame(Wake::EngineFrame);

        assert!(drain(&mut sched, ms(15)).is_empty());
        let fired = drain(&mut sched, ms(16));
        assert_eq!(fired, vec![Fired { id, wake: Wake::EngineFrame }]);
        assert!(drain(&mut sched, ms(100)).is_empty());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn intervals_repeat_under_one_id() {
        let mut sched = Scheduler::new(ms(16));
        let id = sched.set_interval(ms(100), Wake::MapCycle);

        let fired = drain(&mut sched, ms(350));
        assert_eq!(fired.len(), 3);
        assert!(fired.iter().all(|f| f.id == id));
        assert_eq!(sched.next_due(), Some(ms(400)));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut sched = Scheduler::new(ms(16));
        let a = sched.set_timeout(ms(10), Wake::ExitClose);
        let b = sched.set_interval(ms(5), Wake::MapCycle);
        sched.cancel(a);
        sched.cancel(b);
        sched.cancel(b);

        assert!(drain(&mut sched, ms(1000)).is_empty());
    }

    #[test]
    fn due_order_then_arming_order() {
        let mut sched = Scheduler::new(ms(16));
        let late = sched.set_timeout(ms(20), Wake::ExitClose);
        let first = sched.set_timeout(ms(10), Wake::MapCycle);
        let second = sched.set_timeout(ms(10), Wake::EngineFrame);

        let ids: Vec<TimerId> = drain(&mut sched, ms(30)).iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![first, second, late]);
    }

    #[test]
    fn clock_tracks_fired_timer() {
        let mut sched = Scheduler::new(ms(16));
        sched.set_timeout(ms(40), Wake::ExitClose);

        sched.pop_due(ms(100)).unwrap();
        assert_eq!(sched.now(), ms(40));
        sched.settle(ms(100));
        assert_eq!(sched.now(), ms(100));
    }

    #[test]
    fn zero_timeout_fires_on_next_drain() {
        let mut sched = Scheduler::new(ms(16));
        sched.settle(ms(50));
        let id = sched.set_timeout(Duration::ZERO, Wake::ExitClose);

        assert!(sched.is_armed(id));
        assert_eq!(sched.pop_due(ms(50)).map(|f| f.id), Some(id));
    }

    #[test]
    fn slot_keeps_one_handle() {
        let mut sched = Scheduler::new(ms(16));
        let mut slot = Slot::default();

        let old = sched.request_frame(Wake::EngineFrame);
        slot.arm(&mut sched, old);
        let new = sched.request_frame(Wake::EngineFrame);
        slot.arm(&mut sched, new);

        assert!(!sched.is_armed(old));
        assert!(slot.holds(new));
        assert!(!slot.take_if(old));
        assert!(slot.take_if(new));
        assert!(!slot.is_armed());
    }
}
