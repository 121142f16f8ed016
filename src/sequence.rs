//! Sequence engine: the single source of truth for what is visible right now.
//!
//! The engine splits a fixed time budget evenly across the playback stages and
//! runs a per-frame progress clock through them. It also cycles the active
//! line-map entry of the current stage on an independent interval.
//!
//! # Invariants
//!
//! 1. At most one frame and one cycling timer are armed; both are cleared
//!    before re-arming and on every transition out of `Running`.
//! 2. A frame or cycling wake whose id is no longer held is ignored, so a
//!    callback from a previous stage or status never mutates state.
//! 3. `progress` and `stage_progress` stay in `[0, 1]`; both are exactly 1
//!    when the last stage completes or the sequence is skipped.
//! 4. With zero playback stages no timer is ever armed.

use std::time::Duration;

use crate::model::{LineMapEntry, PlaybackStage};
use crate::schedule::{Fired, Scheduler, Slot, Wake};

pub const DEFAULT_TOTAL_DURATION: Duration = Duration::from_millis(15_000);
pub const DEFAULT_REDUCED_MOTION_DURATION: Duration = Duration::from_millis(5_000);

/// Fastest the line-map highlight may move.
const MIN_MAP_INTERVAL: Duration = Duration::from_millis(160);

/// How a finished sequence got there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// The clock ran through the last stage.
    Completed,
    /// The user jumped to the end.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Paused,
    Finished(Finish),
}

impl Status {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceOptions {
    pub auto_play: bool,
    pub total_duration: Duration,
    pub reduced_motion_duration: Duration,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            auto_play: false,
            total_duration: DEFAULT_TOTAL_DURATION,
            reduced_motion_duration: DEFAULT_REDUCED_MOTION_DURATION,
        }
    }
}

/// Per-stage time slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    durations: Vec<Duration>,
    offsets: Vec<Duration>,
    total: Duration,
}

impl Timing {
    /// Divides `total` evenly across `stage_count` stages.
    ///
    /// Offsets are rounded down to the nanosecond, so the durations always sum
    /// to exactly `total`.
    pub fn new(stage_count: usize, total: Duration) -> Self {
        if stage_count == 0 {
            return Self {
                durations: Vec::new(),
                offsets: Vec::new(),
                total: Duration::ZERO,
            };
        }

        let total_nanos = total.as_nanos();
        let count = stage_count as u128;
        let boundary = |i: usize| {
            let nanos = total_nanos * i as u128 / count;
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };

        let offsets: Vec<Duration> = (0..stage_count).map(boundary).collect();
        let durations = (0..stage_count)
            .map(|i| boundary(i + 1) - offsets[i])
            .collect();

        Self {
            durations,
            offsets,
            total,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn duration(&self, index: usize) -> Duration {
        self.durations.get(index).copied().unwrap_or_default()
    }

    pub fn offset(&self, index: usize) -> Duration {
        self.offsets.get(index).copied().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn durations(&self) -> &[Duration] {
        &self.durations
    }

    /// Overall progress at `elapsed` into stage `index`.
    fn progress_at(&self, index: usize, elapsed: Duration) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        ((self.offset(index) + elapsed).as_secs_f64() / self.total.as_secs_f64()).min(1.0)
    }
}

/// Read-only view of the engine state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceSnapshot {
    pub status: Status,
    pub current_index: usize,
    pub stage_count: usize,
    pub progress: f64,
    pub stage_progress: f64,
    pub active_map_entry: Option<LineMapEntry>,
    pub reduced_motion: bool,
    pub total_duration: Duration,
    pub stage_duration: Duration,
}

/// Timed playback of an ordered stage list.
#[derive(Debug)]
pub struct SequenceEngine {
    stages: Vec<PlaybackStage>,
    options: SequenceOptions,
    reduced_motion: bool,
    timing: Timing,

    status: Status,
    current_index: usize,
    progress: f64,
    stage_progress: f64,
    active_map_index: usize,
    /// Virtual time at which the current stage's clock reads zero.
    stage_started_at: Duration,

    frame: Slot,
    map_cycle: Slot,
}

impl SequenceEngine {
    pub fn new(
        sched: &mut Scheduler,
        stages: Vec<PlaybackStage>,
        options: SequenceOptions,
        reduced_motion: bool,
    ) -> Self {
        let timing = Timing::new(stages.len(), budget(&options, reduced_motion));
        let mut engine = Self {
            stages,
            options,
            reduced_motion,
            timing,
            status: Status::Idle,
            current_index: 0,
            progress: 0.0,
            stage_progress: 0.0,
            active_map_index: 0,
            stage_started_at: Duration::ZERO,
            frame: Slot::default(),
            map_cycle: Slot::default(),
        };
        if options.auto_play {
            engine.play(sched);
        }
        engine
    }

    // ── Transport ──

    /// Starts or resumes playback. On a finished sequence this restarts.
    pub fn play(&mut self, sched: &mut Scheduler) {
        match self.status {
            Status::Running => {}
            Status::Finished(_) => self.restart(sched),
            Status::Idle | Status::Paused => {
                if self.stages.is_empty() {
                    self.finish(sched, Finish::Completed);
                    return;
                }
                self.set_status(Status::Running);
                self.arm_stage_clock(sched);
                self.sync_map_cycle(sched);
            }
        }
    }

    pub fn pause(&mut self, sched: &mut Scheduler) {
        if self.status != Status::Running {
            return;
        }
        self.frame.clear(sched);
        self.set_status(Status::Paused);
        self.sync_map_cycle(sched);
    }

    /// Resets to the first stage and plays from zero.
    pub fn restart(&mut self, sched: &mut Scheduler) {
        self.clear_timers(sched);
        self.current_index = 0;
        self.progress = 0.0;
        self.stage_progress = 0.0;
        self.active_map_index = 0;

        if self.stages.is_empty() {
            self.finish(sched, Finish::Completed);
            return;
        }
        self.set_status(Status::Running);
        self.arm_stage_clock(sched);
        self.sync_map_cycle(sched);
    }

    /// Jumps to the end of the last stage.
    pub fn skip(&mut self, sched: &mut Scheduler) {
        self.clear_timers(sched);
        self.current_index = self.stages.len().saturating_sub(1);
        self.finish(sched, Finish::Skipped);
    }

    /// Moves to the start of stage `index` and pauses there.
    ///
    /// Out-of-range indices are ignored.
    pub fn jump_to(&mut self, sched: &mut Scheduler, index: usize) {
        if index >= self.stages.len() {
            return;
        }
        self.clear_timers(sched);
        self.current_index = index;
        self.stage_progress = 0.0;
        self.progress = self.timing.progress_at(index, Duration::ZERO);
        self.active_map_index = 0;
        self.set_status(Status::Paused);
    }

    /// Applies a new reduced-motion preference, rescaling the time budget.
    pub fn set_reduced_motion(&mut self, sched: &mut Scheduler, on: bool) {
        if self.reduced_motion == on {
            return;
        }
        self.reduced_motion = on;
        self.timing = Timing::new(self.stages.len(), budget(&self.options, on));
        tracing::debug!(reduced_motion = on, total = ?self.timing.total(), "sequence retimed");

        match self.status {
            Status::Running => {
                self.arm_stage_clock(sched);
                self.sync_map_cycle(sched);
            }
            Status::Paused | Status::Idle => {
                let elapsed = self
                    .timing
                    .duration(self.current_index)
                    .mul_f64(self.stage_progress);
                self.progress = self.timing.progress_at(self.current_index, elapsed);
            }
            Status::Finished(_) => {}
        }
    }

    /// Releases every timer. The engine is inert afterwards until played.
    pub fn dispose(&mut self, sched: &mut Scheduler) {
        self.clear_timers(sched);
    }

    /// Handles a fired timer. Wakes the engine did not arm are ignored.
    pub fn on_wake(&mut self, sched: &mut Scheduler, fired: Fired) {
        match fired.wake {
            Wake::EngineFrame => {
                if self.frame.take_if(fired.id) && self.status == Status::Running {
                    self.tick(sched);
                }
            }
            Wake::MapCycle => {
                if self.map_cycle.holds(fired.id)
                    && self.status == Status::Running
                    && let Some(stage) = self.current_stage()
                {
                    self.active_map_index = (self.active_map_index + 1) % stage.map.len().max(1);
                }
            }
            Wake::Typewriter(..) | Wake::ExitClose => {}
        }
    }

    // ── State ──

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_stage(&self) -> Option<&PlaybackStage> {
        self.stages.get(self.current_index)
    }

    pub fn stages(&self) -> &[PlaybackStage] {
        &self.stages
    }

    #[cfg(test)]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn stage_progress(&self) -> f64 {
        self.stage_progress
    }

    #[cfg(test)]
    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    #[cfg(test)]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// The highlighted line-map entry of the current stage.
    pub fn active_map_entry(&self) -> Option<LineMapEntry> {
        let map = &self.current_stage()?.map;
        let last = map.len().checked_sub(1)?;
        map.get(self.active_map_index.min(last)).copied()
    }

    pub fn snapshot(&self) -> SequenceSnapshot {
        SequenceSnapshot {
            status: self.status,
            current_index: self.current_index,
            stage_count: self.stages.len(),
            progress: self.progress,
            stage_progress: self.stage_progress,
            active_map_entry: self.active_map_entry(),
            reduced_motion: self.reduced_motion,
            total_duration: self.timing.total(),
            stage_duration: self.timing.duration(self.current_index),
        }
    }

    // ── Clock ──

    /// Anchors the stage clock so the current `stage_progress` is kept, then
    /// requests the next frame.
    fn arm_stage_clock(&mut self, sched: &mut Scheduler) {
        let duration = self.timing.duration(self.current_index);
        let elapsed = duration.mul_f64(self.stage_progress.clamp(0.0, 1.0));
        self.stage_started_at = sched.now().saturating_sub(elapsed);
        self.progress = self.timing.progress_at(self.current_index, elapsed);
        let id = sched.request_frame(Wake::EngineFrame);
        self.frame.arm(sched, id);
    }

    fn tick(&mut self, sched: &mut Scheduler) {
        let index = self.current_index;
        let duration = self.timing.duration(index);
        let elapsed = sched
            .now()
            .saturating_sub(self.stage_started_at)
            .min(duration);

        self.stage_progress = if duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / duration.as_secs_f64()
        };
        self.progress = self.timing.progress_at(index, elapsed);

        // A stage within one frame of its end is done.
        if elapsed < duration.saturating_sub(sched.frame_interval()) {
            let id = sched.request_frame(Wake::EngineFrame);
            self.frame.arm(sched, id);
            return;
        }

        if index + 1 >= self.stages.len() {
            self.finish(sched, Finish::Completed);
            return;
        }

        // The next stage's clock starts at the boundary, not at this tick.
        self.current_index = index + 1;
        self.stage_started_at += duration;
        let next = self.timing.duration(self.current_index);
        let elapsed = sched
            .now()
            .saturating_sub(self.stage_started_at)
            .min(next);
        self.stage_progress = if next.is_zero() {
            0.0
        } else {
            elapsed.as_secs_f64() / next.as_secs_f64()
        };
        self.progress = self.timing.progress_at(self.current_index, elapsed);
        tracing::debug!(stage = self.current_index, "sequence advanced");

        let id = sched.request_frame(Wake::EngineFrame);
        self.frame.arm(sched, id);
        self.sync_map_cycle(sched);
    }

    fn finish(&mut self, sched: &mut Scheduler, how: Finish) {
        self.clear_timers(sched);
        self.progress = 1.0;
        self.stage_progress = 1.0;
        self.active_map_index = 0;
        self.set_status(Status::Finished(how));
    }

    /// Re-arms line-map cycling for the current stage and status.
    ///
    /// Always restarts the highlight at the first entry. Single-entry maps
    /// never get a timer.
    fn sync_map_cycle(&mut self, sched: &mut Scheduler) {
        self.map_cycle.clear(sched);
        self.active_map_index = 0;

        if self.status != Status::Running || self.reduced_motion {
            return;
        }
        let Some(stage) = self.stages.get(self.current_index) else {
            return;
        };
        let len = stage.map.len();
        if len < 2 {
            return;
        }

        let per_entry = self.timing.duration(self.current_index) / u32::try_from(len).unwrap_or(u32::MAX);
        let id = sched.set_interval(per_entry.max(MIN_MAP_INTERVAL), Wake::MapCycle);
        self.map_cycle.arm(sched, id);
    }

    fn clear_timers(&mut self, sched: &mut Scheduler) {
        self.frame.clear(sched);
        self.map_cycle.clear(sched);
    }

    fn set_status(&mut self, status: Status) {
        if self.status != status {
            tracing::debug!(from = ?self.status, to = ?status, stage = self.current_index, "sequence status");
            self.status = status;
        }
    }
}

fn budget(options: &SequenceOptions, reduced_motion: bool) -> Duration {
    if reduced_motion {
        options.reduced_motion_duration
    } else {
        options.total_duration
    }
}
