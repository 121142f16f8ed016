//! Pipeline overlay: wires the sequence engine to the terminal view.
//!
//! The overlay owns the scheduler. The host feeds it wall-clock time through
//! [`PipelineOverlay::advance_to`] and keys through
//! [`PipelineOverlay::handle_key`], then drains [`OverlayEvent`]s.
//!
//! Stages move into the permanent scrollback once, in order, the first time
//! playback moves past them; the final stage moves there when playback
//! finishes. After the final `exit` is typed the overlay closes itself after a
//! short delay.

pub mod script;

use std::time::Duration;

use crossterm::event::KeyCode;

use crate::highlight::KeywordHighlighter;
use crate::model::{Dataset, Platform, playback_stages};
use crate::motion::ReducedMotion;
use crate::schedule::{Fired, Scheduler, Slot, Wake};
use crate::sequence::{SequenceEngine, SequenceOptions, SequenceSnapshot, Status};
use crate::terminal::{Gate, ScrollState, TerminalView, TranscriptLine};

const EXIT_CLOSE_DELAY: Duration = Duration::from_millis(400);
const EXIT_CLOSE_DELAY_REDUCED: Duration = Duration::from_millis(120);

/// Rows moved by PageUp/PageDown.
const PAGE: usize = 10;

/// Notifications for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    /// Playback stage moved into the scrollback.
    StageArchived(usize),
    /// The user skipped to the end.
    Skipped,
    /// The overlay is done and should be dismissed.
    Finished,
}

/// Whether a key was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Ignored,
}

#[derive(Debug, Clone, Copy)]
pub struct OverlayOptions {
    pub sequence: SequenceOptions,
    pub frame_interval: Duration,
    pub reduced_motion: ReducedMotion,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            sequence: SequenceOptions {
                auto_play: true,
                ..SequenceOptions::default()
            },
            frame_interval: Duration::from_millis(16),
            reduced_motion: ReducedMotion::default(),
        }
    }
}

#[derive(Debug)]
pub struct PipelineOverlay {
    title: String,
    platform: Platform,
    motion: ReducedMotion,
    highlighter: KeywordHighlighter,

    sched: Scheduler,
    engine: SequenceEngine,
    view: TerminalView,

    /// Highest playback index moved into the scrollback.
    last_archived: Option<usize>,
    exit_close: Slot,
    closing: bool,
    closed: bool,
    events: Vec<OverlayEvent>,
}

impl PipelineOverlay {
    pub fn new(dataset: &Dataset, options: OverlayOptions) -> Self {
        let reduced = options.reduced_motion.get();
        let mut sched = Scheduler::new(options.frame_interval);
        let stages = playback_stages(dataset);
        if stages.is_empty() {
            tracing::warn!(dataset = %dataset.id, "dataset has no playable stages");
        }
        let engine = SequenceEngine::new(&mut sched, stages, options.sequence, reduced);
        let view = TerminalView::new(dataset.platform.hostname(), reduced);

        let mut overlay = Self {
            title: dataset.title.clone(),
            platform: dataset.platform,
            motion: options.reduced_motion,
            highlighter: KeywordHighlighter,
            sched,
            engine,
            view,
            last_archived: None,
            exit_close: Slot::default(),
            closing: false,
            closed: false,
            events: Vec::new(),
        };
        overlay.reconcile();
        overlay
    }

    // ── Time ──

    /// Fires everything due up to `now`, reconciling after each wake.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some(fired) = self.sched.pop_due(now) {
            self.dispatch(fired);
            self.reconcile();
        }
        self.sched.settle(now);
    }

    #[cfg(test)]
    pub fn now(&self) -> Duration {
        self.sched.now()
    }

    /// When the next timer is due, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.sched.next_due()
    }

    fn dispatch(&mut self, fired: Fired) {
        match fired.wake {
            Wake::EngineFrame | Wake::MapCycle => self.engine.on_wake(&mut self.sched, fired),
            Wake::Typewriter(channel, phase) => {
                let gate = self
                    .view
                    .on_wake(&mut self.sched, channel, fired.id, phase);
                if gate == Some(Gate::Exit) {
                    self.on_exit_typed();
                }
            }
            Wake::ExitClose => {
                if self.exit_close.take_if(fired.id) {
                    self.close();
                }
            }
        }
    }

    // ── Controls ──

    /// Skips to the end, or closes when already finished.
    pub fn skip(&mut self) {
        if self.engine.status().is_finished() {
            self.close();
            return;
        }
        self.engine.skip(&mut self.sched);
        self.events.push(OverlayEvent::Skipped);
        self.reconcile();
    }

    /// Clears the scrollback and replays from the first stage.
    pub fn restart(&mut self) {
        self.reset_exit();
        self.view.reset(&mut self.sched);
        self.last_archived = None;
        self.closed = false;
        self.engine.restart(&mut self.sched);
        tracing::info!(dataset = %self.title, "pipeline restarted");
        self.reconcile();
    }

    pub fn toggle_pause(&mut self) {
        match self.engine.status() {
            Status::Running => self.engine.pause(&mut self.sched),
            Status::Idle | Status::Paused => self.engine.play(&mut self.sched),
            Status::Finished(_) => {
                self.restart();
                return;
            }
        }
        self.reconcile();
    }

    /// Pauses at the start of the next or previous stage, clamped to the list.
    pub fn step(&mut self, forward: bool) {
        let count = self.engine.stages().len();
        if count == 0 {
            return;
        }
        let index = self.engine.current_index();
        let target = if forward {
            (index + 1).min(count - 1)
        } else {
            index.saturating_sub(1)
        };
        if self.engine.status().is_finished() {
            self.reset_exit();
        }
        self.engine.jump_to(&mut self.sched, target);
        self.reconcile();
    }

    pub fn set_reduced_motion(&mut self, on: bool) {
        if !self.motion.set(on) {
            return;
        }
        tracing::info!(reduced_motion = on, "motion preference changed");
        self.engine.set_reduced_motion(&mut self.sched, on);
        self.view.set_reduced_motion(&mut self.sched, on);
        self.reconcile();
    }

    pub fn toggle_reduced_motion(&mut self) {
        self.set_reduced_motion(!self.motion.get());
    }

    /// Applies a key press.
    pub fn handle_key(&mut self, code: KeyCode) -> KeyOutcome {
        match code {
            KeyCode::Enter if self.engine.status().is_finished() => self.restart(),
            KeyCode::Esc | KeyCode::Char(' ') => self.skip(),
            KeyCode::Right => self.step(true),
            KeyCode::Left => self.step(false),
            KeyCode::Char('m') => self.toggle_reduced_motion(),
            KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Up => self.view.scroll_mut().scroll_up(1),
            KeyCode::Down => self.view.scroll_mut().scroll_down(1),
            KeyCode::PageUp => self.view.scroll_mut().scroll_up(PAGE),
            KeyCode::PageDown => self.view.scroll_mut().scroll_down(PAGE),
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Handled
    }

    /// Cancels every timer.
    pub fn dispose(&mut self) {
        self.engine.dispose(&mut self.sched);
        self.view.dispose(&mut self.sched);
        self.exit_close.clear(&mut self.sched);
    }

    // ── State ──

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn snapshot(&self) -> SequenceSnapshot {
        self.engine.snapshot()
    }

    pub fn engine(&self) -> &SequenceEngine {
        &self.engine
    }

    #[cfg(test)]
    pub fn view(&self) -> &TerminalView {
        &self.view
    }

    pub fn reduced_motion(&self) -> bool {
        self.motion.get()
    }

    /// Exit typed; waiting for the close delay.
    #[cfg(test)]
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn drain_events(&mut self) -> Vec<OverlayEvent> {
        std::mem::take(&mut self.events)
    }

    /// The transcript as of the current virtual time.
    pub fn transcript(&self) -> Vec<TranscriptLine> {
        self.view.transcript(
            &self.highlighter,
            self.engine.active_map_entry(),
            self.sched.now(),
        )
    }

    /// Resolves the transcript scroll offset for a pane of `viewport` rows.
    pub fn layout_scroll(&mut self, content: usize, viewport: usize) -> usize {
        let revision = self.view.revision();
        self.view.scroll_mut().layout(revision, content, viewport)
    }

    pub fn scroll(&self) -> &ScrollState {
        self.view.scroll()
    }

    // ── Internals ──

    /// Brings the scrollback, the current stage and the exit line in line with
    /// the engine.
    fn reconcile(&mut self) {
        let status = self.engine.status();
        let index = self.engine.current_index();
        let count = self.engine.stages().len();

        // Everything strictly before the current stage, or everything once
        // playback has finished.
        let archive_through = if status.is_finished() {
            count.checked_sub(1).map(|last| index.min(last))
        } else {
            index.checked_sub(1)
        };
        if let Some(through) = archive_through {
            let next = self.last_archived.map_or(0, |last| last + 1);
            for i in next..=through {
                let Some(stage) = self.engine.stages().get(i) else {
                    break;
                };
                let block = script::stage_block(i, stage, self.platform);
                self.view.archive(block);
                self.last_archived = Some(i);
                self.events.push(OverlayEvent::StageArchived(i));
                tracing::debug!(stage = i, "stage archived");
            }
        }

        if status.is_finished() {
            self.view.show_exit(&mut self.sched);
        }

        let archived = self.last_archived.is_some_and(|last| last >= index);
        let current = match self.engine.current_stage() {
            Some(stage) if !archived && !self.view.exit_shown() => {
                Some(script::stage_block(index, stage, self.platform))
            }
            _ => None,
        };
        self.view.set_stage(&mut self.sched, current);
        self.view.set_stage_progress(self.engine.stage_progress());
    }

    fn on_exit_typed(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        let delay = if self.motion.get() {
            EXIT_CLOSE_DELAY_REDUCED
        } else {
            EXIT_CLOSE_DELAY
        };
        let id = self.sched.set_timeout(delay, Wake::ExitClose);
        self.exit_close.arm(&mut self.sched, id);
    }

    fn reset_exit(&mut self) {
        self.exit_close.clear(&mut self.sched);
        self.closing = false;
        self.view.hide_exit(&mut self.sched);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.events.push(OverlayEvent::Finished);
        tracing::info!(dataset = %self.title, "pipeline closed");
    }
}
