//! Cumulative terminal view: the pipeline as a shell transcript.
//!
//! Finished stages stay on screen as permanent blocks. The current stage goes
//! through three gates in order: its banner echo types out, then its command
//! types out, then its code lines appear paced by the stage progress. After
//! playback ends the view types a final `exit`.
//!
//! The view renders to plain [`TranscriptLine`]s; styling is left to the TUI.

use std::time::Duration;

use crate::highlight::{Fragment, Highlighter, render_line};
use crate::model::{CodeLang, LineMapEntry};
use crate::schedule::{Channel, Scheduler, TimerId, TypePhase};
use crate::typewriter::{Typewriter, TypewriterTiming};

const BANNER_CHAR_INTERVAL: Duration = Duration::from_millis(20);
const COMMAND_CHAR_INTERVAL: Duration = Duration::from_millis(24);

/// Half-period of the idle cursor blink.
const BLINK_HALF_PERIOD: Duration = Duration::from_millis(450);

pub const CURSOR: char = '█';

/// Decelerating curve used to pace line reveal.
pub fn ease_out_cubic(p: f64) -> f64 {
    1.0 - (1.0 - p).powi(3)
}

/// Lines of `total` that should be visible at `stage_progress`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn lines_for_progress(stage_progress: f64, total: usize) -> usize {
    let eased = ease_out_cubic(stage_progress.clamp(0.0, 1.0));
    ((eased * total as f64).ceil() as usize).min(total)
}

/// Everything the transcript shows for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageBlock {
    /// Index of the stage in the playback list.
    pub index: usize,
    pub banner: String,
    pub command: String,
    pub lang: CodeLang,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// A shell prompt followed by what was typed at it.
    Prompt,
    /// Output of an echoed banner.
    Output,
    /// A numbered code line. `active` marks the highlighted line-map target.
    Code { number: usize, active: bool },
    /// A bare prompt waiting for input.
    Idle,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub role: LineRole,
    pub fragments: Vec<Fragment>,
    /// Whether a cursor glyph follows the text.
    pub cursor: bool,
}

impl TranscriptLine {
    fn new(role: LineRole, text: impl Into<String>) -> Self {
        Self {
            role,
            fragments: vec![Fragment::plain(text)],
            cursor: false,
        }
    }

    fn with_cursor(mut self, cursor: bool) -> Self {
        self.cursor = cursor;
        self
    }

    /// Zero-padded line number for code lines.
    pub fn gutter(&self) -> Option<String> {
        match self.role {
            LineRole::Code { number, .. } => Some(format!("{number:03}")),
            _ => None,
        }
    }

    /// The line as plain text, gutter and cursor included.
    #[cfg(test)]
    pub fn text(&self) -> String {
        let mut out = self.gutter().map(|g| g + "  ").unwrap_or_default();
        for fragment in &self.fragments {
            out.push_str(&fragment.text);
        }
        if self.cursor {
            out.push(CURSOR);
        }
        out
    }
}

/// Scroll position of the transcript pane.
///
/// Follows the bottom until the user scrolls, and again after the next
/// content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    offset: usize,
    follow: bool,
    seen_revision: u64,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
            seen_revision: 0,
        }
    }
}

impl ScrollState {
    pub fn scroll_up(&mut self, lines: usize) {
        self.follow = false;
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.follow = false;
        self.offset = self.offset.saturating_add(lines);
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Resolves the first visible line for a pane of `viewport` rows.
    pub fn layout(&mut self, revision: u64, content: usize, viewport: usize) -> usize {
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.follow = true;
        }
        let bottom = content.saturating_sub(viewport);
        self.offset = if self.follow {
            bottom
        } else {
            self.offset.min(bottom)
        };
        self.offset
    }
}

/// What finished when a typewriter wake was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Banner,
    Command,
    Exit,
}

#[derive(Debug)]
pub struct TerminalView {
    hostname: String,
    reduced_motion: bool,

    completed: Vec<StageBlock>,
    current: Option<StageBlock>,

    banner: Typewriter,
    command: Typewriter,
    exit: Typewriter,

    banner_printed: bool,
    command_printed: bool,
    stage_progress: f64,
    visible_lines: usize,
    exit_shown: bool,

    /// Bumped on every content change; drives auto-scroll.
    revision: u64,
    scroll: ScrollState,
}

impl TerminalView {
    pub fn new(hostname: impl Into<String>, reduced_motion: bool) -> Self {
        let banner_timing = TypewriterTiming::with_char_interval(BANNER_CHAR_INTERVAL);
        let command_timing = TypewriterTiming::with_char_interval(COMMAND_CHAR_INTERVAL);
        Self {
            hostname: hostname.into(),
            reduced_motion,
            completed: Vec::new(),
            current: None,
            banner: Typewriter::new(Channel::Banner, banner_timing, reduced_motion),
            command: Typewriter::new(Channel::Command, command_timing, reduced_motion),
            exit: Typewriter::new(Channel::Exit, command_timing, reduced_motion),
            banner_printed: false,
            command_printed: false,
            stage_progress: 0.0,
            visible_lines: 0,
            exit_shown: false,
            revision: 1,
            scroll: ScrollState::default(),
        }
    }

    pub fn prompt(&self) -> String {
        format!("x@{} % ", self.hostname)
    }

    // ── Inputs ──

    /// Appends a finished stage to the permanent scrollback.
    pub fn archive(&mut self, block: StageBlock) {
        self.completed.push(block);
        self.touch();
    }

    /// Drops the scrollback and everything about the current stage.
    pub fn reset(&mut self, sched: &mut Scheduler) {
        self.completed.clear();
        self.set_stage(sched, None);
        self.hide_exit(sched);
        self.touch();
    }

    /// Switches the in-progress stage. Gates reset only when the stage changes.
    pub fn set_stage(&mut self, sched: &mut Scheduler, block: Option<StageBlock>) {
        let same = match (&self.current, &block) {
            (Some(a), Some(b)) => a.index == b.index,
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }

        self.current = block;
        self.banner.clear(sched);
        self.command.clear(sched);
        self.banner_printed = false;
        self.command_printed = false;
        self.stage_progress = 0.0;
        self.visible_lines = 0;

        if let Some(block) = &self.current {
            let echo = format!("{}echo \"{}\"", self.prompt(), block.banner);
            self.banner.start(sched, echo);
            if self.reduced_motion {
                self.banner_printed = true;
                self.command_printed = true;
                let command = format!("{}{}", self.prompt(), block.command);
                self.command.start(sched, command);
                self.visible_lines = block.lines.len();
            }
        }
        self.touch();
    }

    /// Feeds the engine's progress through the current stage.
    pub fn set_stage_progress(&mut self, stage_progress: f64) {
        self.stage_progress = stage_progress;
        self.reveal_lines();
    }

    pub fn show_exit(&mut self, sched: &mut Scheduler) {
        if self.exit_shown {
            return;
        }
        self.exit_shown = true;
        let text = format!("{}exit", self.prompt());
        self.exit.start(sched, text);
        self.touch();
    }

    pub fn hide_exit(&mut self, sched: &mut Scheduler) {
        if !self.exit_shown {
            return;
        }
        self.exit_shown = false;
        self.exit.clear(sched);
        self.touch();
    }

    pub fn set_reduced_motion(&mut self, sched: &mut Scheduler, on: bool) {
        if self.reduced_motion == on {
            return;
        }
        self.reduced_motion = on;
        self.banner.set_reduced_motion(sched, on);
        self.command.set_reduced_motion(sched, on);
        self.exit.set_reduced_motion(sched, on);

        if on && let Some(block) = &self.current {
            self.banner_printed = true;
            if !self.command_printed {
                let command = format!("{}{}", self.prompt(), block.command);
                self.command.start(sched, command);
                self.command_printed = true;
            }
            self.visible_lines = block.lines.len();
        }
        self.touch();
    }

    /// Handles a typewriter wake. Returns the gate that just opened, if any.
    pub fn on_wake(
        &mut self,
        sched: &mut Scheduler,
        channel: Channel,
        id: TimerId,
        phase: TypePhase,
    ) -> Option<Gate> {
        match channel {
            Channel::Banner => {
                if !self.banner.on_wake(sched, id, phase) || self.banner_printed {
                    return None;
                }
                self.banner_printed = true;
                if let Some(block) = &self.current {
                    let command = format!("{}{}", self.prompt(), block.command);
                    self.command.start(sched, command);
                }
                self.touch();
                Some(Gate::Banner)
            }
            Channel::Command => {
                if !self.command.on_wake(sched, id, phase) || self.command_printed {
                    return None;
                }
                self.command_printed = true;
                self.reveal_lines();
                self.touch();
                Some(Gate::Command)
            }
            Channel::Exit => {
                self.exit.on_wake(sched, id, phase).then_some(Gate::Exit)
            }
        }
    }

    pub fn dispose(&mut self, sched: &mut Scheduler) {
        self.banner.clear(sched);
        self.command.clear(sched);
        self.exit.clear(sched);
    }

    // ── State ──

    #[cfg(test)]
    pub fn completed(&self) -> &[StageBlock] {
        &self.completed
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&StageBlock> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn banner_printed(&self) -> bool {
        self.banner_printed
    }

    #[cfg(test)]
    pub fn command_printed(&self) -> bool {
        self.command_printed
    }

    #[cfg(test)]
    pub fn visible_lines(&self) -> usize {
        self.visible_lines
    }

    pub fn exit_shown(&self) -> bool {
        self.exit_shown
    }

    /// Whether the typed `exit` has been delivered.
    #[cfg(test)]
    pub fn exit_complete(&self) -> bool {
        self.exit_shown && self.exit.is_complete()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollState {
        &mut self.scroll
    }

    // ── Output ──

    /// Renders the whole transcript at virtual time `now`.
    pub fn transcript(
        &self,
        highlighter: &dyn Highlighter,
        active: Option<LineMapEntry>,
        now: Duration,
    ) -> Vec<TranscriptLine> {
        let blink = blink_on(now);
        let mut out = Vec::new();

        for block in &self.completed {
            let echo = format!("{}echo \"{}\"", self.prompt(), block.banner);
            out.push(TranscriptLine::new(LineRole::Prompt, echo));
            out.push(TranscriptLine::new(LineRole::Output, block.banner.clone()));
            let command = format!("{}{}", self.prompt(), block.command);
            out.push(TranscriptLine::new(LineRole::Prompt, command));
            push_code(&mut out, highlighter, block, block.lines.len(), None);
            if !self.reduced_motion {
                out.push(self.idle_prompt(blink));
            }
            out.push(TranscriptLine::new(LineRole::Blank, ""));
        }

        if let Some(block) = &self.current {
            out.push(
                TranscriptLine::new(LineRole::Prompt, self.banner.visible_text())
                    .with_cursor(self.banner.shows_cursor()),
            );
            if self.banner_printed {
                out.push(TranscriptLine::new(LineRole::Output, block.banner.clone()));
                out.push(
                    TranscriptLine::new(LineRole::Prompt, self.command.visible_text())
                        .with_cursor(self.command.shows_cursor()),
                );
            }
            if self.command_printed {
                let highlight_to = active.map(|entry| entry.to);
                push_code(&mut out, highlighter, block, self.visible_lines, highlight_to);

                let all_shown = self.visible_lines >= block.lines.len();
                if all_shown && !self.exit_shown && !self.reduced_motion {
                    out.push(self.idle_prompt(blink));
                }
            }
        }

        if self.exit_shown {
            out.push(
                TranscriptLine::new(LineRole::Prompt, self.exit.visible_text())
                    .with_cursor(self.exit.shows_cursor()),
            );
        }

        out
    }

    fn idle_prompt(&self, blink: bool) -> TranscriptLine {
        TranscriptLine::new(LineRole::Idle, self.prompt()).with_cursor(blink)
    }

    fn reveal_lines(&mut self) {
        let Some(block) = &self.current else {
            return;
        };
        let total = block.lines.len();
        let target = if self.reduced_motion {
            total
        } else if self.command_printed {
            lines_for_progress(self.stage_progress, total)
        } else {
            0
        };
        if target > self.visible_lines {
            self.visible_lines = target;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

fn blink_on(now: Duration) -> bool {
    (now.as_millis() / BLINK_HALF_PERIOD.as_millis()) % 2 == 0
}

fn push_code(
    out: &mut Vec<TranscriptLine>,
    highlighter: &dyn Highlighter,
    block: &StageBlock,
    count: usize,
    highlight_to: Option<usize>,
) {
    for (i, line) in block.lines.iter().take(count).enumerate() {
        let number = i + 1;
        out.push(TranscriptLine {
            role: LineRole::Code {
                number,
                active: highlight_to == Some(number),
            },
            fragments: render_line(highlighter, line, block.lang),
            cursor: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::highlight::KeywordHighlighter;
    use crate::schedule::Wake;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn block(index: usize, lines: usize) -> StageBlock {
        StageBlock {
            index,
            banner: format!("[IR {index}] Decompiling X iOS App"),
            command: "swiftc -emit-sil".to_string(),
            lang: CodeLang::Sil,
            lines: (1..=lines).map(|n| format!("line {n}")).collect(),
        }
    }

    /// Drains to `until`, returning the gates that opened.
    fn advance(view: &mut TerminalView, sched: &mut Scheduler, until: Duration) -> Vec<Gate> {
        let mut gates = Vec::new();
        while let Some(fired) = sched.pop_due(until) {
            if let Wake::Typewriter(channel, phase) = fired.wake {
                gates.extend(view.on_wake(sched, channel, fired.id, phase));
            }
        }
        sched.settle(until);
        gates
    }

    fn texts(view: &TerminalView, now: Duration) -> Vec<String> {
        view.transcript(&KeywordHighlighter, None, now)
            .iter()
            .map(TranscriptLine::text)
            .collect()
    }

    #[test]
    fn easing_is_monotonic_and_bounded() {
        assert_eq!(lines_for_progress(0.0, 10), 0);
        assert_eq!(lines_for_progress(1.0, 10), 10);
        assert_eq!(lines_for_progress(-3.0, 10), 0);
        assert_eq!(lines_for_progress(7.0, 10), 10);
        // Half-way through the stage, 7/8 of the curve is done.
        assert_eq!(lines_for_progress(0.5, 8), 7);
    }

    #[test]
    fn gates_open_in_order() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", false);
        view.set_stage(&mut sched, Some(block(0, 4)));
        view.set_stage_progress(1.0);

        assert!(!view.banner_printed());
        assert_eq!(view.visible_lines(), 0);

        let gates = advance(&mut view, &mut sched, ms(5000));
        assert_eq!(gates, vec![Gate::Banner, Gate::Command]);
        assert!(view.command_printed());
        assert_eq!(view.visible_lines(), 4);
    }

    #[test]
    fn lines_wait_for_the_command() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", false);
        view.set_stage(&mut sched, Some(block(0, 4)));

        // Banner finishes, command still typing.
        let gates = advance(&mut view, &mut sched, ms(1000));
        assert_eq!(gates, vec![Gate::Banner]);
        view.set_stage_progress(1.0);
        assert_eq!(view.visible_lines(), 0);
    }

    #[test]
    fn visible_lines_never_shrink() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", false);
        view.set_stage(&mut sched, Some(block(0, 6)));
        advance(&mut view, &mut sched, ms(5000));
        assert!(view.command_printed());

        view.set_stage_progress(0.3);
        assert_eq!(view.visible_lines(), 4);
        // A jump can report less progress; shown lines stay.
        view.set_stage_progress(0.1);
        assert_eq!(view.visible_lines(), 4);
    }

    #[test]
    fn stage_change_resets_gates() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", false);
        view.set_stage(&mut sched, Some(block(0, 2)));
        view.set_stage_progress(1.0);
        advance(&mut view, &mut sched, ms(5000));

        view.set_stage(&mut sched, Some(block(1, 2)));
        assert!(!view.banner_printed());
        assert!(!view.command_printed());
        assert_eq!(view.visible_lines(), 0);

        // Re-sending the same stage keeps progress.
        advance(&mut view, &mut sched, ms(6000));
        view.set_stage(&mut sched, Some(block(1, 2)));
        assert!(view.banner_printed());
    }

    #[test]
    fn reduced_motion_shows_everything_at_once() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("android", true);
        view.set_stage(&mut sched, Some(block(0, 3)));

        assert!(view.banner_printed());
        assert!(view.command_printed());
        assert_eq!(view.visible_lines(), 3);

        let lines = texts(&view, ms(0));
        assert_eq!(lines[0], "x@android % echo \"[IR 0] Decompiling X iOS App\"");
        assert_eq!(lines[1], "[IR 0] Decompiling X iOS App");
        assert_eq!(lines[2], "x@android % swiftc -emit-sil");
        assert_eq!(lines[3], "001  line 1");
        // No blinking prompt under reduced motion.
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn completed_blocks_are_permanent() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", false);
        view.archive(block(0, 2));

        let lines = texts(&view, ms(0));
        assert_eq!(
            lines,
            vec![
                "x@ios % echo \"[IR 0] Decompiling X iOS App\"".to_string(),
                "[IR 0] Decompiling X iOS App".to_string(),
                "x@ios % swiftc -emit-sil".to_string(),
                "001  line 1".to_string(),
                "002  line 2".to_string(),
                format!("x@ios % {CURSOR}"),
                String::new(),
            ]
        );
        // The idle cursor blinks off in the second half-period.
        assert_eq!(texts(&view, ms(500))[5], "x@ios % ");

        view.reset(&mut sched);
        assert!(texts(&view, ms(0)).is_empty());
    }

    #[test]
    fn active_map_line_is_marked() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", true);
        view.set_stage(&mut sched, Some(block(0, 3)));

        let active = Some(LineMapEntry { from: 1, to: 2 });
        let marked: Vec<usize> = view
            .transcript(&KeywordHighlighter, active, ms(0))
            .iter()
            .filter_map(|l| match l.role {
                LineRole::Code { number, active: true } => Some(number),
                _ => None,
            })
            .collect();
        assert_eq!(marked, vec![2]);
    }

    #[test]
    fn cursor_prompt_gives_way_to_exit() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", false);
        view.set_stage(&mut sched, Some(block(0, 1)));
        view.set_stage_progress(1.0);
        advance(&mut view, &mut sched, ms(5000));

        let before = view.transcript(&KeywordHighlighter, None, ms(0));
        assert_eq!(before.last().map(|l| l.role), Some(LineRole::Idle));

        view.show_exit(&mut sched);
        let gates = advance(&mut view, &mut sched, ms(10_000));
        assert_eq!(gates, vec![Gate::Exit]);
        assert!(view.exit_complete());

        let after = view.transcript(&KeywordHighlighter, None, ms(0));
        assert!(after.iter().all(|l| l.role != LineRole::Idle));
        assert_eq!(after.last().map(TranscriptLine::text), Some("x@ios % exit".to_string()));
    }

    #[test]
    fn hiding_exit_cancels_its_completion() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", true);
        view.show_exit(&mut sched);
        view.hide_exit(&mut sched);

        assert!(advance(&mut view, &mut sched, ms(1000)).is_empty());
        assert!(!view.exit_complete());
    }

    #[test]
    fn scroll_follows_content_until_user_scrolls() {
        let mut scroll = ScrollState::default();
        assert_eq!(scroll.layout(1, 50, 20), 30);

        scroll.scroll_up(10);
        assert_eq!(scroll.layout(1, 50, 20), 20);
        assert!(!scroll.is_following());

        // New content resumes following.
        assert_eq!(scroll.layout(2, 55, 20), 35);
        assert!(scroll.is_following());

        // Content that fits stays at the top.
        scroll.scroll_down(100);
        assert_eq!(scroll.layout(2, 5, 20), 0);
    }

    #[test]
    fn content_changes_bump_revision() {
        let mut sched = Scheduler::new(ms(16));
        let mut view = TerminalView::new("ios", false);
        let start = view.revision();
        view.set_stage(&mut sched, Some(block(0, 2)));
        assert!(view.revision() > start);

        let before = view.revision();
        view.set_stage(&mut sched, Some(block(0, 2)));
        assert_eq!(view.revision(), before);
    }

    proptest! {
        #[test]
        fn visible_lines_are_monotonic(progress in prop::collection::vec(-0.5f64..1.5, 1..40), total in 0usize..200) {
            let mut sched = Scheduler::new(ms(16));
            let mut view = TerminalView::new("ios", false);
            view.set_stage(&mut sched, Some(block(0, total)));
            advance(&mut view, &mut sched, ms(10_000));

            let mut last = 0;
            for p in progress {
                view.set_stage_progress(p);
                prop_assert!(view.visible_lines() >= last);
                prop_assert!(view.visible_lines() <= total);
                last = view.visible_lines();
            }
        }
    }
}
