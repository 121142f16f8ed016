//! Pipeline progress footer.

use crate::model::PlaybackStage;
use crate::sequence::{Finish, SequenceSnapshot, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkState {
    Completed,
    Active,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageMark {
    pub label: String,
    pub state: MarkState,
}

/// What the primary timeline action does right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineAction {
    FastForward,
    Replay,
}

impl TimelineAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::FastForward => "Fast Forward",
            Self::Replay => "Replay",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Overall progress, 0 to 100.
    pub percent: u16,
    pub marks: Vec<StageMark>,
    pub action: TimelineAction,
    pub status: &'static str,
}

impl Timeline {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_snapshot(snapshot: &SequenceSnapshot, stages: &[PlaybackStage]) -> Self {
        let finished = snapshot.status.is_finished();
        let marks = stages
            .iter()
            .enumerate()
            .map(|(i, stage)| StageMark {
                label: stage.display_title().to_string(),
                state: if finished || i < snapshot.current_index {
                    MarkState::Completed
                } else if i == snapshot.current_index {
                    MarkState::Active
                } else {
                    MarkState::Pending
                },
            })
            .collect();

        Self {
            percent: (snapshot.progress.clamp(0.0, 1.0) * 100.0).round() as u16,
            marks,
            action: if finished {
                TimelineAction::Replay
            } else {
                TimelineAction::FastForward
            },
            status: status_label(snapshot.status),
        }
    }

    /// A text progress bar `width` cells wide.
    pub fn bar(&self, width: usize) -> String {
        let filled = width * usize::from(self.percent) / 100;
        let mut bar = "━".repeat(filled);
        bar.push_str(&"─".repeat(width - filled));
        bar
    }
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Idle => "READY",
        Status::Running => "PLAYING",
        Status::Paused => "PAUSED",
        Status::Finished(Finish::Completed) => "DONE",
        Status::Finished(Finish::Skipped) => "SKIPPED",
    }
}
