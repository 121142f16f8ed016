//! Playback stages: the timed subsequence of a dataset.

use super::{CodeLang, Dataset, LineMapEntry, Stage, split_lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackKind {
    Ir,
    Binary,
}

impl PlaybackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ir => "IR",
            Self::Binary => "BINARY",
        }
    }
}

/// An `ir` or `binary` stage prepared for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStage {
    pub kind: PlaybackKind,
    /// Position of the stage in the dataset.
    pub dataset_index: usize,
    pub lang: CodeLang,
    pub title: Option<String>,
    pub lines: Vec<String>,
    /// Line map with entries that point outside either representation removed.
    pub map: Vec<LineMapEntry>,
}

impl PlaybackStage {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Title, or the upper-case kind when there is none.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(self.kind.as_str())
    }
}

/// Derives the played-back stages of a dataset, in order.
pub fn playback_stages(dataset: &Dataset) -> Vec<PlaybackStage> {
    let mut stages = Vec::new();
    // Line count of the nearest earlier code-bearing stage.
    let mut predecessor_lines: Option<usize> = None;

    for (index, stage) in dataset.stages.iter().enumerate() {
        let (kind, artifact) = match stage {
            Stage::Ir(artifact) => (PlaybackKind::Ir, artifact),
            Stage::Binary(artifact) => (PlaybackKind::Binary, artifact),
            Stage::Source { code, .. } => {
                predecessor_lines = Some(split_lines(code).len());
                continue;
            }
            Stage::Ast { .. } | Stage::ReverseNotes { .. } => continue,
        };

        let lines = split_lines(&artifact.code);
        let map = sanitize_map(&artifact.map, predecessor_lines, lines.len());
        if map.len() < artifact.map.len() {
            tracing::warn!(
                dataset = %dataset.id,
                stage = index,
                dropped = artifact.map.len() - map.len(),
                "line map entries out of range"
            );
        }
        predecessor_lines = Some(lines.len());

        stages.push(PlaybackStage {
            kind,
            dataset_index: index,
            lang: artifact.lang,
            title: artifact.title.clone(),
            lines,
            map,
        });
    }

    stages
}

fn sanitize_map(
    map: &[LineMapEntry],
    from_limit: Option<usize>,
    to_limit: usize,
) -> Vec<LineMapEntry> {
    map.iter()
        .filter(|e| e.to >= 1 && e.to <= to_limit)
        .filter(|e| e.from >= 1 && from_limit.is_none_or(|limit| e.from <= limit))
        .copied()
        .collect()
}
