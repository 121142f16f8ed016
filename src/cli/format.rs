//! Output formatting for CLI display.

use std::fmt::Write;

use crate::ast::render_tree;
use crate::model::{Dataset, LineMapEntry, Stage, playback_stages, split_lines};
use crate::overlay::script;

/// One line of `decomp list`.
pub(super) fn format_list_entry(id: &str, dataset: &Dataset) -> String {
    let played = playback_stages(dataset).len();
    format!(
        "{id:<16} {:<8} {} stages, {played} played  {}",
        dataset.platform.hostname(),
        dataset.stages.len(),
        dataset.title
    )
}

/// Every stage of a dataset, statically.
pub(super) fn format_dataset(dataset: &Dataset) -> String {
    let playback = playback_stages(dataset);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} ({}, {})",
        dataset.title,
        dataset.id,
        dataset.platform.hostname()
    );
    if let Some(description) = &dataset.description {
        let _ = writeln!(out, "{description}");
    }

    for (index, stage) in dataset.stages.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[{index}] {} · {}", stage.kind_name(), stage.label());

        match stage {
            Stage::Source { .. } | Stage::Ir(_) | Stage::Binary(_) => {
                if let Some((lang, code)) = stage.code() {
                    let _ = writeln!(out, "lang: {}", lang.as_str());
                    for (n, line) in split_lines(code).iter().enumerate() {
                        let _ = writeln!(out, "{:03}  {line}", n + 1);
                    }
                }
                if let Some(played) = playback.iter().find(|p| p.dataset_index == index)
                    && !played.map.is_empty()
                {
                    let _ = writeln!(out, "map: {}", format_map(&played.map));
                }
            }
            Stage::Ast { nodes, focus_path } => {
                for line in render_tree(nodes, focus_path) {
                    let _ = writeln!(out, "{}", line.text());
                }
            }
            Stage::ReverseNotes { notes } => {
                for line in notes.lines() {
                    let _ = writeln!(out, "  {line}");
                }
            }
        }
    }

    out
}

/// The AST stages of a dataset as trees.
pub(super) fn format_ast(dataset: &Dataset) -> String {
    let mut out = String::new();
    for stage in &dataset.stages {
        if let Stage::Ast { nodes, focus_path } = stage {
            let _ = writeln!(out, "AST · {} nodes", nodes.len());
            for line in render_tree(nodes, focus_path) {
                let _ = writeln!(out, "{}", line.text());
            }
        }
    }
    if out.is_empty() {
        out.push_str("no AST stages\n");
    }
    out
}

/// What the transcript types for each playback stage.
pub(super) fn format_script(dataset: &Dataset) -> String {
    let prompt = format!("x@{} % ", dataset.platform.hostname());
    let stages = playback_stages(dataset);
    let mut out = String::new();

    if stages.is_empty() {
        let _ = writeln!(out, "{}", script::EMPTY_BANNER);
    }
    for (index, stage) in stages.iter().enumerate() {
        let block = script::stage_block(index, stage, dataset.platform);
        let _ = writeln!(out, "{prompt}echo \"{}\"", block.banner);
        let _ = writeln!(out, "{}", block.banner);
        let _ = writeln!(out, "{prompt}{}", block.command);
        let _ = writeln!(out, "  ({} lines, {} mapped)", stage.line_count(), stage.map.len());
    }
    let _ = writeln!(out, "{prompt}exit");
    out
}

fn format_map(map: &[LineMapEntry]) -> String {
    map.iter()
        .map(|e| format!("{}→{}", e.from, e.to))
        .collect::<Vec<_>>()
        .join(", ")
}
