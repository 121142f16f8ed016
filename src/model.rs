//! Dataset model: the stages of a simulated compile pipeline.
//!
//! A dataset is an immutable fixture. Only `ir` and `binary` stages are ever
//! played back; their derived [`PlaybackStage`] form owns split code lines and
//! a line map with out-of-range entries already removed.

mod dataset;
mod playback;
mod stage;

pub use dataset::{Dataset, Platform};
pub use playback::{PlaybackStage, playback_stages};
pub use stage::{AstNode, CodeLang, LineMapEntry, Stage};

#[cfg(test)]
pub use playback::PlaybackKind;
#[cfg(test)]
pub use stage::CodeArtifact;

/// Splits code into lines on `\n` or `\r\n`.
pub fn split_lines(code: &str) -> Vec<String> {
    code.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_handles_crlf() {
        assert_eq!(split_lines("a\r\nb\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn split_lines_keeps_blank_lines() {
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }
}
