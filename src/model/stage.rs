//! Stage types, discriminated by `kind`.

use serde::{Deserialize, Serialize};

/// Language tag of a code-bearing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeLang {
    Swift,
    Kotlin,
    Sil,
    LlvmIr,
    JvmBytecode,
    Smali,
    Aarch64,
    /// Any tag without dedicated support.
    #[serde(other)]
    Other,
}

impl CodeLang {
    /// The tag as written in dataset files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Sil => "sil",
            Self::LlvmIr => "llvm-ir",
            Self::JvmBytecode => "jvm-bytecode",
            Self::Smali => "smali",
            Self::Aarch64 => "aarch64",
            Self::Other => "text",
        }
    }
}

/// Correlates a line in the preceding representation with a line in this one.
///
/// Both numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMapEntry {
    pub from: usize,
    pub to: usize,
}

/// Code shared by `ir` and `binary` stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub lang: CodeLang,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map: Vec<LineMapEntry>,
}

/// A node of a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// One step of the simulated pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Stage {
    /// Original declarative UI source. Never played back.
    Source {
        lang: CodeLang,
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// Syntax tree. Only shown in the tree view.
    Ast {
        nodes: Vec<AstNode>,
        /// Root-to-leaf chain of highlighted node ids.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        focus_path: Vec<String>,
    },

    /// Intermediate representation.
    Ir(CodeArtifact),

    /// Bytecode or disassembly.
    Binary(CodeArtifact),

    /// Reverse-engineering commentary.
    #[serde(rename = "rev", alias = "reverse-notes")]
    ReverseNotes { notes: String },
}

impl Stage {
    /// Upper-case kind name, used when a stage has no title.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Source { .. } => "SOURCE",
            Self::Ast { .. } => "AST",
            Self::Ir(_) => "IR",
            Self::Binary(_) => "BINARY",
            Self::ReverseNotes { .. } => "REV",
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Source { title, .. } => title.as_deref(),
            Self::Ir(artifact) | Self::Binary(artifact) => artifact.title.as_deref(),
            Self::Ast { .. } | Self::ReverseNotes { .. } => None,
        }
    }

    /// Short label for the progress timeline.
    pub fn label(&self) -> &str {
        if let Some(title) = self.title().filter(|t| !t.is_empty()) {
            return title;
        }
        match self {
            Self::Source { .. } => "Source",
            Self::Ast { .. } => "AST",
            Self::Ir(_) => "IR",
            Self::Binary(_) => "Disassembly",
            Self::ReverseNotes { .. } => "Reverse",
        }
    }

    /// Language and code of stages that carry code.
    pub fn code(&self) -> Option<(CodeLang, &str)> {
        match self {
            Self::Source { lang, code, .. } => Some((*lang, code)),
            Self::Ir(artifact) | Self::Binary(artifact) => Some((artifact.lang, &artifact.code)),
            Self::Ast { .. } | Self::ReverseNotes { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_stages() {
        let json = r#"[
            {"kind": "source", "lang": "swift", "code": "let x = 1"},
            {"kind": "ast", "nodes": [{"id": "root", "label": "Decl"}], "focus_path": ["root"]},
            {"kind": "ir", "lang": "sil", "code": "bb0:", "map": [{"from": 1, "to": 1}]},
            {"kind": "binary", "lang": "aarch64", "code": "RET", "title": "Slice"},
            {"kind": "rev", "notes": "inlined"},
            {"kind": "reverse-notes", "notes": "alias"}
        ]"#;

        let stages: Vec<Stage> = serde_json::from_str(json).unwrap();
        assert_eq!(stages.len(), 6);
        assert!(matches!(stages[2], Stage::Ir(ref a) if a.map.len() == 1));
        assert_eq!(stages[3].title(), Some("Slice"));
        assert!(matches!(stages[5], Stage::ReverseNotes { .. }));
    }

    #[test]
    fn unknown_lang_is_other() {
        let stage: Stage =
            serde_json::from_str(r#"{"kind": "ir", "lang": "wasm", "code": "nop"}"#).unwrap();
        assert_eq!(stage.code(), Some((CodeLang::Other, "nop")));
    }

    #[test]
    fn labels_fall_back_to_kind() {
        let ir = Stage::Ir(CodeArtifact {
            lang: CodeLang::Sil,
            code: String::new(),
            title: Some(String::new()),
            map: vec![],
        });
        assert_eq!(ir.label(), "IR");
        assert_eq!(ir.kind_name(), "IR");

        let notes = Stage::ReverseNotes {
            notes: "n".into(),
        };
        assert_eq!(notes.label(), "Reverse");
        assert!(notes.code().is_none());
    }
}
