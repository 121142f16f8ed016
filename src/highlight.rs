//! Syntax highlighting for code lines.
//!
//! Highlighting is line-at-a-time and never required: when a highlighter
//! fails, [`render_line`] shows the line unstyled.

use crate::model::CodeLang;

/// Token classes the transcript knows how to style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Plain,
    Keyword,
    Str,
    Number,
    Comment,
}

/// A run of text with one token class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub kind: TokenKind,
}

impl Fragment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TokenKind::Plain,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HighlightError {
    #[error("unterminated string literal starting at column {column}")]
    UnterminatedString { column: usize },
}

pub trait Highlighter {
    /// Splits one line into styled fragments whose texts concatenate to `line`.
    fn highlight(&self, line: &str, lang: CodeLang) -> Result<Vec<Fragment>, HighlightError>;
}

/// Highlights a line, falling back to a single plain fragment on failure.
pub fn render_line(highlighter: &dyn Highlighter, line: &str, lang: CodeLang) -> Vec<Fragment> {
    match highlighter.highlight(line, lang) {
        Ok(fragments) => fragments,
        Err(e) => {
            tracing::warn!(lang = lang.as_str(), error = %e, "highlighting failed, showing plain text");
            vec![Fragment::plain(line)]
        }
    }
}

/// Comment, string, number and keyword highlighting from fixed word lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordHighlighter;

impl Highlighter for KeywordHighlighter {
    fn highlight(&self, line: &str, lang: CodeLang) -> Result<Vec<Fragment>, HighlightError> {
        if lang == CodeLang::Other {
            return Ok(vec![Fragment::plain(line)]);
        }

        let syntax = Syntax::of(lang);
        let chars: Vec<(usize, char)> = line.char_indices().collect();
        let mut out: Vec<Fragment> = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let (start, c) = chars[i];
            let rest = &line[start..];

            if syntax.comments.iter().any(|marker| rest.starts_with(marker)) {
                push(&mut out, rest, TokenKind::Comment);
                break;
            }

            let (end, kind) = if c == '"' {
                let close = closing_quote(&chars, i)
                    .ok_or(HighlightError::UnterminatedString { column: i + 1 })?;
                (close + 1, TokenKind::Str)
            } else if starts_number(&chars, i, syntax) {
                let end = scan(&chars, i + 1, |c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
                (end, TokenKind::Number)
            } else if c.is_alphabetic() || c == '_' || c == '.' {
                let end = scan(&chars, i + 1, |c| syntax.is_word_char(c));
                let word = slice(line, &chars, i, end);
                let kind = if syntax.is_keyword(word) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Plain
                };
                (end, kind)
            } else if c == '%' || c == '@' || c == '$' {
                (scan(&chars, i + 1, |c| syntax.is_word_char(c)), TokenKind::Plain)
            } else {
                (i + 1, TokenKind::Plain)
            };

            push(&mut out, slice(line, &chars, i, end), kind);
            i = end;
        }

        Ok(out)
    }
}

/// Lexical rules for one language.
#[derive(Debug, Clone, Copy)]
struct Syntax {
    comments: &'static [&'static str],
    keywords: &'static [&'static str],
    /// Extra characters allowed inside words, such as `-` in smali opcodes.
    word_extra: &'static [char],
    /// `#` introduces immediates.
    hash_immediates: bool,
    /// Keywords match regardless of ASCII case, as assemblers do.
    ignore_case: bool,
}

impl Syntax {
    fn of(lang: CodeLang) -> Self {
        let plain = Self {
            comments: &[],
            keywords: &[],
            word_extra: &[],
            hash_immediates: false,
            ignore_case: false,
        };
        match lang {
            CodeLang::Swift => Self {
                comments: &["//"],
                keywords: SWIFT,
                ..plain
            },
            CodeLang::Kotlin => Self {
                comments: &["//"],
                keywords: KOTLIN,
                ..plain
            },
            CodeLang::Sil => Self {
                comments: &["//"],
                keywords: SIL,
                ..plain
            },
            CodeLang::LlvmIr => Self {
                comments: &[";"],
                keywords: LLVM_IR,
                ..plain
            },
            CodeLang::JvmBytecode => Self {
                comments: &["//"],
                keywords: JVM,
                ..plain
            },
            CodeLang::Smali => Self {
                comments: &["#"],
                keywords: SMALI,
                word_extra: &['-', '/'],
                ..plain
            },
            CodeLang::Aarch64 => Self {
                comments: &[";", "//"],
                keywords: AARCH64,
                hash_immediates: true,
                ignore_case: true,
                ..plain
            },
            CodeLang::Other => plain,
        }
    }

    fn is_keyword(self, word: &str) -> bool {
        if self.ignore_case {
            self.keywords.iter().any(|k| k.eq_ignore_ascii_case(word))
        } else {
            self.keywords.contains(&word)
        }
    }

    fn is_word_char(self, c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '.' || c == '$' || self.word_extra.contains(&c)
    }
}

const SWIFT: &[&str] = &[
    "import", "struct", "class", "enum", "func", "var", "let", "some", "return", "if", "else",
    "guard", "private", "public", "static", "self", "init", "true", "false", "case",
];

const KOTLIN: &[&str] = &[
    "package", "import", "fun", "val", "var", "class", "object", "return", "if", "else", "when",
    "private", "true", "false", "null",
];

const SIL: &[&str] = &[
    "sil_stage", "canonical", "sil", "hidden", "import", "function_ref", "apply", "struct",
    "tuple", "return", "alloc_stack", "dealloc_stack", "load", "store", "string_literal",
    "integer_literal", "metatype", "debug_value", "begin_apply", "end_apply",
];

const LLVM_IR: &[&str] = &[
    "define", "declare", "call", "ret", "alloca", "load", "store", "getelementptr", "br", "icmp",
    "tail", "dso_local", "private", "internal", "global", "constant", "align", "void", "ptr",
    "i1", "i8", "i32", "i64",
];

const JVM: &[&str] = &[
    "public", "static", "final", "Code", "aload", "aload_0", "astore", "new", "dup", "ldc",
    "getstatic", "getfield", "putfield", "invokestatic", "invokevirtual", "invokespecial",
    "invokeinterface", "iconst_0", "iconst_1", "return", "areturn", "ireturn",
];

const SMALI: &[&str] = &[
    ".class", ".super", ".source", ".method", ".end", ".locals", ".registers", ".line",
    "public", "static", "final", "invoke-static", "invoke-virtual", "invoke-direct",
    "invoke-interface", "move-result", "move-result-object", "const-string", "const/4",
    "new-instance", "sget-object", "return-void", "return-object",
];

const AARCH64: &[&str] = &[
    "stp", "ldp", "mov", "fmov", "adrp", "add", "sub", "ldr", "str", "bl", "blr", "br", "b",
    "cbz", "cbnz", "cmp", "ret",
];

fn starts_number(chars: &[(usize, char)], i: usize, syntax: Syntax) -> bool {
    let c = chars[i].1;
    let next_is_digit = || chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_digit());
    c.is_ascii_digit()
        || (syntax.hash_immediates && c == '#' && next_is_digit())
        || (c == '-' && next_is_digit() && !preceded_by_word(chars, i))
}

fn preceded_by_word(chars: &[(usize, char)], i: usize) -> bool {
    i > 0 && chars[i - 1].1.is_alphanumeric()
}

/// Index of the quote closing the string opened at `open`.
fn closing_quote(chars: &[(usize, char)], open: usize) -> Option<usize> {
    let mut escaped = false;
    for (j, &(_, c)) in chars.iter().enumerate().skip(open + 1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(j),
            _ => {}
        }
    }
    None
}

fn scan(chars: &[(usize, char)], from: usize, accept: impl Fn(char) -> bool) -> usize {
    chars[from.min(chars.len())..]
        .iter()
        .position(|&(_, c)| !accept(c))
        .map_or(chars.len(), |p| from + p)
}

fn slice<'a>(line: &'a str, chars: &[(usize, char)], from: usize, to: usize) -> &'a str {
    let start = chars.get(from).map_or(line.len(), |(b, _)| *b);
    let end = chars.get(to).map_or(line.len(), |(b, _)| *b);
    &line[start..end]
}

/// Appends text, merging with the previous fragment of the same kind.
fn push(out: &mut Vec<Fragment>, text: &str, kind: TokenKind) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(text),
        _ => out.push(Fragment {
            text: text.to_string(),
            kind,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn kinds(line: &str, lang: CodeLang) -> Vec<(String, TokenKind)> {
        KeywordHighlighter
            .highlight(line, lang)
            .unwrap()
            .into_iter()
            .map(|f| (f.text, f.kind))
            .collect()
    }

    fn has(line: &str, lang: CodeLang, text: &str, kind: TokenKind) -> bool {
        kinds(line, lang).iter().any(|(t, k)| t == text && *k == kind)
    }

    #[test]
    fn swift_keywords_and_strings() {
        let line = r#"    Button("Tap") { count += 1 }"#;
        assert!(has(line, CodeLang::Swift, "\"Tap\"", TokenKind::Str));
        assert!(has(line, CodeLang::Swift, "1", TokenKind::Number));
        assert!(has("struct ContentView: View {", CodeLang::Swift, "struct", TokenKind::Keyword));
        assert!(!has("structure", CodeLang::Swift, "structure", TokenKind::Keyword));
    }

    #[test]
    fn comment_markers_per_language() {
        assert!(has("ret void ; done", CodeLang::LlvmIr, "; done", TokenKind::Comment));
        assert!(has("# virtual methods", CodeLang::Smali, "# virtual methods", TokenKind::Comment));
        assert!(has("bl _foo ; call", CodeLang::Aarch64, "; call", TokenKind::Comment));
        // `;` is not a comment in Swift.
        assert!(!kinds("a; b", CodeLang::Swift).iter().any(|(_, k)| *k == TokenKind::Comment));
    }

    #[test]
    fn smali_opcodes_with_dashes() {
        let line = "    invoke-static {v0}, LFoo;->bar()V";
        assert!(has(line, CodeLang::Smali, "invoke-static", TokenKind::Keyword));
    }

    #[test]
    fn aarch64_immediates() {
        let line = "stp x29, x30, [sp, #-16]!";
        assert!(has(line, CodeLang::Aarch64, "stp", TokenKind::Keyword));
        assert!(has(line, CodeLang::Aarch64, "-16", TokenKind::Number));
        assert!(has("mov w0, #0", CodeLang::Aarch64, "#0", TokenKind::Number));
    }

    #[test]
    fn aarch64_mnemonics_ignore_case() {
        assert!(has("    STP     x28, x27, [sp, #-32]!", CodeLang::Aarch64, "STP", TokenKind::Keyword));
        assert!(has("    FMOV    d0, #12.0", CodeLang::Aarch64, "#12.0", TokenKind::Number));
        // Other languages stay case-sensitive.
        assert!(!has("RETURN", CodeLang::Swift, "RETURN", TokenKind::Keyword));
    }

    #[test]
    fn builtin_disassembly_gets_keywords() {
        let dataset = crate::datasets::builtin("swiftui-button").unwrap();
        let stage = crate::model::playback_stages(&dataset)
            .into_iter()
            .find(|s| s.lang == CodeLang::Aarch64)
            .unwrap();

        for line in stage.lines.iter().skip(1) {
            let fragments = KeywordHighlighter.highlight(line, CodeLang::Aarch64).unwrap();
            assert!(
                fragments.iter().any(|f| f.kind == TokenKind::Keyword),
                "no mnemonic in {line:?}"
            );
        }
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            KeywordHighlighter.highlight("let s = \"open", CodeLang::Swift),
            Err(HighlightError::UnterminatedString { column: 9 })
        );
    }

    #[test]
    fn render_line_falls_back_to_plain() {
        let fragments = render_line(&KeywordHighlighter, "x = \"oops", CodeLang::Kotlin);
        assert_eq!(fragments, vec![Fragment::plain("x = \"oops")]);
    }

    #[test]
    fn escaped_quotes_stay_inside_strings() {
        assert!(has(r#"s = "a\"b" + c"#, CodeLang::Kotlin, r#""a\"b""#, TokenKind::Str));
    }

    #[test]
    fn unknown_language_is_plain() {
        assert_eq!(
            kinds("func 42 // x", CodeLang::Other),
            vec![("func 42 // x".to_string(), TokenKind::Plain)]
        );
    }

    proptest! {
        #[test]
        fn fragments_reassemble_the_line(line in "[ -~é█]{0,60}") {
            for lang in [CodeLang::Swift, CodeLang::Smali, CodeLang::Aarch64, CodeLang::LlvmIr] {
                let joined: String = render_line(&KeywordHighlighter, &line, lang)
                    .into_iter()
                    .map(|f| f.text)
                    .collect();
                prop_assert_eq!(&joined, &line);
            }
        }
    }
}
