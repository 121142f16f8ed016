//! What the transcript types for each stage: a banner and a toolchain command.

use crate::model::{CodeLang, Platform, PlaybackStage};
use crate::terminal::StageBlock;

/// Shown when a pipeline has nothing to play.
pub const EMPTY_BANNER: &str = "Initializing pipeline";

const NO_COMMAND: &str = "printf 'no-command'";

/// `[{title}] Decompiling X {app kind}`.
pub fn banner(stage: &PlaybackStage, platform: Platform) -> String {
    format!(
        "[{}] Decompiling X {}",
        stage.display_title(),
        platform.app_kind()
    )
}

/// The toolchain invocation that would produce code in `lang`.
pub fn command(lang: CodeLang, platform: Platform) -> &'static str {
    platform_command(lang, platform)
        .or_else(|| lang_command(lang))
        .unwrap_or(NO_COMMAND)
}

/// Commands specific to one platform's build.
fn platform_command(lang: CodeLang, platform: Platform) -> Option<&'static str> {
    let command = match (platform, lang) {
        (Platform::Ios, CodeLang::Sil) => "swiftc -emit-sil -O -module-name XApp Main.swift",
        (Platform::Ios, CodeLang::LlvmIr) => "swiftc -emit-ir -O -module-name XApp Main.swift",
        (Platform::Ios, CodeLang::Aarch64) => "otool -tV XApp.app/XApp",
        (Platform::Android, CodeLang::Kotlin) => {
            "kotlinc Main.kt -Xuse-ir -P plugin:androidx.compose.compiler.plugin"
        }
        (Platform::Android, CodeLang::JvmBytecode) => "javap -classpath build/classes MainKt",
        (Platform::Android, CodeLang::Smali) => "baksmali disassemble XApp.apk",
        _ => return None,
    };
    Some(command)
}

/// Commands used when the platform has no dedicated entry.
fn lang_command(lang: CodeLang) -> Option<&'static str> {
    match lang {
        CodeLang::Sil => Some("swiftc -emit-sil -O -module-name XApp Main.swift"),
        CodeLang::LlvmIr => Some("swiftc -emit-ir -O -module-name XApp Main.swift"),
        CodeLang::Aarch64 => Some("llvm-objdump -d --no-show-raw-insn XApp.app/XApp"),
        CodeLang::Kotlin => Some("kotlinc Main.kt -Xuse-ir -produce ir"),
        CodeLang::JvmBytecode => Some("javap -c -classpath build/Main.class"),
        CodeLang::Smali => Some("baksmali disassemble XApp.dex"),
        CodeLang::Swift | CodeLang::Other => None,
    }
}

/// The full transcript block for playback stage `index`.
pub fn stage_block(index: usize, stage: &PlaybackStage, platform: Platform) -> StageBlock {
    StageBlock {
        index,
        banner: banner(stage, platform),
        command: command(stage.lang, platform).to_string(),
        lang: stage.lang,
        lines: stage.lines.clone(),
    }
}
