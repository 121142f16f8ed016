//! CLI interface for decomp.
//!
//! `decomp` with no subcommand plays the default dataset. The other
//! subcommands are non-interactive: they print a dataset and exit.
//!
//! A dataset argument is a built-in id (see `decomp list`) or a path to a
//! `.toml`/`.json` dataset file.

mod format;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::datasets;
use crate::model::{Dataset, playback_stages};
use crate::motion::ReducedMotion;
use crate::overlay::OverlayOptions;
use crate::sequence::SequenceOptions;
use crate::tui;

use format::{format_ast, format_dataset, format_list_entry, format_script};

/// decomp — watch a UI get compiled down to machine code.
#[derive(Debug, Parser)]
#[command(name = "decomp", version, after_long_help = KEYS_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

const KEYS_HELP: &str = r"Keys while playing:
  esc / space   skip to the end (close when finished)
  enter         replay when finished
  ← / →         previous / next stage (pauses)
  p             pause / resume
  m             toggle reduced motion
  ↑ ↓ pgup pgdn scroll the transcript
  q             quit

Environment:
  DECOMP_LOG              tracing filter for ~/.decomp/decomp.log
  DECOMP_REDUCED_MOTION   any value but 0/false turns on reduced motion";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a pipeline as a live terminal transcript (the default).
    Play(PlayArgs),

    /// List the built-in datasets.
    List,

    /// Print every stage of a dataset: numbered code, line maps and notes.
    Show {
        /// Built-in id or dataset file.
        dataset: String,
    },

    /// Print the AST stages of a dataset as indented trees.
    Ast {
        /// Built-in id or dataset file.
        dataset: String,
    },

    /// Print the banner and command typed for each playback stage.
    Script {
        /// Built-in id or dataset file.
        dataset: String,
    },
}

#[derive(Debug, Default, Args)]
pub struct PlayArgs {
    /// Built-in id or dataset file. Defaults to `default-dataset` from config.
    dataset: Option<String>,

    /// Load the dataset from this file.
    #[arg(long, conflicts_with = "dataset")]
    file: Option<PathBuf>,

    /// Total playback time in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    duration_ms: Option<u64>,

    /// Reveal everything at once and skip animations.
    #[arg(long)]
    reduced_motion: bool,

    /// Open paused instead of playing immediately.
    #[arg(long)]
    paused: bool,
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        None => cmd_play(config, &PlayArgs::default()),
        Some(Command::Play(args)) => cmd_play(config, &args),
        Some(Command::List) => cmd_list(),
        Some(Command::Show { dataset }) => {
            let dataset = load(&dataset)?;
            print!("{}", format_dataset(&dataset));
            Ok(())
        }
        Some(Command::Ast { dataset }) => {
            let dataset = load(&dataset)?;
            print!("{}", format_ast(&dataset));
            Ok(())
        }
        Some(Command::Script { dataset }) => {
            let dataset = load(&dataset)?;
            print!("{}", format_script(&dataset));
            Ok(())
        }
    }
}

fn load(name: &str) -> Result<Dataset, String> {
    datasets::resolve(name).map_err(|e| e.to_string())
}

fn cmd_play(config: &Config, args: &PlayArgs) -> Result<(), String> {
    let dataset = match &args.file {
        Some(path) => datasets::load_file(path).map_err(|e| e.to_string())?,
        None => load(args.dataset.as_deref().unwrap_or(&config.default_dataset))?,
    };

    let motion = ReducedMotion::detect(args.reduced_motion, config.reduced_motion);
    let options = overlay_options(config, args, motion);
    tracing::info!(
        dataset = %dataset.id,
        stages = playback_stages(&dataset).len(),
        reduced_motion = motion.get(),
        "starting playback"
    );

    tui::run(&dataset, options).map_err(|e| format!("terminal error: {e}"))
}

/// Playback options: command-line flags over config values.
fn overlay_options(config: &Config, args: &PlayArgs, motion: ReducedMotion) -> OverlayOptions {
    OverlayOptions {
        sequence: SequenceOptions {
            auto_play: config.auto_play && !args.paused,
            total_duration: args
                .duration_ms
                .map_or_else(|| config.total_duration(), Duration::from_millis),
            reduced_motion_duration: config.reduced_motion_duration(),
        },
        frame_interval: config.frame_interval(),
        reduced_motion: motion,
    }
}

fn cmd_list() -> Result<(), String> {
    let all = datasets::builtins().map_err(|e| e.to_string())?;
    for (id, dataset) in datasets::builtin_ids().zip(&all) {
        println!("{}", format_list_entry(id, dataset));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_args(args: &[&str]) -> PlayArgs {
        let cli = Cli::try_parse_from(std::iter::once("decomp").chain(args.iter().copied())).unwrap();
        match cli.command {
            Some(Command::Play(args)) => args,
            other => panic!("expected play, got {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["decomp"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn flags_override_config() {
        let config = Config::default();
        let args = play_args(&["play", "compose-button", "--duration-ms", "3000", "--paused"]);
        assert_eq!(args.dataset.as_deref(), Some("compose-button"));

        let options = overlay_options(&config, &args, ReducedMotion::new(true));
        assert_eq!(options.sequence.total_duration, Duration::from_secs(3));
        assert_eq!(options.sequence.reduced_motion_duration, Duration::from_secs(5));
        assert!(!options.sequence.auto_play);
        assert!(options.reduced_motion.get());
        assert_eq!(options.frame_interval, Duration::from_millis(16));
    }

    #[test]
    fn config_values_apply_without_flags() {
        let config = Config {
            total_duration_ms: 9000,
            auto_play: false,
            ..Config::default()
        };
        let options = overlay_options(&config, &PlayArgs::default(), ReducedMotion::new(false));
        assert_eq!(options.sequence.total_duration, Duration::from_secs(9));
        assert!(!options.sequence.auto_play);
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(Cli::try_parse_from(["decomp", "play", "--duration-ms", "0"]).is_err());
    }

    #[test]
    fn file_conflicts_with_dataset() {
        assert!(
            Cli::try_parse_from(["decomp", "play", "swiftui-button", "--file", "x.toml"]).is_err()
        );
    }

    #[test]
    fn show_takes_a_dataset() {
        let cli = Cli::try_parse_from(["decomp", "show", "swiftui-button"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Show { ref dataset }) if dataset == "swiftui-button"));
    }
}
