mod ast;
mod cli;
mod config;
mod datasets;
mod highlight;
mod logging;
mod model;
mod motion;
mod overlay;
mod schedule;
mod sequence;
mod terminal;
mod timeline;
mod tui;
mod typewriter;

use std::process;

use config::Config;

fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    // Playback works without a log file.
    if let Err(e) = logging::init(&config) {
        eprintln!("Warning: logging disabled: {e}");
    }

    if let Err(e) = cli::run(&config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
