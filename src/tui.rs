//! Interactive playback in the terminal.

mod app;
mod screens;

pub use app::run;
