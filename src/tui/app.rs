//! Application loop: wall-clock time and keys in, frames out.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::model::Dataset;
use crate::overlay::{KeyOutcome, OverlayEvent, OverlayOptions, PipelineOverlay};

use super::screens::PipelineScreen;

/// Longest wait between redraws. Keeps the cursor blink moving while no
/// timer is pending.
const MAX_WAIT: Duration = Duration::from_millis(100);

/// Plays a dataset until the overlay closes or the user quits.
pub fn run(dataset: &Dataset, options: OverlayOptions) -> io::Result<()> {
    let screen = PipelineScreen::new(PipelineOverlay::new(dataset, options));
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, screen);
    ratatui::restore();
    result
}

fn event_loop(terminal: &mut DefaultTerminal, mut screen: PipelineScreen) -> io::Result<()> {
    let start = Instant::now();

    loop {
        let overlay = screen.overlay_mut();
        overlay.advance_to(start.elapsed());
        log_events(overlay);
        if overlay.is_closed() {
            break;
        }

        terminal.draw(|frame| screen.render(frame))?;

        let wait = screen
            .overlay()
            .next_due()
            .map_or(MAX_WAIT, |due| due.saturating_sub(start.elapsed()))
            .min(MAX_WAIT);
        if !event::poll(wait)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                code => {
                    // Key handling reads the overlay clock, so catch it up first.
                    let overlay = screen.overlay_mut();
                    overlay.advance_to(start.elapsed());
                    if overlay.handle_key(code) == KeyOutcome::Ignored {
                        tracing::trace!(?code, "key ignored");
                    }
                }
            }
        }
    }

    screen.overlay_mut().dispose();
    Ok(())
}

fn log_events(overlay: &mut PipelineOverlay) {
    for event in overlay.drain_events() {
        match event {
            OverlayEvent::StageArchived(index) => tracing::debug!(index, "stage archived"),
            OverlayEvent::Skipped => tracing::info!("playback skipped"),
            OverlayEvent::Finished => tracing::info!("playback finished"),
        }
    }
}
