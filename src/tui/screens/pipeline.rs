//! Pipeline screen: header, live transcript, timeline footer.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Padding, Paragraph};

use crate::highlight::TokenKind;
use crate::overlay::PipelineOverlay;
use crate::terminal::{CURSOR, LineRole, TranscriptLine};
use crate::timeline::{MarkState, Timeline};

/// Columns taken by the percentage, status and action after the bar.
const BAR_TRAILER: usize = 32;

pub struct PipelineScreen {
    overlay: PipelineOverlay,
}

impl PipelineScreen {
    pub fn new(overlay: PipelineOverlay) -> Self {
        Self { overlay }
    }

    pub fn overlay(&self) -> &PipelineOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut PipelineOverlay {
        &mut self.overlay
    }

    /// Takes `&mut self` because laying out the transcript settles its scroll
    /// position.
    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::vertical([
            Constraint::Length(3), // header
            Constraint::Min(0),    // transcript
            Constraint::Length(3), // timeline
            Constraint::Length(1), // help
        ])
        .split(area);

        self.render_header(frame, chunks[0]);
        self.render_transcript(frame, chunks[1]);
        self.render_timeline(frame, chunks[2]);
        self.render_help(frame, chunks[3]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let muted = Style::default().fg(Color::DarkGray);
        let mut spans = vec![
            Span::styled(
                self.overlay.title().to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  x@{}", self.overlay.platform().hostname()), muted),
        ];
        let snapshot = self.overlay.snapshot();
        if snapshot.stage_count > 0 {
            spans.push(Span::styled(
                format!(
                    "  stage {}/{} · {:.1}s",
                    snapshot.current_index + 1,
                    snapshot.stage_count,
                    snapshot.stage_duration.as_secs_f64()
                ),
                muted,
            ));
        }
        if self.overlay.reduced_motion() {
            spans.push(Span::styled("  reduced motion", muted));
        }
        if !self.overlay.scroll().is_following() {
            spans.push(Span::styled("  scrolled", muted));
        }

        let header =
            Paragraph::new(Line::from(spans)).block(Block::default().padding(Padding::new(2, 2, 1, 0)));
        frame.render_widget(header, area);
    }

    fn render_transcript(&mut self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .overlay
            .transcript()
            .iter()
            .map(transcript_line)
            .collect();
        let offset = self
            .overlay
            .layout_scroll(lines.len(), usize::from(area.height));

        let transcript = Paragraph::new(lines)
            .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0))
            .block(Block::default().padding(Padding::new(2, 2, 0, 0)));
        frame.render_widget(transcript, area);
    }

    fn render_timeline(&self, frame: &mut Frame, area: Rect) {
        let timeline = Timeline::from_snapshot(&self.overlay.snapshot(), self.overlay.engine().stages());
        let muted = Style::default().fg(Color::DarkGray);
        let bar_width = usize::from(area.width).saturating_sub(4 + BAR_TRAILER);

        let progress = Line::from(vec![
            Span::styled(timeline.bar(bar_width), Style::default().fg(Color::Gray)),
            Span::styled(format!("  {:>3}%  ", timeline.percent), muted),
            Span::styled(
                timeline.status,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  [{}]", timeline.action.label()), muted),
        ]);

        let mut marks = Vec::new();
        for mark in &timeline.marks {
            let (glyph, style) = match mark.state {
                MarkState::Completed => ('✓', Style::default().fg(Color::Gray)),
                MarkState::Active => (
                    '●',
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                MarkState::Pending => ('○', muted),
            };
            marks.push(Span::styled(format!("{glyph} {}  ", mark.label), style));
        }

        let footer = Paragraph::new(vec![progress, Line::from(marks)])
            .block(Block::default().padding(Padding::new(2, 2, 1, 0)));
        frame.render_widget(footer, area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let help = Paragraph::new(Line::from(vec![Span::styled(
            help_text(self.overlay.snapshot().status.is_finished()),
            Style::default().fg(Color::DarkGray),
        )]));
        frame.render_widget(help, area);
    }
}

fn help_text(finished: bool) -> &'static str {
    if finished {
        " ⏎ replay  esc close  ←→ stage  ↑↓ scroll  q quit"
    } else {
        " esc skip  ←→ stage  p pause  m motion  ↑↓ scroll  q quit"
    }
}

fn transcript_line(line: &TranscriptLine) -> Line<'static> {
    let base = match line.role {
        LineRole::Prompt | LineRole::Idle => Style::default().fg(Color::Cyan),
        LineRole::Output => Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
        LineRole::Code { .. } | LineRole::Blank => Style::default().fg(Color::Gray),
    };

    let mut spans = Vec::new();
    if let Some(gutter) = line.gutter() {
        spans.push(Span::styled(gutter + "  ", Style::default().fg(Color::DarkGray)));
    }
    for fragment in &line.fragments {
        let style = match line.role {
            LineRole::Code { .. } => token_style(fragment.kind),
            _ => base,
        };
        spans.push(Span::styled(fragment.text.clone(), style));
    }
    if line.cursor {
        spans.push(Span::styled(CURSOR.to_string(), base));
    }

    let out = Line::from(spans);
    match line.role {
        LineRole::Code { active: true, .. } => out.style(Style::default().bg(Color::DarkGray)),
        _ => out,
    }
}

fn token_style(kind: TokenKind) -> Style {
    match kind {
        TokenKind::Plain => Style::default().fg(Color::Gray),
        TokenKind::Keyword => Style::default().fg(Color::Magenta),
        TokenKind::Str => Style::default().fg(Color::Green),
        TokenKind::Number => Style::default().fg(Color::Yellow),
        TokenKind::Comment => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    }
}
