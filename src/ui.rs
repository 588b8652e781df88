use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::{CrosstermBackend, Terminal},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::{After, App, InputMode};

const TITLE: &str = "Hypr Quick Settings (TUI)";
const HELP: &str =
    "Up/Down: select   Left/Right: adjust   Enter: toggle/edit   r: refresh   q: quit";

/// Restores the terminal on every exit path, including panics.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        stdout()
            .execute(EnterAlternateScreen)
            .context("Failed to enter alternate screen")?;
        if let Err(e) = enable_raw_mode() {
            let _ = stdout().execute(LeaveAlternateScreen);
            return Err(e).context("Failed to enable raw mode");
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

fn flush_input() -> Result<()> {
    while event::poll(Duration::ZERO)? {
        event::read()?;
    }
    Ok(())
}

pub fn run_tui(app: &mut App) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal: Terminal<CrosstermBackend<Stdout>> = Terminal::new(backend)?;
    terminal.clear()?;

    while !app.should_quit {
        terminal.draw(|frame| ui(frame, app))?;
        // Blocks until the next event; nothing changes on screen without one.
        if let Event::Key(key_event) = event::read()? {
            if key_event.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key_event.code, Instant::now()) == After::FlushInput {
                flush_input()?;
            }
        }
    }
    terminal.show_cursor()?;
    Ok(())
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// One row of the settings list, e.g. `Brightness  DP-1 40/100`.
pub fn row_text(label: &str, value: &str) -> String {
    format!("{label:<11} {value}")
}

pub fn ui(frame: &mut ratatui::Frame, app: &mut App) {
    //title, help, spacer, settings, footer
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(
        Paragraph::new(TITLE).style(Style::default().add_modifier(Modifier::BOLD)),
        layout[0],
    );
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::Gray)),
        layout[1],
    );

    let rows: Vec<ListItem> = app
        .items
        .iter()
        .map(|item| ListItem::new(row_text(item.label(), &app.value_of(*item))))
        .collect();
    let list = List::new(rows)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, layout[3], &mut app.state);

    if app.input_mode == InputMode::Editing {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let input_block = Paragraph::new(app.input.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Set brightness (0-{}) (Enter to confirm, Esc to cancel)", app.entry_max)),
        );
        frame.render_widget(input_block, area);
    }

    let footer = Paragraph::new(app.message.as_str()).style(Style::default().fg(Color::Yellow));
    frame.render_widget(footer, layout[4]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_align_values_after_the_longest_label() {
        assert_eq!(row_text("Vibrance", "0.50 (on)"), "Vibrance    0.50 (on)");
        assert_eq!(row_text("Night Light", "4000 (off)"), "Night Light 4000 (off)");
    }

    #[test]
    fn popup_sits_inside_the_frame() {
        let outer = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(50, 20, outer);
        assert!(popup.x >= outer.x && popup.right() <= outer.right());
        assert!(popup.y >= outer.y && popup.bottom() <= outer.bottom());
        assert_eq!(popup.width, 50);
    }
}
