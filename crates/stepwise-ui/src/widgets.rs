//! Widget components for displaying debugger state

use std::path::Path;

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use stepwise_core::Snapshot;

use crate::app::{App, RunState};

/// Lines shown above and below the current line in the code view.
pub const CODE_CONTEXT: usize = 8;

/// Marker drawn next to the current line and the innermost stack frame.
pub const CURRENT_MARKER: &str = "→";

/// One row of the code view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine<'a>
{
    pub number: usize,
    pub text: &'a str,
    pub current: bool,
}

/// The window of `lines` around 1-based `current`, `context` lines each side.
#[must_use]
pub fn code_window(lines: &[String], current: usize, context: usize) -> Vec<CodeLine<'_>>
{
    if lines.is_empty() {
        return Vec::new();
    }
    let current = current.clamp(1, lines.len());
    let first = current.saturating_sub(context).max(1);
    let last = (current + context).min(lines.len());

    (first..=last)
        .map(|number| CodeLine {
            number,
            text: &lines[number - 1],
            current: number == current,
        })
        .collect()
}

/// Status bar text for the latest snapshot.
#[must_use]
pub fn status_text(snapshot: Option<&Snapshot>, state: RunState) -> String
{
    let described = snapshot.map(|snapshot| match (snapshot.exception(), snapshot.location()) {
        (Some(exception), _) => format!("Exception: {exception}"),
        (None, Some(location)) => format!(
            "{}:{} in {}",
            file_name(&location.file),
            location.line,
            snapshot.function().unwrap_or_default()
        ),
        (None, None) => String::new(),
    });

    match (state, described) {
        (RunState::Finished, Some(text)) if snapshot.is_some_and(|snapshot| !snapshot.is_pause()) => {
            format!("{text} | Program finished")
        }
        (RunState::Finished, _) => "Program finished".to_string(),
        (RunState::Running, None) => "Starting...".to_string(),
        (RunState::Running, Some(_)) => "Running...".to_string(),
        (RunState::Paused, Some(text)) => text,
        (RunState::Paused, None) => String::new(),
    }
}

fn file_name(path: &str) -> &str
{
    Path::new(path).file_name().and_then(|name| name.to_str()).unwrap_or(path)
}

/// `name = value` rows for the variables pane.
#[must_use]
pub fn variable_lines(snapshot: Option<&Snapshot>) -> Vec<String>
{
    match snapshot {
        Some(snapshot) if !snapshot.locals().is_empty() => snapshot
            .locals()
            .iter()
            .map(|(name, value)| format!("{name} = {value}"))
            .collect(),
        _ => vec!["No local variables".to_string()],
    }
}

/// Draw the source around the current line
pub fn draw_code(frame: &mut Frame, area: Rect, app: &App)
{
    let current = app
        .snapshot
        .as_ref()
        .and_then(Snapshot::location)
        .map_or(1, |location| location.line as usize);

    let lines: Vec<Line> = match app.source.as_ref().map(|source| &source.lines) {
        None => vec![Line::from("Waiting for the first pause...")],
        Some(Err(_)) => vec![Line::from(Span::styled(
            "Could not read source file",
            Style::default().fg(Color::Red),
        ))],
        Some(Ok(source)) => code_window(source, current, CODE_CONTEXT)
            .into_iter()
            .map(|line| {
                let marker = if line.current { CURRENT_MARKER } else { " " };
                let style = if line.current {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(format!("{marker} {:>4} ", line.number), Style::default().fg(Color::DarkGray)),
                    Span::styled(line.text.to_string(), style),
                ])
            })
            .collect(),
    };

    let title = app.source.as_ref().map_or_else(|| app.script.clone(), |source| source.path.clone());
    let code = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(code, area);
}

/// Draw the local variables of the paused frame
pub fn draw_variables(frame: &mut Frame, area: Rect, app: &App)
{
    let lines: Vec<Line> = variable_lines(app.snapshot.as_ref())
        .into_iter()
        .map(Line::from)
        .collect();

    let variables = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Variables"))
        .wrap(Wrap { trim: false });
    frame.render_widget(variables, area);
}

/// Draw the call stack, innermost frame first
pub fn draw_stack(frame: &mut Frame, area: Rect, app: &App)
{
    let stack = app.snapshot.as_ref().map(Snapshot::stack).unwrap_or_default();
    let lines: Vec<Line> = stack
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let marker = if i == 0 { CURRENT_MARKER } else { " " };
            let text = format!("{marker} {} ({}:{})", entry.function, entry.file, entry.line);
            if i == 0 {
                Line::from(Span::styled(text, Style::default().fg(Color::Yellow)))
            } else {
                Line::from(text)
            }
        })
        .collect();

    let stack = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Call Stack"));
    frame.render_widget(stack, area);
}

/// Draw the lines printed by the target
pub fn draw_output(frame: &mut Frame, area: Rect, app: &App)
{
    let visible = usize::from(area.height.saturating_sub(2));
    let end = app.output.len().saturating_sub(app.output_scrollback);
    let start = end.saturating_sub(visible);

    let lines: Vec<Line> = app
        .output
        .range(start..end)
        .map(|line| Line::from(line.as_str()))
        .collect();

    let title = if app.output_scrollback > 0 {
        format!("Output (-{})", app.output_scrollback)
    } else {
        "Output".to_string()
    };
    let output = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(output, area);
}

/// Draw the status bar
pub fn draw_status(frame: &mut Frame, area: Rect, app: &App)
{
    let text = status_text(app.snapshot.as_ref(), app.state);
    let color = if app.snapshot.as_ref().and_then(Snapshot::exception).is_some() {
        Color::Red
    } else {
        Color::Green
    };

    let status = Paragraph::new(text).style(Style::default().fg(color).add_modifier(Modifier::BOLD));
    frame.render_widget(status, area);
}
