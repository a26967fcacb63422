//! UI rendering logic

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::widgets;

/// Key bindings shown in the footer.
pub const KEY_HELP: &str = "s:Step Into  n:Step Over  c:Continue  q:Quit  ↑/↓:Scroll Output";

/// Draw the UI
pub fn draw(frame: &mut Frame, app: &App)
{
    let [header, main, status, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    draw_header(frame, header, app);
    draw_main_content(frame, main, app);
    widgets::draw_status(frame, status, app);
    draw_footer(frame, footer, app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App)
{
    let header = Paragraph::new(format!("Stepwise Debugger - {}", app.script))
        .block(Block::default().borders(Borders::ALL).title("Stepwise"))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    frame.render_widget(header, area);
}

fn draw_main_content(frame: &mut Frame, area: Rect, app: &App)
{
    let [left, right] = Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);
    let [code, output] = Layout::vertical([Constraint::Min(10), Constraint::Length(8)]).areas(left);
    let [variables, stack] = Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(right);

    widgets::draw_code(frame, code, app);
    widgets::draw_output(frame, output, app);
    widgets::draw_variables(frame, variables, app);
    widgets::draw_stack(frame, stack, app);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App)
{
    let mut spans = vec![Span::raw(KEY_HELP)];
    if let Some(message) = &app.message {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(message.as_str(), Style::default().fg(Color::Red)));
    }

    let footer = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .style(Style::default().fg(Color::White));

    frame.render_widget(footer, area);
}
