use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Render keybindings help popup
pub fn render_keybindings_help(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(70, 85, area);
    frame.render_widget(Clear, popup_area);

    let help_text = Paragraph::new(keybindings_content())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Keybindings ")
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: false })
        .alignment(Alignment::Left);

    frame.render_widget(help_text, popup_area);

    // Footer on the bottom border
    let footer_area = Rect {
        x: popup_area.x + 1,
        y: popup_area.y + popup_area.height.saturating_sub(1),
        width: popup_area.width.saturating_sub(2),
        height: 1,
    };
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        "Press any key to close",
        Style::default().fg(Color::DarkGray),
    )]))
    .alignment(Alignment::Center);
    frame.render_widget(footer, footer_area);
}

fn keybindings_content() -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let section = |title: &str| -> Line<'static> {
        Line::from(vec![Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )])
    };

    let key = |k: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(
                format!("  {:12}", k),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(desc.to_string()),
        ])
    };

    lines.push(section("List"));
    lines.push(Line::from(""));
    lines.push(key("j / k", "Move selection"));
    lines.push(key("h / l", "Previous / next page"));
    lines.push(key("g / G", "First / last page"));
    lines.push(key("/", "Search by name (applies after you stop typing)"));
    lines.push(key("t / T", "Cycle type filter / clear it"));
    lines.push(key("s", "Cycle sort field"));
    lines.push(key("o", "Flip sort order"));
    lines.push(key("+ / -", "Bigger / smaller page size"));
    lines.push(key("p", "Custom page size"));
    lines.push(key("c", "Clear all filters"));
    lines.push(key("r", "Refresh from the server"));
    lines.push(key("ENTER", "Open details"));
    lines.push(Line::from(""));

    lines.push(section("Records"));
    lines.push(Line::from(""));
    lines.push(key("n", "New Pokémon"));
    lines.push(key("e", "Edit selected"));
    lines.push(key("d", "Delete selected (asks first)"));
    lines.push(key("ESC", "Back to the list"));
    lines.push(Line::from(""));

    lines.push(section("Form"));
    lines.push(Line::from(""));
    lines.push(key("TAB / ↓", "Next field"));
    lines.push(key("Shift+TAB / ↑", "Previous field"));
    lines.push(key("← / →", "Move through types"));
    lines.push(key("SPACE", "Toggle type under cursor"));
    lines.push(key("ENTER", "Add ability, or save"));
    lines.push(key("Ctrl+S", "Save"));
    lines.push(key("Ctrl+R", "Reset to initial values"));
    lines.push(key("ESC", "Cancel"));
    lines.push(Line::from(""));

    lines.push(Line::from(vec![Span::styled(
        "  q quits, ? toggles this help",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )]));

    lines
}

/// Helper function to create a centered rect
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
