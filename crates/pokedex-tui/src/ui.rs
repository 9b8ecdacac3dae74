// UI rendering logic
use crate::app::{App, FormState, InputMode, Screen};
use crate::help_ui::{centered_rect, render_keybindings_help};
use pokedex_core::{
    pagination::{has_next, has_previous, PageEntry},
    validation::Field,
    DataSource, Pokemon, PokemonType,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, app: &mut App) {
    let has_banner = app.banner.is_some() && app.screen == Screen::List;

    let mut constraints = vec![
        Constraint::Length(3), // Header
        Constraint::Length(3), // Search input
        Constraint::Length(1), // Active filters
    ];
    if has_banner {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(5)); // Main content
    constraints.push(Constraint::Length(1)); // Pagination
    constraints.push(Constraint::Length(1)); // Status bar

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_search_input(frame, app, chunks[1]);
    render_filter_bar(frame, app, chunks[2]);

    let mut next = 3;
    if has_banner {
        render_banner(frame, app, chunks[next]);
        next += 1;
    }
    let content_area = chunks[next];
    let pagination_area = chunks[next + 1];
    let status_area = chunks[next + 2];

    match app.screen {
        Screen::List => {
            // Narrow terminals get more room for the list
            let list_pct = if frame.area().width < 100 { 55 } else { 45 };
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(list_pct), Constraint::Percentage(100 - list_pct)])
                .split(content_area);
            render_results_list(frame, app, content_chunks[0]);
            render_preview(frame, app, content_chunks[1]);
        }
        Screen::Detail => render_detail(frame, app, content_area),
        Screen::Form => {
            if let Some(form) = &app.form {
                render_form(frame, form, content_area);
            }
        }
    }

    render_pagination(frame, app, pagination_area);
    render_status_bar(frame, app, status_area);

    let full = frame.area();
    match app.input_mode {
        InputMode::Help => render_keybindings_help(frame, full),
        InputMode::ConfirmDelete => render_confirm_delete(frame, app, full),
        InputMode::PageSize => render_page_size_popup(frame, app, full),
        _ => {}
    }
}

/// Rough colour per type, close enough to the games
pub fn type_color(pokemon_type: PokemonType) -> Color {
    match pokemon_type {
        PokemonType::Normal => Color::Rgb(168, 167, 122),
        PokemonType::Fire => Color::Rgb(238, 129, 48),
        PokemonType::Water => Color::Rgb(99, 144, 240),
        PokemonType::Grass => Color::Rgb(122, 199, 76),
        PokemonType::Electric => Color::Rgb(247, 208, 44),
        PokemonType::Ice => Color::Rgb(150, 217, 214),
        PokemonType::Fighting => Color::Rgb(194, 46, 40),
        PokemonType::Poison => Color::Rgb(163, 62, 161),
        PokemonType::Ground => Color::Rgb(226, 191, 101),
        PokemonType::Flying => Color::Rgb(169, 143, 243),
        PokemonType::Psychic => Color::Rgb(249, 85, 135),
        PokemonType::Bug => Color::Rgb(166, 185, 26),
        PokemonType::Rock => Color::Rgb(182, 161, 54),
        PokemonType::Ghost => Color::Rgb(115, 87, 151),
        PokemonType::Dark => Color::Rgb(112, 87, 70),
        PokemonType::Dragon => Color::Rgb(111, 53, 252),
        PokemonType::Steel => Color::Rgb(183, 183, 206),
        PokemonType::Fairy => Color::Rgb(214, 133, 173),
    }
}

fn type_badges(types: &[PokemonType]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for t in types {
        spans.push(Span::styled(
            format!(" {} ", t.label()),
            Style::default().fg(Color::Black).bg(type_color(*t)).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
    }
    spans
}

fn source_style(source: DataSource) -> Style {
    let bg = match source {
        DataSource::Network => Color::Green,
        DataSource::Cache => Color::Cyan,
        DataSource::StaleCache | DataSource::Snapshot => Color::Yellow,
        DataSource::Demo => Color::Magenta,
    };
    Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD)
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![Span::styled(
        "Pokédex",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(logo, header_chunks[0]);

    let mut spans = Vec::new();
    if let Some(source) = app.source {
        spans.push(Span::styled(format!(" {} ", source.label()), source_style(source)));
        spans.push(Span::raw(" "));
    }
    let query = app.query_string();
    spans.push(Span::styled(
        if query.is_empty() { "?".to_string() } else { format!("?{}", query) },
        Style::default().fg(Color::DarkGray),
    ));

    let state = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title(" View "));
    frame.render_widget(state, header_chunks[1]);
}

fn render_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let searching = app.input_mode == InputMode::Searching;
    let input_style = if searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let title = if app.controller.is_pending() {
        "Search (typing...)"
    } else {
        "Search (/ to type, ENTER to apply now)"
    };

    let text = app.controller.pending_text();
    let input = Paragraph::new(text)
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(title).border_style(input_style));
    frame.render_widget(input, area);

    if searching {
        frame.set_cursor_position((area.x + text.chars().count() as u16 + 1, area.y + 1));
    }
}

fn render_filter_bar(frame: &mut Frame, app: &App, area: Rect) {
    let filter = app.filter();
    let muted = Style::default().fg(Color::DarkGray);

    let mut spans = vec![Span::styled("Type: ", muted)];
    match filter.pokemon_type {
        Some(t) => spans.extend(type_badges(&[t])),
        None => spans.push(Span::raw("All ")),
    }

    spans.push(Span::styled("| Sort: ", muted));
    spans.push(Span::raw(match filter.sort_by {
        Some(key) => format!("{} {} ", key.as_str(), filter.order.as_str()),
        None => "default ".to_string(),
    }));

    spans.push(Span::styled("| Per page: ", muted));
    spans.push(Span::raw(filter.page_size.to_string()));

    if !filter.ability_ids.is_empty() {
        spans.push(Span::styled(" | Abilities: ", muted));
        spans.push(Span::raw(
            filter
                .ability_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_banner(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(banner) = &app.banner {
        let text = format!(" ⚠ {} (r to retry)", banner);
        let paragraph = Paragraph::new(text).style(Style::default().fg(Color::Black).bg(Color::Yellow));
        frame.render_widget(paragraph, area);
    }
}

fn render_results_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = if app.loading {
        " Pokémon (loading...) ".to_string()
    } else {
        format!(" Pokémon ({}) ", app.page.as_ref().map_or(0, |p| p.total))
    };

    if app.items().is_empty() {
        let message = if app.loading && app.page.is_none() {
            "Loading..."
        } else if app.filter().is_filtered() {
            "No Pokémon match these filters (c to clear)"
        } else {
            "No Pokémon yet (n to create one)"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .items()
        .iter()
        .enumerate()
        .map(|(i, pokemon)| {
            let is_selected = i == app.selected_index;
            let name_style = if is_selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let mut spans = vec![
                Span::styled(format!("{} ", pokemon.display_number()), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{:<14}", pokemon.name), name_style),
            ];
            spans.extend(type_badges(&pokemon.types));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)))
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_preview(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Preview ");
    let lines = match app.selected_pokemon() {
        Some(pokemon) => pokemon_lines(pokemon),
        None => vec![Line::from(Span::styled("Nothing selected", Style::default().fg(Color::DarkGray)))],
    };
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn pokemon_lines(pokemon: &Pokemon) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(vec![
            Span::styled(pokemon.name.clone(), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::styled(pokemon.display_number(), label),
        ]),
        Line::from(""),
        Line::from(type_badges(&pokemon.types)),
        Line::from(""),
        Line::from(vec![Span::styled("Height   ", label), Span::raw(format!("{} m", pokemon.height))]),
        Line::from(vec![Span::styled("Weight   ", label), Span::raw(format!("{} kg", pokemon.weight))]),
        Line::from(""),
        Line::from(Span::styled("Abilities", label)),
    ];

    if pokemon.abilities.is_empty() {
        lines.push(Line::from("  none"));
    }
    for ability in &pokemon.abilities {
        lines.push(Line::from(format!("  • {}", ability.name)));
    }

    if let Some(url) = &pokemon.image_url {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![Span::styled("Image    ", label), Span::raw(url.clone())]));
    }

    if let Some(created) = pokemon.created_at {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Created  ", label),
            Span::raw(created.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }
    if let Some(updated) = pokemon.updated_at.filter(|_| pokemon.was_updated()) {
        lines.push(Line::from(vec![
            Span::styled("Updated  ", label),
            Span::raw(updated.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }

    lines
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.detail_source {
        Some(source) if source.is_fallback() => format!(" Details ({}) ", source.label()),
        _ => " Details ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let lines = if let Some(id) = app.detail_missing {
        vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("Pokémon #{:03} not found", id),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled("ESC to go back", Style::default().fg(Color::DarkGray))),
        ]
    } else if let Some(pokemon) = &app.detail {
        pokemon_lines(pokemon)
    } else if app.detail_loading {
        vec![Line::from("Loading...")]
    } else {
        vec![Line::from(Span::styled("Nothing to show", Style::default().fg(Color::DarkGray)))]
    };

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn render_form(frame: &mut Frame, state: &FormState, area: Rect) {
    let values = state.form.values();
    let mut lines = Vec::new();

    if let Some(err) = &state.server_error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::White).bg(Color::Red),
        )));
        lines.push(Line::from(""));
    }

    for field in Field::ALL {
        let focused = state.focus == field;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let marker = if focused { "▶ " } else { "  " };

        let mut spans = vec![Span::styled(format!("{}{:<12}", marker, field.label()), label_style)];
        match field {
            Field::Name => spans.push(Span::raw(values.name.clone())),
            Field::Height => spans.push(Span::raw(values.height.clone())),
            Field::Weight => spans.push(Span::raw(values.weight.clone())),
            Field::ImageUrl => spans.push(Span::raw(values.image_url.clone())),
            Field::Types => spans.extend(type_badges(&values.types)),
            Field::Abilities => {
                spans.push(Span::raw(values.abilities.join(", ")));
                if focused {
                    spans.push(Span::styled(
                        format!("  + {}", state.ability_input),
                        Style::default().fg(Color::Cyan),
                    ));
                }
            }
        }
        lines.push(Line::from(spans));

        if field == Field::Types && focused {
            lines.push(type_picker(state));
        }

        if let Some(error) = state.form.error(field) {
            lines.push(Line::from(Span::styled(
                format!("    {}", error),
                Style::default().fg(Color::Red),
            )));
        }
    }

    lines.push(Line::from(""));
    let hint = if state.submitting {
        "Saving..."
    } else if state.form.is_dirty() {
        "Unsaved changes"
    } else {
        ""
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::Cyan))));

    let block = Block::default().borders(Borders::ALL).title(state.title());
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn type_picker(state: &FormState) -> Line<'static> {
    let selected = &state.form.values().types;
    let mut spans = vec![Span::raw("    ")];
    for (i, t) in PokemonType::ALL.iter().enumerate() {
        let mut style = if selected.contains(t) {
            Style::default().fg(Color::Black).bg(type_color(*t))
        } else {
            Style::default().fg(type_color(*t))
        };
        if i == state.type_cursor {
            style = style.add_modifier(Modifier::REVERSED | Modifier::UNDERLINED);
        }
        spans.push(Span::styled(t.label().to_string(), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn render_pagination(frame: &mut Frame, app: &App, area: Rect) {
    let current = app.filter().page;
    let total = app.total_pages();
    let enabled = Style::default().fg(Color::White);
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = vec![Span::styled(
        "‹ prev ",
        if has_previous(current) { enabled } else { disabled },
    )];
    for entry in app.page_entries() {
        match entry {
            PageEntry::Page(page) if page == current => spans.push(Span::styled(
                format!("[{}] ", page),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            PageEntry::Page(page) => spans.push(Span::raw(format!("{} ", page))),
            PageEntry::Ellipsis => spans.push(Span::styled("… ", disabled)),
        }
    }
    spans.push(Span::styled("next ›", if has_next(current, total) { enabled } else { disabled }));
    spans.push(Span::styled(format!("   {}", app.summary()), disabled));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error_message {
        Span::styled(error.clone(), Style::default().fg(Color::Red))
    } else if let Some(message) = &app.status_message {
        Span::styled(message.clone(), Style::default().fg(Color::Green))
    } else {
        match app.input_mode {
            InputMode::Searching => {
                Span::styled("SEARCH | type to filter | ENTER: apply now | ESC: done", Style::default().fg(Color::Yellow))
            }
            InputMode::PageSize => {
                Span::styled("PAGE SIZE | 1-100 | ENTER: apply | ESC: cancel", Style::default().fg(Color::Yellow))
            }
            InputMode::Form => Span::styled(
                "FORM | TAB: next field | SPACE: toggle type | ENTER: add ability / save | Ctrl+R: reset | ESC: cancel",
                Style::default().fg(Color::Green),
            ),
            InputMode::ConfirmDelete => Span::styled("Delete? y/n", Style::default().fg(Color::Red)),
            InputMode::Help => Span::raw("Press any key to close help"),
            InputMode::Normal => match app.screen {
                Screen::Detail => Span::raw("ESC: back | e: edit | d: delete | r: reload | q: quit"),
                _ => Span::raw("j/k: move | h/l: page | /: search | t: type | s: sort | +/-: size | n: new | ?: help | q: quit"),
            },
        }
    };

    frame.render_widget(Paragraph::new(Line::from(status)), area);
}

fn render_confirm_delete(frame: &mut Frame, app: &App, area: Rect) {
    let target = match app.screen {
        Screen::Detail => app.detail.as_ref(),
        _ => app.selected_pokemon(),
    };
    let Some(pokemon) = target else {
        return;
    };

    let popup = centered_rect(40, 20, area);
    frame.render_widget(Clear, popup);
    let text = vec![
        Line::from(""),
        Line::from(format!("Delete {} {}?", pokemon.display_number(), pokemon.name)),
        Line::from(""),
        Line::from(Span::styled("y: delete   n: cancel", Style::default().fg(Color::DarkGray))),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Confirm ").border_style(Style::default().fg(Color::Red)));
    frame.render_widget(paragraph, popup);
}

fn render_page_size_popup(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(30, 15, area);
    frame.render_widget(Clear, popup);
    let paragraph = Paragraph::new(app.page_size_input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Page size (1-100) ")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(paragraph, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokedex_core::{demo, FilterState, ListOutcome, Validator};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;

    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_renders_list_and_pagination() {
        let mut app = App::new(
            FilterState::with_page_size(5),
            Duration::from_millis(300),
            Validator::strict(),
        );
        app.page = Some(demo::list(app.filter()));
        let screen = rendered(&mut app);

        assert!(screen.contains("Pikachu"));
        assert!(screen.contains("[1]"));
        assert!(screen.contains("Showing 1 to 5 of 16 results"));
    }

    #[test]
    fn test_renders_fallback_banner() {
        let mut app = App::new(FilterState::default(), Duration::from_millis(300), Validator::strict());
        let outcome = ListOutcome {
            page: demo::list(app.filter()),
            source: DataSource::Demo,
            error: Some(pokedex_core::Error::Api {
                status: 503,
                message: "down".into(),
            }),
            snapshot_age: None,
        };
        app.banner = outcome.banner();
        app.source = Some(outcome.source);
        app.page = Some(outcome.page);

        let screen = rendered(&mut app);
        assert!(screen.contains("demo data"));
        assert!(screen.contains("r to retry"));
    }
}
