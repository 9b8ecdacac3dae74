// TUI application state and event handling
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pokedex_core::{
    debounce::FilterController,
    pagination::{self, PageEntry, PAGE_SIZE_PRESETS},
    validation::Field,
    DataSource, FilterState, ListOutcome, ListPage, NewPokemon, Pokemon, PokemonForm,
    PokemonPatch, PokemonType, RecordOutcome, RequestSequencer, SortKey, Ticket, Validator,
};
use ratatui::widgets::ListState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,        // Navigating the list or a detail page
    Searching,     // Typing in the search box
    PageSize,      // Typing a custom page size
    Form,          // Editing the create/edit form
    ConfirmDelete, // Waiting for y/n
    Help,          // Keybinding overlay
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    List,
    Detail,
    Form,
}

/// Work the runner should start in the background
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchList(Ticket, FilterState),
    /// Mark every cached read stale, then fetch
    Refresh(Ticket, FilterState),
    FetchRecord(Ticket, u32),
    Create(NewPokemon),
    Update(u32, PokemonPatch),
    Delete(u32),
}

/// Results coming back from background tasks
#[derive(Debug)]
pub enum AppEvent {
    ListLoaded(Ticket, pokedex_core::Result<ListOutcome>),
    RecordLoaded(Ticket, u32, pokedex_core::Result<RecordOutcome>),
    Saved(pokedex_core::Result<Pokemon>),
    Deleted(u32, pokedex_core::Result<()>),
}

/// Create/edit form plus the bits only the terminal needs
#[derive(Debug, Clone)]
pub struct FormState {
    pub form: PokemonForm,
    /// `Some(id)` when editing an existing record
    pub editing: Option<u32>,
    pub focus: Field,
    pub ability_input: String,
    pub type_cursor: usize,
    pub submitting: bool,
    pub server_error: Option<String>,
}

impl FormState {
    fn new(form: PokemonForm, editing: Option<u32>) -> Self {
        Self {
            form,
            editing,
            focus: Field::Name,
            ability_input: String::new(),
            type_cursor: 0,
            submitting: false,
            server_error: None,
        }
    }

    pub fn title(&self) -> String {
        match self.editing {
            Some(id) => format!(" Edit #{:03} ", id),
            None => " New Pokémon ".to_string(),
        }
    }

    fn focus_next(&mut self) {
        let i = Field::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = Field::ALL[(i + 1) % Field::ALL.len()];
    }

    fn focus_previous(&mut self) {
        let i = Field::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = Field::ALL[(i + Field::ALL.len() - 1) % Field::ALL.len()];
    }

    fn type_under_cursor(&self) -> PokemonType {
        PokemonType::ALL[self.type_cursor % PokemonType::ALL.len()]
    }

    fn push_char(&mut self, c: char) {
        let values = self.form.values();
        match self.focus {
            Field::Name => {
                let next = format!("{}{}", values.name, c);
                self.form.set_name(next);
            }
            Field::Height => {
                let next = format!("{}{}", values.height, c);
                self.form.set_height(next);
            }
            Field::Weight => {
                let next = format!("{}{}", values.weight, c);
                self.form.set_weight(next);
            }
            Field::ImageUrl => {
                let next = format!("{}{}", values.image_url, c);
                self.form.set_image_url(next);
            }
            Field::Abilities => self.ability_input.push(c),
            Field::Types => {
                if c == ' ' {
                    let t = self.type_under_cursor();
                    self.form.toggle_type(t);
                }
            }
        }
    }

    fn pop_char(&mut self) {
        let values = self.form.values();
        match self.focus {
            Field::Name => {
                let next = drop_last(&values.name);
                self.form.set_name(next);
            }
            Field::Height => {
                let next = drop_last(&values.height);
                self.form.set_height(next);
            }
            Field::Weight => {
                let next = drop_last(&values.weight);
                self.form.set_weight(next);
            }
            Field::ImageUrl => {
                let next = drop_last(&values.image_url);
                self.form.set_image_url(next);
            }
            Field::Abilities => {
                if self.ability_input.pop().is_none() {
                    if let Some(last) = values.abilities.last().cloned() {
                        self.form.remove_ability(&last);
                    }
                }
            }
            Field::Types => {}
        }
    }
}

fn drop_last(s: &str) -> String {
    let mut s = s.to_string();
    s.pop();
    s
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub screen: Screen,
    pub controller: FilterController,
    pub page: Option<ListPage>,
    pub source: Option<DataSource>,
    /// Shown above the list when data came from a fallback
    pub banner: Option<String>,
    pub selected_index: usize,
    pub list_state: ListState,
    pub loading: bool,
    pub detail: Option<Pokemon>,
    pub detail_source: Option<DataSource>,
    pub detail_loading: bool,
    /// Id the backend said doesn't exist
    pub detail_missing: Option<u32>,
    pub form: Option<FormState>,
    pub page_size_input: String,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    pub validator: Validator,
    list_requests: RequestSequencer,
    record_requests: RequestSequencer,
}

impl App {
    pub fn new(filter: FilterState, debounce: Duration, validator: Validator) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            screen: Screen::List,
            controller: FilterController::new(filter, debounce),
            page: None,
            source: None,
            banner: None,
            selected_index: 0,
            list_state,
            loading: false,
            detail: None,
            detail_source: None,
            detail_loading: false,
            detail_missing: None,
            form: None,
            page_size_input: String::new(),
            status_message: None,
            error_message: None,
            validator,
            list_requests: RequestSequencer::new(),
            record_requests: RequestSequencer::new(),
        }
    }

    pub fn filter(&self) -> &FilterState {
        self.controller.filter()
    }

    /// Shareable URL-style state for the header
    pub fn query_string(&self) -> String {
        self.filter().to_query_string()
    }

    pub fn items(&self) -> &[Pokemon] {
        self.page.as_ref().map(|p| p.items.as_slice()).unwrap_or(&[])
    }

    pub fn selected_pokemon(&self) -> Option<&Pokemon> {
        self.items().get(self.selected_index)
    }

    pub fn total_pages(&self) -> u32 {
        self.page.as_ref().map_or(1, |p| p.total_pages.max(1))
    }

    pub fn page_entries(&self) -> Vec<PageEntry> {
        let total = self.total_pages();
        pagination::page_window(self.filter().page.min(total), total).unwrap_or_default()
    }

    pub fn summary(&self) -> String {
        let total = self.page.as_ref().map_or(0, |p| p.total);
        pagination::summary(self.filter().page, self.filter().page_size, total)
    }

    /// Commands to run right after startup
    pub fn start(&mut self) -> Vec<Command> {
        vec![self.fetch_list()]
    }

    /// When the runner should wake up even without input
    pub fn next_deadline(&self) -> Option<Instant> {
        self.controller.next_deadline()
    }

    /// Commit debounced search text once its quiet period is over
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        if self.controller.poll(now) {
            vec![self.fetch_list()]
        } else {
            Vec::new()
        }
    }

    fn fetch_list(&mut self) -> Command {
        self.loading = true;
        Command::FetchList(self.list_requests.issue(), self.filter().clone())
    }

    fn refresh(&mut self) -> Command {
        self.loading = true;
        Command::Refresh(self.list_requests.issue(), self.filter().clone())
    }

    fn fetch_if(&mut self, changed: bool) -> Vec<Command> {
        if changed {
            vec![self.fetch_list()]
        } else {
            Vec::new()
        }
    }

    fn open_detail(&mut self, id: u32) -> Command {
        self.screen = Screen::Detail;
        self.detail_loading = true;
        self.detail_missing = None;
        if self.detail.as_ref().map(|p| p.id) != Some(id) {
            self.detail = None;
        }
        Command::FetchRecord(self.record_requests.issue(), id)
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::ListLoaded(ticket, result) => {
                // Someone asked for a newer filter in the meantime
                if !self.list_requests.is_current(ticket) {
                    return Vec::new();
                }
                self.loading = false;
                match result {
                    Ok(outcome) => {
                        if outcome.page.is_past_end() {
                            // Records vanished under us, go to the new last page
                            let last = outcome.page.total_pages;
                            self.controller.set_page(last);
                            return vec![self.fetch_list()];
                        }
                        self.banner = outcome.banner();
                        self.source = Some(outcome.source);
                        self.page = Some(outcome.page);
                        self.error_message = None;
                        self.clamp_selection();
                    }
                    Err(e) => {
                        self.error_message = Some(format!("Failed to load Pokémon: {}", e));
                    }
                }
                Vec::new()
            }
            AppEvent::RecordLoaded(ticket, id, result) => {
                if !self.record_requests.is_current(ticket) {
                    return Vec::new();
                }
                self.detail_loading = false;
                match result {
                    Ok(outcome) => {
                        self.detail_source = Some(outcome.source);
                        if let Some(err) = &outcome.error {
                            self.status_message = Some(format!("Showing {}: {}", outcome.source.label(), err));
                        }
                        self.detail = Some(outcome.pokemon);
                    }
                    Err(e) if e.is_not_found() => {
                        self.detail = None;
                        self.detail_missing = Some(id);
                    }
                    Err(e) => {
                        self.error_message = Some(format!("Failed to load #{:03}: {}", id, e));
                    }
                }
                Vec::new()
            }
            AppEvent::Saved(result) => match result {
                Ok(pokemon) => {
                    let created = self.form.as_ref().map_or(false, |f| f.editing.is_none());
                    self.status_message = Some(format!(
                        "{} {} {}",
                        if created { "Created" } else { "Saved" },
                        pokemon.display_number(),
                        pokemon.name
                    ));
                    self.form = None;
                    self.input_mode = InputMode::Normal;
                    self.screen = Screen::Detail;
                    self.detail_missing = None;
                    self.detail = Some(pokemon);
                    self.detail_source = Some(DataSource::Network);
                    vec![self.fetch_list()]
                }
                Err(e) => {
                    if let Some(form) = self.form.as_mut() {
                        form.submitting = false;
                        form.server_error = Some(e.to_string());
                    } else {
                        self.error_message = Some(e.to_string());
                    }
                    Vec::new()
                }
            },
            AppEvent::Deleted(id, result) => match result {
                Ok(()) => {
                    self.status_message = Some(format!("Deleted #{:03}", id));
                    self.leave_detail();
                    self.detail = None;
                    vec![self.fetch_list()]
                }
                Err(e) => {
                    self.error_message = Some(format!("Delete failed: {}", e));
                    Vec::new()
                }
            },
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Command> {
        // Any key press acknowledges the last message
        self.status_message = None;

        match self.input_mode {
            InputMode::Help => {
                self.input_mode = InputMode::Normal;
                Vec::new()
            }
            InputMode::Searching => self.handle_search_key(key, now),
            InputMode::PageSize => self.handle_page_size_key(key),
            InputMode::ConfirmDelete => self.handle_confirm_key(key),
            InputMode::Form => self.handle_form_key(key),
            InputMode::Normal => match self.screen {
                Screen::Detail => self.handle_detail_key(key),
                Screen::List | Screen::Form => self.handle_list_key(key),
            },
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Command> {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                Vec::new()
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let changed = self.controller.flush();
                self.fetch_if(changed)
            }
            KeyCode::Backspace => {
                let text = drop_last(self.controller.pending_text());
                let changed = self.controller.on_keystroke(text, now);
                self.fetch_if(changed)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let changed = self.controller.clear_search();
                self.fetch_if(changed)
            }
            KeyCode::Char(c) => {
                let text = format!("{}{}", self.controller.pending_text(), c);
                let changed = self.controller.on_keystroke(text, now);
                self.fetch_if(changed)
            }
            _ => Vec::new(),
        }
    }

    fn handle_page_size_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Esc => {
                self.page_size_input.clear();
                self.input_mode = InputMode::Normal;
                Vec::new()
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let input = std::mem::take(&mut self.page_size_input);
                match input.trim().parse::<u32>() {
                    Ok(size) => match self.controller.set_page_size(size) {
                        Ok(changed) => self.fetch_if(changed),
                        Err(e) => {
                            self.error_message = Some(e.to_string());
                            Vec::new()
                        }
                    },
                    Err(_) => {
                        self.error_message = Some(format!("'{}' is not a page size", input.trim()));
                        Vec::new()
                    }
                }
            }
            KeyCode::Backspace => {
                self.page_size_input.pop();
                Vec::new()
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.page_size_input.push(c);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Vec<Command> {
        self.input_mode = InputMode::Normal;
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let target = match self.screen {
                    Screen::Detail => self.detail.as_ref().map(|p| p.id),
                    _ => self.selected_pokemon().map(|p| p.id),
                };
                target.map(Command::Delete).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                Vec::new()
            }
            KeyCode::Char('?') => {
                self.input_mode = InputMode::Help;
                Vec::new()
            }
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Searching;
                Vec::new()
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.next_item();
                Vec::new()
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.previous_item();
                Vec::new()
            }
            KeyCode::Char('l') | KeyCode::Right => {
                let total = self.total_pages();
                let changed = self.controller.next_page(total);
                self.fetch_if(changed)
            }
            KeyCode::Char('h') | KeyCode::Left => {
                let changed = self.controller.previous_page();
                self.fetch_if(changed)
            }
            KeyCode::Char('g') => {
                let changed = self.controller.set_page(1);
                self.fetch_if(changed)
            }
            KeyCode::Char('G') => {
                let last = self.total_pages();
                let changed = self.controller.set_page(last);
                self.fetch_if(changed)
            }
            KeyCode::Char('t') => {
                let next = next_type(self.filter().pokemon_type);
                let changed = self.controller.select_type(next);
                self.fetch_if(changed)
            }
            KeyCode::Char('T') => {
                let changed = self.controller.select_type(None);
                self.fetch_if(changed)
            }
            KeyCode::Char('s') => {
                let next = next_sort(self.filter().sort_by);
                let order = self.filter().order;
                let changed = self.controller.set_sort(next, order);
                self.fetch_if(changed)
            }
            KeyCode::Char('o') => {
                let sort_by = self.filter().sort_by;
                let order = self.filter().order.flipped();
                let changed = self.controller.set_sort(sort_by, order);
                self.fetch_if(changed)
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let size = next_preset(self.filter().page_size);
                self.set_page_size(size)
            }
            KeyCode::Char('-') => {
                let size = previous_preset(self.filter().page_size);
                self.set_page_size(size)
            }
            KeyCode::Char('p') => {
                self.page_size_input.clear();
                self.input_mode = InputMode::PageSize;
                Vec::new()
            }
            KeyCode::Char('c') => {
                let changed = self.controller.clear_filters();
                self.fetch_if(changed)
            }
            KeyCode::Char('r') => vec![self.refresh()],
            KeyCode::Char('n') => {
                self.open_form(None);
                Vec::new()
            }
            KeyCode::Char('e') => {
                if let Some(pokemon) = self.selected_pokemon().cloned() {
                    self.open_form(Some(&pokemon));
                }
                Vec::new()
            }
            KeyCode::Char('d') => {
                if self.selected_pokemon().is_some() {
                    self.input_mode = InputMode::ConfirmDelete;
                }
                Vec::new()
            }
            KeyCode::Enter => match self.selected_pokemon().map(|p| p.id) {
                Some(id) => vec![self.open_detail(id)],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Back to the list; a record still loading is no longer wanted
    fn leave_detail(&mut self) {
        self.record_requests.cancel_all();
        self.detail_loading = false;
        self.screen = Screen::List;
    }

    fn quit(&mut self) {
        self.list_requests.cancel_all();
        self.record_requests.cancel_all();
        self.should_quit = true;
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Char('q') => {
                self.quit();
                Vec::new()
            }
            KeyCode::Esc | KeyCode::Backspace => {
                self.leave_detail();
                Vec::new()
            }
            KeyCode::Char('?') => {
                self.input_mode = InputMode::Help;
                Vec::new()
            }
            KeyCode::Char('e') => {
                if let Some(pokemon) = self.detail.clone() {
                    self.open_form(Some(&pokemon));
                }
                Vec::new()
            }
            KeyCode::Char('d') => {
                if self.detail.is_some() {
                    self.input_mode = InputMode::ConfirmDelete;
                }
                Vec::new()
            }
            KeyCode::Char('r') => match self.detail.as_ref().map(|p| p.id).or(self.detail_missing) {
                Some(id) => vec![self.open_detail(id)],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Vec<Command> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let Some(state) = self.form.as_mut() else {
            self.input_mode = InputMode::Normal;
            return Vec::new();
        };

        match key.code {
            KeyCode::Esc => {
                self.close_form();
                Vec::new()
            }
            KeyCode::Char('s') if ctrl => self.submit_form(),
            KeyCode::Char('r') if ctrl => {
                state.form.reset();
                state.ability_input.clear();
                state.server_error = None;
                Vec::new()
            }
            KeyCode::Tab | KeyCode::Down => {
                state.focus_next();
                Vec::new()
            }
            KeyCode::BackTab | KeyCode::Up => {
                state.focus_previous();
                Vec::new()
            }
            KeyCode::Left if state.focus == Field::Types => {
                state.type_cursor = (state.type_cursor + PokemonType::ALL.len() - 1) % PokemonType::ALL.len();
                Vec::new()
            }
            KeyCode::Right if state.focus == Field::Types => {
                state.type_cursor = (state.type_cursor + 1) % PokemonType::ALL.len();
                Vec::new()
            }
            KeyCode::Enter if state.focus == Field::Abilities && !state.ability_input.trim().is_empty() => {
                let name = std::mem::take(&mut state.ability_input);
                if !state.form.add_ability(&name) {
                    state.server_error = Some(format!("Can't add ability '{}'", name.trim()));
                }
                Vec::new()
            }
            KeyCode::Enter => self.submit_form(),
            KeyCode::Backspace => {
                state.pop_char();
                Vec::new()
            }
            KeyCode::Char(c) => {
                state.push_char(c);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn open_form(&mut self, pokemon: Option<&Pokemon>) {
        let state = match pokemon {
            Some(p) => FormState::new(PokemonForm::edit(p, self.validator), Some(p.id)),
            None => FormState::new(PokemonForm::new(self.validator), None),
        };
        self.form = Some(state);
        self.screen = Screen::Form;
        self.input_mode = InputMode::Form;
    }

    fn close_form(&mut self) {
        let editing = self.form.take().and_then(|f| f.editing);
        self.input_mode = InputMode::Normal;
        self.screen = if editing.is_some() && self.detail.is_some() {
            Screen::Detail
        } else {
            Screen::List
        };
    }

    fn submit_form(&mut self) -> Vec<Command> {
        let Some(state) = self.form.as_mut() else {
            return Vec::new();
        };
        if state.submitting {
            return Vec::new();
        }
        state.server_error = None;

        match state.editing {
            None => match state.form.submit() {
                Ok(new) => {
                    state.submitting = true;
                    vec![Command::Create(new)]
                }
                Err(_) => Vec::new(),
            },
            Some(id) => match state.form.submit_changes() {
                Ok(patch) if patch.is_empty() => {
                    self.status_message = Some("Nothing changed".to_string());
                    self.close_form();
                    Vec::new()
                }
                Ok(patch) => {
                    state.submitting = true;
                    vec![Command::Update(id, patch)]
                }
                Err(_) => Vec::new(),
            },
        }
    }

    fn set_page_size(&mut self, size: u32) -> Vec<Command> {
        match self.controller.set_page_size(size) {
            Ok(changed) => self.fetch_if(changed),
            Err(e) => {
                self.error_message = Some(e.to_string());
                Vec::new()
            }
        }
    }

    pub fn next_item(&mut self) {
        let len = self.items().len();
        if len > 0 {
            self.selected_index = (self.selected_index + 1).min(len - 1);
            self.list_state.select(Some(self.selected_index));
        }
    }

    pub fn previous_item(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
        self.list_state.select(Some(self.selected_index));
    }

    fn clamp_selection(&mut self) {
        let len = self.items().len();
        self.selected_index = if len == 0 { 0 } else { self.selected_index.min(len - 1) };
        self.list_state.select(Some(self.selected_index));
    }
}

fn next_type(current: Option<PokemonType>) -> Option<PokemonType> {
    match current {
        None => Some(PokemonType::ALL[0]),
        Some(t) => {
            let i = PokemonType::ALL.iter().position(|x| *x == t).unwrap_or(0);
            PokemonType::ALL.get(i + 1).copied()
        }
    }
}

fn next_sort(current: Option<SortKey>) -> Option<SortKey> {
    match current {
        None => Some(SortKey::Id),
        Some(SortKey::Id) => Some(SortKey::Name),
        Some(SortKey::Name) => Some(SortKey::Type),
        Some(SortKey::Type) => None,
    }
}

fn next_preset(size: u32) -> u32 {
    PAGE_SIZE_PRESETS
        .iter()
        .copied()
        .find(|p| *p > size)
        .unwrap_or(PAGE_SIZE_PRESETS[0])
}

fn previous_preset(size: u32) -> u32 {
    PAGE_SIZE_PRESETS
        .iter()
        .rev()
        .copied()
        .find(|p| *p < size)
        .unwrap_or(PAGE_SIZE_PRESETS[PAGE_SIZE_PRESETS.len() - 1])
}
