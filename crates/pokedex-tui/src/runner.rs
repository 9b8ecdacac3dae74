// TUI event loop and terminal management
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pokedex_core::PokedexService;
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;

use crate::app::{App, AppEvent, Command};

/// Longest the loop sleeps without input, so task results get drawn promptly
const TICK: Duration = Duration::from_millis(50);

pub async fn run_tui(mut app: App, service: Arc<PokedexService>, mouse_enabled: bool) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if mouse_enabled {
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    } else {
        execute!(stdout, EnterAlternateScreen)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, service).await;

    // Restore terminal even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    service: Arc<PokedexService>,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let commands = app.start();
    dispatch(commands, &service, &tx);

    loop {
        terminal.draw(|f| crate::ui::render(f, app))?;

        let now = Instant::now();
        let timeout = app
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(TICK)
            .min(TICK);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let commands = app.handle_key(key, Instant::now());
                    dispatch(commands, &service, &tx);
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollDown => app.next_item(),
                    MouseEventKind::ScrollUp => app.previous_item(),
                    _ => {}
                },
                _ => {}
            }
        }

        let commands = app.tick(Instant::now());
        dispatch(commands, &service, &tx);

        while let Ok(event) = rx.try_recv() {
            let commands = app.handle_event(event);
            dispatch(commands, &service, &tx);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Run each command on its own task; results come back through `tx`
fn dispatch(commands: Vec<Command>, service: &Arc<PokedexService>, tx: &UnboundedSender<AppEvent>) {
    for command in commands {
        debug!("Dispatching {:?}", command);
        let service = Arc::clone(service);
        let tx = tx.clone();

        tokio::spawn(async move {
            let event = match command {
                Command::FetchList(ticket, filter) => AppEvent::ListLoaded(ticket, service.list(&filter).await),
                Command::Refresh(ticket, filter) => {
                    service.refresh_all();
                    AppEvent::ListLoaded(ticket, service.list(&filter).await)
                }
                Command::FetchRecord(ticket, id) => AppEvent::RecordLoaded(ticket, id, service.get(id).await),
                Command::Create(new) => AppEvent::Saved(service.create(&new).await),
                Command::Update(id, patch) => AppEvent::Saved(service.update(id, &patch).await),
                Command::Delete(id) => AppEvent::Deleted(id, service.delete(id).await),
            };
            // The loop is gone when the user quit mid-request; nothing to do then
            let _ = tx.send(event);
        });
    }
}
