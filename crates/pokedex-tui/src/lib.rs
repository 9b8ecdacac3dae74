// Terminal UI implementation using ratatui

pub mod app;
pub mod help_ui;
pub mod runner;
pub mod ui;

pub use app::{App, AppEvent, Command, FormState, InputMode, Screen};
pub use runner::run_tui;
