// Core Pokédex logic - everything the TUI and CLI share
pub mod backend;
pub mod config;
pub mod debounce;
pub mod demo;
pub mod error;
pub mod filter;
pub mod models;
pub mod pagination;
pub mod providers;
pub mod query_cache;
pub mod sequence;
pub mod service;
pub mod validation;

pub use backend::PokemonBackend;
pub use config::Config;
pub use debounce::FilterController;
pub use error::Error;
pub use filter::{FilterState, ListKey, SortKey, SortOrder};
pub use models::{Ability, AbilityRef, ListPage, NewPokemon, Pokemon, PokemonPatch, PokemonType};
pub use pagination::{page_window, PageEntry};
pub use providers::{HttpBackend, MemoryBackend};
pub use query_cache::QueryCache;
pub use sequence::{RequestSequencer, Ticket};
pub use service::{open_snapshot_store, DataSource, ListOutcome, PokedexService, RecordOutcome};
pub use validation::{Field, FieldErrors, FormValues, PokemonForm, Validator};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
