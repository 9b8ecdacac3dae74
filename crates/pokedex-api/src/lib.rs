// HTTP client for the Pokédex catalog backend
pub mod client;
pub mod models;
pub mod retry;

// Re-export common types
pub use client::{ApiError, PokedexClient, Result, DEFAULT_BASE_URL};
pub use models::{
    AbilityField, AbilityRecord, CreatePokemonRequest, ListParams, ListResponse, PokemonRecord,
    TypeField, UpdatePokemonRequest,
};
pub use retry::RetryConfig;
