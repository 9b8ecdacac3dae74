use crate::models::{Ability, ListPage, NewPokemon, Pokemon, PokemonPatch};
use crate::{filter::FilterState, Result};

/// Anything that can serve the Pokédex catalog
///
/// The HTTP backend is the real one. Having a trait here keeps the service
/// testable without a server and lets offline mode plug in the demo data.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PokemonBackend: Send + Sync {
    async fn list(&self, filter: &FilterState) -> Result<ListPage>;
    async fn get(&self, id: u32) -> Result<Pokemon>;
    async fn create(&self, pokemon: &NewPokemon) -> Result<Pokemon>;
    async fn update(&self, id: u32, patch: &PokemonPatch) -> Result<Pokemon>;
    async fn delete(&self, id: u32) -> Result<()>;
    async fn abilities(&self, ids: &[u32]) -> Result<Vec<Ability>>;
    async fn ability(&self, id: u32) -> Result<Ability>;
}
