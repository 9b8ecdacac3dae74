// In-memory backend for offline mode, seeded with the demo set
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    backend::PokemonBackend,
    demo,
    filter::FilterState,
    models::{Ability, AbilityRef, ListPage, NewPokemon, Pokemon, PokemonPatch},
    Error, Result,
};

/// Keeps everything in a Vec; mutations last as long as the process
pub struct MemoryBackend {
    records: RwLock<Vec<Pokemon>>,
}

impl MemoryBackend {
    pub fn new(records: Vec<Pokemon>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn with_demo_data() -> Self {
        Self::new(demo::dataset())
    }

    fn not_found(id: u32) -> Error {
        Error::NotFound(format!("pokemon {}", id))
    }
}

#[async_trait]
impl PokemonBackend for MemoryBackend {
    async fn list(&self, filter: &FilterState) -> Result<ListPage> {
        let records = self.records.read().await;
        Ok(demo::paginate(&records, filter))
    }

    async fn get(&self, id: u32) -> Result<Pokemon> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, pokemon: &NewPokemon) -> Result<Pokemon> {
        let mut records = self.records.write().await;
        if records.iter().any(|p| p.name.eq_ignore_ascii_case(&pokemon.name)) {
            return Err(Error::Api {
                status: 409,
                message: format!("Pokemon with name {} already exists", pokemon.name),
            });
        }

        let now = Utc::now();
        let created = Pokemon {
            id: records.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            name: pokemon.name.clone(),
            types: pokemon.types.clone(),
            height: pokemon.height,
            weight: pokemon.weight,
            image_url: pokemon.image_url.clone(),
            abilities: pokemon.abilities.iter().map(AbilityRef::named).collect(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        records.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: u32, patch: &PokemonPatch) -> Result<Pokemon> {
        let mut records = self.records.write().await;
        let pokemon = records
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        patch.apply_to(pokemon);
        pokemon.updated_at = Some(Utc::now());
        Ok(pokemon.clone())
    }

    async fn delete(&self, id: u32) -> Result<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|p| p.id != id);
        if records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn abilities(&self, ids: &[u32]) -> Result<Vec<Ability>> {
        Ok(demo::abilities(ids))
    }

    async fn ability(&self, id: u32) -> Result<Ability> {
        demo::abilities(&[id])
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("ability {}", id)))
    }
}
