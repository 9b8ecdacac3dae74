// HTTP backend - bridges the REST client with the PokemonBackend trait
use async_trait::async_trait;
use pokedex_api::{
    AbilityField, AbilityRecord, CreatePokemonRequest, ListResponse, PokedexClient, PokemonRecord,
    TypeField, UpdatePokemonRequest,
};
use tracing::warn;

use crate::{
    backend::PokemonBackend,
    filter::FilterState,
    models::{Ability, AbilityRef, ListPage, NewPokemon, Pokemon, PokemonPatch, PokemonType},
    pagination, Result,
};

/// Wrapper around PokedexClient that speaks domain types
pub struct HttpBackend {
    client: PokedexClient,
}

impl HttpBackend {
    pub fn new(client: PokedexClient) -> Self {
        Self { client }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

#[async_trait]
impl PokemonBackend for HttpBackend {
    async fn list(&self, filter: &FilterState) -> Result<ListPage> {
        let response = self.client.list_pokemons(&filter.to_params()).await?;
        Ok(list_to_page(response, filter.page_size))
    }

    async fn get(&self, id: u32) -> Result<Pokemon> {
        let record = self.client.get_pokemon(id).await?;
        Ok(record_to_pokemon(record))
    }

    async fn create(&self, pokemon: &NewPokemon) -> Result<Pokemon> {
        let record = self.client.create_pokemon(&create_request(pokemon)).await?;
        Ok(record_to_pokemon(record))
    }

    async fn update(&self, id: u32, patch: &PokemonPatch) -> Result<Pokemon> {
        let record = self.client.update_pokemon(id, &update_request(patch)).await?;
        Ok(record_to_pokemon(record))
    }

    async fn delete(&self, id: u32) -> Result<()> {
        Ok(self.client.delete_pokemon(id).await?)
    }

    async fn abilities(&self, ids: &[u32]) -> Result<Vec<Ability>> {
        let records = self.client.list_abilities(ids).await?;
        Ok(records.into_iter().map(ability_from_record).collect())
    }

    async fn ability(&self, id: u32) -> Result<Ability> {
        Ok(ability_from_record(self.client.get_ability(id).await?))
    }
}

/// Convert the wire record to our model; unknown type tags are dropped with a warning
pub fn record_to_pokemon(record: PokemonRecord) -> Pokemon {
    let id = record.id;
    let types = record
        .types
        .into_vec()
        .into_iter()
        .filter_map(|tag| match tag.parse::<PokemonType>() {
            Ok(t) => Some(t),
            Err(_) => {
                warn!("Pokémon {} has unknown type '{}', skipping it", id, tag);
                None
            }
        })
        .collect();

    Pokemon {
        id,
        name: record.name,
        types,
        height: record.height,
        weight: record.weight,
        image_url: record.image_url.filter(|url| !url.is_empty()),
        abilities: record.abilities.iter().map(ability_ref).collect(),
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn ability_ref(field: &AbilityField) -> AbilityRef {
    AbilityRef {
        id: field.id(),
        name: field.name().to_string(),
    }
}

fn ability_from_record(record: AbilityRecord) -> Ability {
    Ability {
        id: record.id,
        name: record.name,
    }
}

/// Envelope to page; a missing or bogus `totalPages` is recomputed from total/limit
fn list_to_page(response: ListResponse, requested_size: u32) -> ListPage {
    let page_size = if response.limit > 0 { response.limit } else { requested_size };
    let total_pages = pagination::total_pages(response.total, page_size).unwrap_or(response.total_pages);

    ListPage {
        items: response.items.into_iter().map(record_to_pokemon).collect(),
        total: response.total,
        page: response.page.max(1),
        page_size,
        total_pages,
    }
}

fn type_tags(types: &[PokemonType]) -> TypeField {
    TypeField::from_tags(types.iter().map(|t| t.as_str().to_string()).collect())
}

fn create_request(pokemon: &NewPokemon) -> CreatePokemonRequest {
    CreatePokemonRequest {
        name: pokemon.name.clone(),
        types: type_tags(&pokemon.types),
        height: pokemon.height,
        weight: pokemon.weight,
        image_url: pokemon.image_url.clone(),
        abilities: pokemon.abilities.clone(),
    }
}

fn update_request(patch: &PokemonPatch) -> UpdatePokemonRequest {
    UpdatePokemonRequest {
        name: patch.name.clone(),
        types: patch.types.as_deref().map(type_tags),
        height: patch.height,
        weight: patch.weight,
        image_url: patch.image_url.clone(),
        abilities: patch.abilities.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_conversion_handles_both_wire_shapes() {
        let single: PokemonRecord = serde_json::from_value(json!({
            "id": 25,
            "name": "Pikachu",
            "type": "ELECTRIC",
            "height": 0.4,
            "weight": 6.0,
            "abilities": ["Static"]
        }))
        .unwrap();
        let pokemon = record_to_pokemon(single);
        assert_eq!(pokemon.types, vec![PokemonType::Electric]);
        assert_eq!(pokemon.abilities, vec![AbilityRef::named("Static")]);

        let many: PokemonRecord = serde_json::from_value(json!({
            "id": 6,
            "name": "Charizard",
            "type": ["FIRE", "FLYING", "SHADOW"],
            "height": 1.7,
            "weight": 90.5,
            "imageUrl": "",
            "abilities": [{ "ability": { "id": 66, "name": "Blaze" } }]
        }))
        .unwrap();
        let pokemon = record_to_pokemon(many);
        assert_eq!(pokemon.types, vec![PokemonType::Fire, PokemonType::Flying]);
        assert_eq!(pokemon.abilities[0].id, Some(66));
        assert_eq!(pokemon.image_url, None);
    }

    #[test]
    fn test_total_pages_recomputed() {
        let response = ListResponse {
            items: vec![],
            total: 25,
            page: 3,
            limit: 12,
            total_pages: 0,
        };
        let page = list_to_page(response, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
    }

    #[test]
    fn test_update_request_only_carries_changes() {
        let patch = PokemonPatch {
            weight: Some(7.0),
            types: Some(vec![PokemonType::Electric]),
            ..Default::default()
        };
        let body = serde_json::to_value(update_request(&patch)).unwrap();
        assert_eq!(body, json!({ "weight": 7.0, "type": "ELECTRIC" }));
    }
}
