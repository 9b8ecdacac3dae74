use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Pokémon exactly as the backend sends it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PokemonRecord {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub types: TypeField,
    pub height: f64,
    pub weight: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub abilities: Vec<AbilityField>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Older backend revisions send a single `type`, newer ones an array
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TypeField {
    One(String),
    Many(Vec<String>),
}

impl TypeField {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TypeField::One(t) => vec![t],
            TypeField::Many(ts) => ts,
        }
    }

    /// Single tags go out as a plain string so single-type backends accept them
    pub fn from_tags(mut tags: Vec<String>) -> Self {
        if tags.len() == 1 {
            TypeField::One(tags.remove(0))
        } else {
            TypeField::Many(tags)
        }
    }
}

/// Abilities are either linked records or bare names depending on the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AbilityField {
    Linked { ability: AbilityRecord },
    Name(String),
}

impl AbilityField {
    pub fn id(&self) -> Option<u32> {
        match self {
            AbilityField::Linked { ability } => Some(ability.id),
            AbilityField::Name(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AbilityField::Linked { ability } => &ability.name,
            AbilityField::Name(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbilityRecord {
    pub id: u32,
    pub name: String,
}

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(alias = "pokemon", alias = "data")]
    pub items: Vec<PokemonRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    /// Some deployments leave this out; the core recomputes it from total/limit
    #[serde(default)]
    pub total_pages: u32,
}

/// Query parameters for `GET /pokemons`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub pokemon_type: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub ability_ids: Vec<u32>,
}

impl ListParams {
    /// Query pairs in the order the backend documents them; empty values are left out
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];

        let optional = [
            ("search", &self.search),
            ("type", &self.pokemon_type),
            ("sortBy", &self.sort_by),
            ("order", &self.order),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((name.to_string(), value.to_string()));
            }
        }

        for id in &self.ability_ids {
            pairs.push(("abilityIds[]".to_string(), id.to_string()));
        }

        pairs
    }
}

/// Body for `POST /pokemons`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePokemonRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub types: TypeField,
    pub height: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub abilities: Vec<String>,
}

/// Body for `PATCH /pokemons/{id}` - only the fields that changed
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePokemonRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<TypeField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abilities: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_single_type_and_linked_abilities() {
        let body = json!({
            "id": 25,
            "name": "Pikachu",
            "type": "ELECTRIC",
            "height": 0.4,
            "weight": 6.0,
            "imageUrl": "https://img.example/25.png",
            "abilities": [{ "ability": { "id": 9, "name": "Static" } }],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        });

        let record: PokemonRecord = serde_json::from_value(body).unwrap();
        assert_eq!(record.types, TypeField::One("ELECTRIC".into()));
        assert_eq!(record.abilities[0].id(), Some(9));
        assert_eq!(record.abilities[0].name(), "Static");
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_decodes_type_array_and_plain_abilities() {
        let body = json!({
            "id": 6,
            "name": "Charizard",
            "type": ["FIRE", "FLYING"],
            "height": 1.7,
            "weight": 90.5,
            "abilities": ["Blaze", "Solar Power"]
        });

        let record: PokemonRecord = serde_json::from_value(body).unwrap();
        assert_eq!(record.types.into_vec(), vec!["FIRE", "FLYING"]);
        assert_eq!(record.abilities[1].id(), None);
        assert_eq!(record.abilities[1].name(), "Solar Power");
        assert_eq!(record.image_url, None);
    }

    #[test]
    fn test_list_response_accepts_legacy_field_name() {
        let body = json!({ "pokemon": [], "total": 0, "page": 1, "limit": 12 });
        let list: ListResponse = serde_json::from_value(body).unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.total_pages, 0);
    }

    #[test]
    fn test_list_params_skip_empty_values() {
        let params = ListParams {
            page: 2,
            limit: 20,
            search: Some(String::new()),
            pokemon_type: Some("FIRE".into()),
            ability_ids: vec![3, 4],
            ..Default::default()
        };

        let pairs = params.to_pairs();
        let names: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["page", "limit", "type", "abilityIds[]", "abilityIds[]"]);
    }

    #[test]
    fn test_update_request_only_serializes_changes() {
        let patch = UpdatePokemonRequest {
            weight: Some(7.5),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "weight": 7.5 }));
    }
}
