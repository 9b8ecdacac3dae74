use std::str::FromStr;

use pokedex_api::ListParams;

use crate::models::{Pokemon, PokemonType};
use crate::{Error, Result};

/// Page size the list view starts with
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Columns the backend can sort by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Id,
    Name,
    Type,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Type => "type",
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(SortKey::Id),
            "name" => Ok(SortKey::Name),
            "type" => Ok(SortKey::Type),
            other => Err(Error::InvalidArgument(format!("unknown sort key '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::InvalidArgument(format!("unknown sort order '{}'", other))),
        }
    }
}

/// Everything that decides which page of Pokémon is on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub pokemon_type: Option<PokemonType>,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub sort_by: Option<SortKey>,
    pub order: SortOrder,
    pub ability_ids: Vec<u32>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            pokemon_type: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            order: SortOrder::Asc,
            ability_ids: Vec::new(),
        }
    }
}

/// Cache key for one listing: the canonical query that fetches it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListKey(String);

impl ListKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FilterState {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// True when any narrowing filter is set (page and size don't count)
    pub fn is_filtered(&self) -> bool {
        !self.search.trim().is_empty() || self.pokemon_type.is_some() || !self.ability_ids.is_empty()
    }

    /// Backend query for this state
    pub fn to_params(&self) -> ListParams {
        let search = self.search.trim();
        let mut ability_ids = self.ability_ids.clone();
        ability_ids.sort_unstable();
        ability_ids.dedup();

        ListParams {
            page: self.page.max(1),
            limit: self.page_size,
            search: (!search.is_empty()).then(|| search.to_string()),
            pokemon_type: self.pokemon_type.map(|t| t.as_str().to_string()),
            sort_by: self.sort_by.map(|s| s.as_str().to_string()),
            order: self.sort_by.map(|_| self.order.as_str().to_string()),
            ability_ids,
        }
    }

    /// Canonical key; equal keys always mean identical requests
    pub fn key(&self) -> ListKey {
        ListKey(encode_pairs(&self.to_params().to_pairs()))
    }

    /// Shareable URL state; defaults are left out so a fresh view has an empty query
    pub fn to_query_string(&self) -> String {
        let defaults = FilterState::default();
        let mut pairs = Vec::new();

        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push(("search".to_string(), search.to_string()));
        }
        if let Some(t) = self.pokemon_type {
            pairs.push(("type".to_string(), t.as_str().to_string()));
        }
        if self.page != defaults.page {
            pairs.push(("page".to_string(), self.page.to_string()));
        }
        if self.page_size != defaults.page_size {
            pairs.push(("limit".to_string(), self.page_size.to_string()));
        }
        if let Some(sort) = self.sort_by {
            pairs.push(("sortBy".to_string(), sort.as_str().to_string()));
            pairs.push(("order".to_string(), self.order.as_str().to_string()));
        }
        for id in &self.ability_ids {
            pairs.push(("abilityIds[]".to_string(), id.to_string()));
        }

        encode_pairs(&pairs)
    }

    /// Restore state from a URL query; anything malformed falls back to its default
    pub fn from_query_string(query: &str) -> Self {
        let mut state = FilterState::default();
        let query = query.trim_start_matches('?');

        for part in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = part.split_once('=').unwrap_or((part, ""));
            let key = decode_component(raw_key);
            let value = decode_component(raw_value);

            match key.as_str() {
                "search" => state.search = value,
                "type" => state.pokemon_type = value.parse().ok(),
                "page" => {
                    if let Ok(page) = value.parse::<u32>() {
                        state.page = page.max(1);
                    }
                }
                "limit" => {
                    if let Ok(size) = crate::pagination::validate_page_size(value.parse().unwrap_or(0)) {
                        state.page_size = size;
                    }
                }
                "sortBy" => state.sort_by = value.parse().ok(),
                "order" => state.order = value.parse().unwrap_or_default(),
                "abilityIds[]" | "abilityIds" => {
                    state
                        .ability_ids
                        .extend(value.split(',').filter_map(|id| id.trim().parse::<u32>().ok()));
                }
                _ => {}
            }
        }

        state
    }

    /// Local version of the backend filter, used for demo data
    pub fn matches(&self, pokemon: &Pokemon) -> bool {
        let search = self.search.trim().to_lowercase();
        let matches_search = search.is_empty() || pokemon.name.to_lowercase().contains(&search);
        let matches_type = self.pokemon_type.map_or(true, |t| pokemon.has_type(t));
        let matches_abilities = self.ability_ids.is_empty()
            || pokemon
                .abilities
                .iter()
                .any(|a| a.id.map_or(false, |id| self.ability_ids.contains(&id)));

        matches_search && matches_type && matches_abilities
    }

    /// Local version of the backend ordering
    pub fn sort(&self, items: &mut [Pokemon]) {
        match self.sort_by {
            Some(SortKey::Name) => items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
            Some(SortKey::Type) => items.sort_by(|a, b| a.primary_type().cmp(&b.primary_type()).then(a.id.cmp(&b.id))),
            Some(SortKey::Id) | None => items.sort_by_key(|p| p.id),
        }
        if self.sort_by.is_some() && self.order == SortOrder::Desc {
            items.reverse();
        }
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pikachu() -> Pokemon {
        Pokemon {
            id: 25,
            name: "Pikachu".into(),
            types: vec![PokemonType::Electric],
            height: 0.4,
            weight: 6.0,
            image_url: None,
            abilities: vec![crate::models::AbilityRef { id: Some(9), name: "Static".into() }],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_default_state_has_empty_query() {
        assert_eq!(FilterState::default().to_query_string(), "");
        assert_eq!(FilterState::from_query_string(""), FilterState::default());
    }

    #[test]
    fn test_query_string_roundtrip() {
        let state = FilterState {
            search: "mr mime".into(),
            pokemon_type: Some(PokemonType::Psychic),
            page: 3,
            page_size: 20,
            sort_by: Some(SortKey::Name),
            order: SortOrder::Desc,
            ability_ids: vec![4, 7],
        };

        let query = state.to_query_string();
        assert!(query.contains("search=mr%20mime"));
        assert!(query.contains("abilityIds%5B%5D=4"));
        assert_eq!(FilterState::from_query_string(&query), state);
    }

    #[test]
    fn test_malformed_query_values_fall_back() {
        let state = FilterState::from_query_string("?page=abc&limit=500&type=SOUND&order=up&search=pika+chu&x=1");
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(state.pokemon_type, None);
        assert_eq!(state.order, SortOrder::Asc);
        assert_eq!(state.search, "pika chu");
    }

    #[test]
    fn test_key_ignores_cosmetic_differences() {
        let a = FilterState {
            search: " pika ".into(),
            ability_ids: vec![2, 1, 2],
            ..Default::default()
        };
        let b = FilterState {
            search: "pika".into(),
            ability_ids: vec![1, 2],
            ..Default::default()
        };
        assert_eq!(a.key(), b.key());

        let next_page = FilterState { page: 2, ..b.clone() };
        assert_ne!(b.key(), next_page.key());
    }

    #[test]
    fn test_order_only_sent_with_sort_key() {
        let mut state = FilterState {
            order: SortOrder::Desc,
            ..Default::default()
        };
        assert_eq!(state.to_params().order, None);

        state.sort_by = Some(SortKey::Id);
        assert_eq!(state.to_params().order.as_deref(), Some("desc"));
    }

    #[test]
    fn test_local_matching() {
        let pokemon = pikachu();
        let mut state = FilterState {
            search: "PIKA".into(),
            ..Default::default()
        };
        assert!(state.matches(&pokemon));

        state.pokemon_type = Some(PokemonType::Water);
        assert!(!state.matches(&pokemon));

        state.pokemon_type = Some(PokemonType::Electric);
        state.ability_ids = vec![9];
        assert!(state.matches(&pokemon));
    }
}
