use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Error;

/// The 18 elemental types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Grass,
    Electric,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dark,
    Dragon,
    Steel,
    Fairy,
}

impl PokemonType {
    pub const ALL: [PokemonType; 18] = [
        PokemonType::Normal,
        PokemonType::Fire,
        PokemonType::Water,
        PokemonType::Grass,
        PokemonType::Electric,
        PokemonType::Ice,
        PokemonType::Fighting,
        PokemonType::Poison,
        PokemonType::Ground,
        PokemonType::Flying,
        PokemonType::Psychic,
        PokemonType::Bug,
        PokemonType::Rock,
        PokemonType::Ghost,
        PokemonType::Dark,
        PokemonType::Dragon,
        PokemonType::Steel,
        PokemonType::Fairy,
    ];

    /// Wire form, e.g. `ELECTRIC`
    pub fn as_str(&self) -> &'static str {
        match self {
            PokemonType::Normal => "NORMAL",
            PokemonType::Fire => "FIRE",
            PokemonType::Water => "WATER",
            PokemonType::Grass => "GRASS",
            PokemonType::Electric => "ELECTRIC",
            PokemonType::Ice => "ICE",
            PokemonType::Fighting => "FIGHTING",
            PokemonType::Poison => "POISON",
            PokemonType::Ground => "GROUND",
            PokemonType::Flying => "FLYING",
            PokemonType::Psychic => "PSYCHIC",
            PokemonType::Bug => "BUG",
            PokemonType::Rock => "ROCK",
            PokemonType::Ghost => "GHOST",
            PokemonType::Dark => "DARK",
            PokemonType::Dragon => "DRAGON",
            PokemonType::Steel => "STEEL",
            PokemonType::Fairy => "FAIRY",
        }
    }

    /// Human form, e.g. `Electric`
    pub fn label(&self) -> &'static str {
        match self {
            PokemonType::Normal => "Normal",
            PokemonType::Fire => "Fire",
            PokemonType::Water => "Water",
            PokemonType::Grass => "Grass",
            PokemonType::Electric => "Electric",
            PokemonType::Ice => "Ice",
            PokemonType::Fighting => "Fighting",
            PokemonType::Poison => "Poison",
            PokemonType::Ground => "Ground",
            PokemonType::Flying => "Flying",
            PokemonType::Psychic => "Psychic",
            PokemonType::Bug => "Bug",
            PokemonType::Rock => "Rock",
            PokemonType::Ghost => "Ghost",
            PokemonType::Dark => "Dark",
            PokemonType::Dragon => "Dragon",
            PokemonType::Steel => "Steel",
            PokemonType::Fairy => "Fairy",
        }
    }
}

impl std::fmt::Display for PokemonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Case-insensitive, so both `ELECTRIC` and `Electric` parse
impl FromStr for PokemonType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PokemonType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown Pokémon type '{}'", s)))
    }
}

/// Shared ability entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: u32,
    pub name: String,
}

/// Ability as attached to a Pokémon; `id` is set when it links to a shared [`Ability`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRef {
    pub id: Option<u32>,
    pub name: String,
}

impl AbilityRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// Pokémon record - the star of the show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    pub types: Vec<PokemonType>,
    /// Metres
    pub height: f64,
    /// Kilograms
    pub weight: f64,
    pub image_url: Option<String>,
    pub abilities: Vec<AbilityRef>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pokemon {
    pub fn primary_type(&self) -> Option<PokemonType> {
        self.types.first().copied()
    }

    pub fn has_type(&self, pokemon_type: PokemonType) -> bool {
        self.types.contains(&pokemon_type)
    }

    /// `#025` style number
    pub fn display_number(&self) -> String {
        format!("#{:03}", self.id)
    }

    pub fn type_labels(&self) -> String {
        self.types
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn ability_names(&self) -> Vec<&str> {
        self.abilities.iter().map(|a| a.name.as_str()).collect()
    }

    /// True when the record was edited after it was created
    pub fn was_updated(&self) -> bool {
        match (self.created_at, self.updated_at) {
            (Some(created), Some(updated)) => updated != created,
            _ => false,
        }
    }
}

/// One page of a filtered listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub items: Vec<Pokemon>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl ListPage {
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            page_size,
            total_pages: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The page the backend reported may be past the end after deletions
    pub fn is_past_end(&self) -> bool {
        self.total_pages > 0 && self.page > self.total_pages
    }
}

/// Payload for creating a record, produced by a validated form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPokemon {
    pub name: String,
    pub types: Vec<PokemonType>,
    pub height: f64,
    pub weight: f64,
    pub image_url: Option<String>,
    pub abilities: Vec<String>,
}

/// Partial update; `None` means "leave as is"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokemonPatch {
    pub name: Option<String>,
    pub types: Option<Vec<PokemonType>>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub image_url: Option<String>,
    pub abilities: Option<Vec<String>>,
}

impl PokemonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.types.is_none()
            && self.height.is_none()
            && self.weight.is_none()
            && self.image_url.is_none()
            && self.abilities.is_none()
    }

    /// Apply the patch locally, used to keep demo/offline data consistent
    pub fn apply_to(&self, pokemon: &mut Pokemon) {
        if let Some(name) = &self.name {
            pokemon.name = name.clone();
        }
        if let Some(types) = &self.types {
            pokemon.types = types.clone();
        }
        if let Some(height) = self.height {
            pokemon.height = height;
        }
        if let Some(weight) = self.weight {
            pokemon.weight = weight;
        }
        if let Some(url) = &self.image_url {
            pokemon.image_url = if url.is_empty() { None } else { Some(url.clone()) };
        }
        if let Some(abilities) = &self.abilities {
            pokemon.abilities = abilities.iter().map(AbilityRef::named).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parsing_ignores_case() {
        assert_eq!("electric".parse::<PokemonType>().unwrap(), PokemonType::Electric);
        assert_eq!("FAIRY".parse::<PokemonType>().unwrap(), PokemonType::Fairy);
        assert!("Sound".parse::<PokemonType>().is_err());
    }

    #[test]
    fn test_type_serde_uses_wire_names() {
        let json = serde_json::to_string(&PokemonType::Psychic).unwrap();
        assert_eq!(json, "\"PSYCHIC\"");
        assert_eq!(PokemonType::ALL.len(), 18);
    }

    #[test]
    fn test_patch_apply() {
        let mut pokemon = Pokemon {
            id: 25,
            name: "Pikachu".into(),
            types: vec![PokemonType::Electric],
            height: 0.4,
            weight: 6.0,
            image_url: Some("https://img.example/25.png".into()),
            abilities: vec![AbilityRef::named("Static")],
            created_at: None,
            updated_at: None,
        };

        let patch = PokemonPatch {
            weight: Some(6.5),
            image_url: Some(String::new()),
            abilities: Some(vec!["Lightning Rod".into()]),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut pokemon);

        assert_eq!(pokemon.weight, 6.5);
        assert_eq!(pokemon.image_url, None);
        assert_eq!(pokemon.ability_names(), vec!["Lightning Rod"]);
        assert_eq!(pokemon.display_number(), "#025");
    }
}
