// Built-in sample data - last resort when neither backend nor snapshots answer
use crate::filter::FilterState;
use crate::models::{Ability, AbilityRef, ListPage, Pokemon, PokemonType};
use crate::pagination;

const SAMPLE_IMAGE: &str = "https://images.pexels.com/photos/1851164/pexels-photo-1851164.jpeg";

struct Sample {
    id: u32,
    name: &'static str,
    types: &'static [PokemonType],
    height: f64,
    weight: f64,
    abilities: &'static [(u32, &'static str)],
}

use PokemonType::*;

const SAMPLES: &[Sample] = &[
    Sample { id: 1, name: "Pikachu", types: &[Electric], height: 0.4, weight: 6.0, abilities: &[(1, "Static"), (2, "Lightning Rod")] },
    Sample { id: 2, name: "Charizard", types: &[Fire, Flying], height: 1.7, weight: 90.5, abilities: &[(3, "Blaze"), (4, "Solar Power")] },
    Sample { id: 3, name: "Blastoise", types: &[Water], height: 1.6, weight: 85.5, abilities: &[(5, "Torrent"), (6, "Rain Dish")] },
    Sample { id: 4, name: "Venusaur", types: &[Grass, Poison], height: 2.0, weight: 100.0, abilities: &[(7, "Overgrow"), (8, "Chlorophyll")] },
    Sample { id: 5, name: "Gengar", types: &[Ghost, Poison], height: 1.5, weight: 40.5, abilities: &[(9, "Cursed Body")] },
    Sample { id: 6, name: "Machamp", types: &[Fighting], height: 1.6, weight: 130.0, abilities: &[(10, "Guts"), (11, "No Guard")] },
    Sample { id: 7, name: "Lapras", types: &[Water, Ice], height: 2.5, weight: 220.0, abilities: &[(5, "Torrent"), (12, "Shell Armor")] },
    Sample { id: 8, name: "Snorlax", types: &[Normal], height: 2.1, weight: 460.0, abilities: &[(13, "Immunity"), (14, "Thick Fat")] },
    Sample { id: 9, name: "Dragonite", types: &[Dragon, Flying], height: 2.2, weight: 210.0, abilities: &[(15, "Inner Focus"), (16, "Multiscale")] },
    Sample { id: 10, name: "Mewtwo", types: &[Psychic], height: 2.0, weight: 122.0, abilities: &[(17, "Pressure")] },
    Sample { id: 11, name: "Onix", types: &[Rock, Ground], height: 8.8, weight: 210.0, abilities: &[(18, "Rock Head"), (19, "Sturdy")] },
    Sample { id: 12, name: "Scizor", types: &[Bug, Steel], height: 1.8, weight: 118.0, abilities: &[(20, "Technician"), (21, "Swarm")] },
    Sample { id: 13, name: "Umbreon", types: &[Dark], height: 1.0, weight: 27.0, abilities: &[(22, "Synchronize")] },
    Sample { id: 14, name: "Sylveon", types: &[Fairy], height: 1.0, weight: 23.5, abilities: &[(23, "Cute Charm"), (24, "Pixilate")] },
    Sample { id: 15, name: "Farfetch'd", types: &[Normal, Flying], height: 0.8, weight: 15.0, abilities: &[(25, "Keen Eye"), (15, "Inner Focus")] },
    Sample { id: 16, name: "Ho-Oh", types: &[Fire, Flying], height: 3.8, weight: 199.0, abilities: &[(17, "Pressure"), (26, "Regenerator")] },
];

/// Every sample Pokémon, ordered by id
pub fn dataset() -> Vec<Pokemon> {
    SAMPLES
        .iter()
        .map(|s| Pokemon {
            id: s.id,
            name: s.name.to_string(),
            types: s.types.to_vec(),
            height: s.height,
            weight: s.weight,
            image_url: Some(SAMPLE_IMAGE.to_string()),
            abilities: s
                .abilities
                .iter()
                .map(|(id, name)| AbilityRef {
                    id: Some(*id),
                    name: name.to_string(),
                })
                .collect(),
            created_at: None,
            updated_at: None,
        })
        .collect()
}

pub fn find(id: u32) -> Option<Pokemon> {
    dataset().into_iter().find(|p| p.id == id)
}

/// Distinct abilities in the sample set; an empty `ids` means all of them
pub fn abilities(ids: &[u32]) -> Vec<Ability> {
    let mut all: Vec<Ability> = SAMPLES
        .iter()
        .flat_map(|s| s.abilities.iter())
        .map(|(id, name)| Ability {
            id: *id,
            name: name.to_string(),
        })
        .collect();
    all.sort_by_key(|a| a.id);
    all.dedup_by_key(|a| a.id);
    all.retain(|a| ids.is_empty() || ids.contains(&a.id));
    all
}

/// Filter, sort and paginate `items` the way the backend would
pub fn paginate(items: &[Pokemon], filter: &FilterState) -> ListPage {
    let mut matching: Vec<Pokemon> = items.iter().filter(|p| filter.matches(p)).cloned().collect();
    filter.sort(&mut matching);

    let page_size = filter.page_size.max(1);
    let total = matching.len() as u64;
    let total_pages = pagination::total_pages(total, page_size).unwrap_or(0);
    let page = pagination::clamp_page(filter.page, total_pages.max(1));

    let start = (page - 1) as usize * page_size as usize;
    let items = matching.into_iter().skip(start).take(page_size as usize).collect();

    ListPage {
        items,
        total,
        page,
        page_size,
        total_pages,
    }
}

/// The sample set run through `filter`
pub fn list(filter: &FilterState) -> ListPage {
    paginate(&dataset(), filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortKey, SortOrder};

    #[test]
    fn test_dataset_is_valid_and_unique() {
        let data = dataset();
        let mut ids: Vec<u32> = data.iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), data.len());
        assert!(data.iter().all(|p| !p.types.is_empty()));
    }

    #[test]
    fn test_list_paginates_and_clamps() {
        let filter = FilterState {
            page: 2,
            page_size: 5,
            ..Default::default()
        };
        let page = list(&filter);
        assert_eq!(page.total, SAMPLES.len() as u64);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].id, 6);

        let past_end = FilterState {
            page: 99,
            page_size: 5,
            ..Default::default()
        };
        let page = list(&past_end);
        assert_eq!(page.page, page.total_pages);
        assert!(!page.items.is_empty());
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let filter = FilterState {
            pokemon_type: Some(PokemonType::Flying),
            sort_by: Some(SortKey::Name),
            order: SortOrder::Desc,
            ..Default::default()
        };
        let page = list(&filter);
        let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ho-Oh", "Farfetch'd", "Dragonite", "Charizard"]);
    }

    #[test]
    fn test_empty_result() {
        let filter = FilterState {
            search: "missingno".into(),
            ..Default::default()
        };
        let page = list(&filter);
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_abilities_are_deduplicated() {
        let all = abilities(&[]);
        assert_eq!(all.iter().filter(|a| a.name == "Pressure").count(), 1);
        assert_eq!(abilities(&[3, 999]), vec![Ability { id: 3, name: "Blaze".into() }]);
        assert_eq!(find(1).map(|p| p.name), Some("Pikachu".to_string()));
    }
}
