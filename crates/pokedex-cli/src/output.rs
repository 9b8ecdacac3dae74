// Plain-text rendering for the non-interactive commands
use pokedex_core::{Ability, DataSource, ListOutcome, Pokemon};

pub fn print_list(outcome: &ListOutcome) {
    warn_if_fallback(outcome.source, outcome.error.as_ref().map(|e| e.to_string()));

    let page = &outcome.page;
    if page.items.is_empty() {
        println!("No Pokémon found");
        return;
    }

    println!("{:<6} {:<16} {:<20} {:>8} {:>10}", "#", "NAME", "TYPES", "HEIGHT", "WEIGHT");
    for pokemon in &page.items {
        println!(
            "{:<6} {:<16} {:<20} {:>7}m {:>8}kg",
            pokemon.display_number(),
            truncate(&pokemon.name, 16),
            truncate(&pokemon.type_labels(), 20),
            pokemon.height,
            pokemon.weight,
        );
    }
    println!();
    println!(
        "Page {} of {}. {}",
        page.page,
        page.total_pages.max(1),
        pokedex_core::pagination::summary(page.page, page.page_size, page.total)
    );
}

pub fn print_pokemon(pokemon: &Pokemon, source: DataSource) {
    warn_if_fallback(source, None);

    println!("{} {}", pokemon.display_number(), pokemon.name);
    println!("  Types:     {}", pokemon.type_labels());
    println!("  Height:    {} m", pokemon.height);
    println!("  Weight:    {} kg", pokemon.weight);
    if !pokemon.abilities.is_empty() {
        println!("  Abilities: {}", pokemon.ability_names().join(", "));
    }
    if let Some(url) = &pokemon.image_url {
        println!("  Image:     {}", url);
    }
    if let Some(created) = pokemon.created_at {
        println!("  Created:   {}", created.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(updated) = pokemon.updated_at.filter(|_| pokemon.was_updated()) {
        println!("  Updated:   {}", updated.format("%Y-%m-%d %H:%M UTC"));
    }
}

pub fn print_abilities(abilities: &[Ability]) {
    if abilities.is_empty() {
        println!("No abilities found");
        return;
    }
    for ability in abilities {
        println!("{:>4}  {}", ability.id, ability.name);
    }
}

fn warn_if_fallback(source: DataSource, reason: Option<String>) {
    if !source.is_fallback() {
        return;
    }
    match reason {
        Some(reason) => eprintln!("warning: backend unavailable ({}), showing {}", reason, source.label()),
        None => eprintln!("warning: showing {}", source.label()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("Farfetch'd", 16), "Farfetch'd");
        assert_eq!(truncate("Pokémon Trainer Red", 8), "Pokémon…");
    }
}
