//! Create/edit form state and validation.
//!
//! Errors are collected per field into [`FieldErrors`] instead of being
//! returned as [`crate::Error`]: a bad height is something to show next to
//! the height input, not a failure of the surrounding flow.

use std::collections::{BTreeMap, HashSet};

use crate::models::{NewPokemon, Pokemon, PokemonPatch, PokemonType};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_HEIGHT_M: f64 = 100.0;
pub const MAX_WEIGHT_KG: f64 = 10_000.0;
pub const MAX_ABILITIES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Types,
    Height,
    Weight,
    ImageUrl,
    Abilities,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Name,
        Field::Types,
        Field::Height,
        Field::Weight,
        Field::ImageUrl,
        Field::Abilities,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Types => "Type",
            Field::Height => "Height (m)",
            Field::Weight => "Weight (kg)",
            Field::ImageUrl => "Image URL",
            Field::Abilities => "Abilities",
        }
    }
}

/// Human-readable problems keyed by field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn set(&mut self, field: Field, message: Option<String>) {
        match message {
            Some(message) => {
                self.0.insert(field, message);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field.label(), message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Raw form input, numbers still as typed
#[derive(Debug, Clone, PartialEq)]
pub struct FormValues {
    pub name: String,
    pub types: Vec<PokemonType>,
    pub height: String,
    pub weight: String,
    pub image_url: String,
    pub abilities: Vec<String>,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            name: String::new(),
            types: vec![PokemonType::Normal],
            height: "0".to_string(),
            weight: "0".to_string(),
            image_url: String::new(),
            abilities: Vec::new(),
        }
    }
}

impl FormValues {
    pub fn from_pokemon(pokemon: &Pokemon) -> Self {
        Self {
            name: pokemon.name.clone(),
            types: pokemon.types.clone(),
            height: pokemon.height.to_string(),
            weight: pokemon.weight.to_string(),
            image_url: pokemon.image_url.clone().unwrap_or_default(),
            abilities: pokemon.abilities.iter().map(|a| a.name.clone()).collect(),
        }
    }
}

/// Field rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    /// Letters, whitespace, hyphens and apostrophes only
    pub strict_names: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self::strict()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_whitespace() || c == '-' || c == '\''
}

impl Validator {
    pub fn strict() -> Self {
        Self { strict_names: true }
    }

    pub fn lenient() -> Self {
        Self { strict_names: false }
    }

    /// Problem with one field, if any
    pub fn check_field(&self, values: &FormValues, field: Field) -> Option<String> {
        match field {
            Field::Name => self.check_name(&values.name),
            Field::Types => check_types(&values.types),
            Field::Height => parse_measure(&values.height, "Height", MAX_HEIGHT_M, "less than 100 meters").err(),
            Field::Weight => parse_measure(&values.weight, "Weight", MAX_WEIGHT_KG, "less than 10,000 kg").err(),
            Field::ImageUrl => check_image_url(&values.image_url),
            Field::Abilities => check_abilities(&values.abilities),
        }
    }

    pub fn check(&self, values: &FormValues) -> FieldErrors {
        let mut errors = FieldErrors::default();
        for field in Field::ALL {
            errors.set(field, self.check_field(values, field));
        }
        errors
    }

    /// Validate and convert into a create payload
    pub fn parse(&self, values: &FormValues) -> Result<NewPokemon, FieldErrors> {
        let errors = self.check(values);
        if !errors.is_empty() {
            return Err(errors);
        }

        let image_url = values.image_url.trim();
        Ok(NewPokemon {
            name: values.name.trim().to_string(),
            types: values.types.clone(),
            // Both parse: check() passed
            height: values.height.trim().parse().unwrap_or_default(),
            weight: values.weight.trim().parse().unwrap_or_default(),
            image_url: (!image_url.is_empty()).then(|| image_url.to_string()),
            abilities: values.abilities.iter().map(|a| a.trim().to_string()).collect(),
        })
    }

    fn check_name(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return Some("Name is required".to_string());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Some(format!("Name must be {} characters or less", MAX_NAME_LEN));
        }
        if self.strict_names && !name.chars().all(is_name_char) {
            return Some(
                "Name can only contain letters, spaces, hyphens, and apostrophes".to_string(),
            );
        }
        None
    }
}

fn check_types(types: &[PokemonType]) -> Option<String> {
    if types.is_empty() {
        return Some("Please select a valid type".to_string());
    }
    let unique: HashSet<_> = types.iter().collect();
    if unique.len() != types.len() {
        return Some("Each type can only be selected once".to_string());
    }
    None
}

fn parse_measure(raw: &str, what: &str, max: f64, max_text: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{} must be a number", what))?;

    if !value.is_finite() {
        return Err(format!("{} must be a number", what));
    }
    if value < 0.0 {
        return Err(format!("{} must be positive", what));
    }
    if value > max {
        return Err(format!("{} must be {}", what, max_text));
    }
    Ok(value)
}

fn check_image_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match reqwest::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => None,
        _ => Some("Must be a valid URL".to_string()),
    }
}

fn check_abilities(abilities: &[String]) -> Option<String> {
    if abilities.len() > MAX_ABILITIES {
        return Some(format!("Maximum {} abilities allowed", MAX_ABILITIES));
    }

    let mut seen = HashSet::new();
    for ability in abilities {
        let trimmed = ability.trim();
        if trimmed.is_empty() {
            return Some("Ability name cannot be empty".to_string());
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Some(format!("Duplicate ability: {}", trimmed));
        }
    }
    None
}

/// Live form: values, the values it started from, and current errors
#[derive(Debug, Clone)]
pub struct PokemonForm {
    values: FormValues,
    initial: FormValues,
    errors: FieldErrors,
    validator: Validator,
}

impl PokemonForm {
    /// Blank create form
    pub fn new(validator: Validator) -> Self {
        Self::from_values(FormValues::default(), validator)
    }

    /// Edit form pre-filled from an existing record
    pub fn edit(pokemon: &Pokemon, validator: Validator) -> Self {
        Self::from_values(FormValues::from_pokemon(pokemon), validator)
    }

    fn from_values(values: FormValues, validator: Validator) -> Self {
        Self {
            initial: values.clone(),
            values,
            errors: FieldErrors::default(),
            validator,
        }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn is_valid(&self) -> bool {
        self.validator.check(&self.values).is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors = FieldErrors::default();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.values.name = name.into();
        self.revalidate(Field::Name);
    }

    pub fn set_height(&mut self, height: impl Into<String>) {
        self.values.height = height.into();
        self.revalidate(Field::Height);
    }

    pub fn set_weight(&mut self, weight: impl Into<String>) {
        self.values.weight = weight.into();
        self.revalidate(Field::Weight);
    }

    pub fn set_image_url(&mut self, url: impl Into<String>) {
        self.values.image_url = url.into();
        self.revalidate(Field::ImageUrl);
    }

    pub fn set_types(&mut self, types: Vec<PokemonType>) {
        self.values.types = types;
        self.revalidate(Field::Types);
    }

    /// Add or remove a type from the selection
    pub fn toggle_type(&mut self, pokemon_type: PokemonType) {
        if let Some(pos) = self.values.types.iter().position(|t| *t == pokemon_type) {
            self.values.types.remove(pos);
        } else {
            self.values.types.push(pokemon_type);
        }
        self.revalidate(Field::Types);
    }

    /// Returns false when the ability was blank, a duplicate, or the list is full
    pub fn add_ability(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.values.abilities.len() >= MAX_ABILITIES {
            return false;
        }
        if self
            .values
            .abilities
            .iter()
            .any(|a| a.trim().eq_ignore_ascii_case(name))
        {
            return false;
        }
        self.values.abilities.push(name.to_string());
        self.revalidate(Field::Abilities);
        true
    }

    pub fn remove_ability(&mut self, name: &str) -> bool {
        let before = self.values.abilities.len();
        self.values.abilities.retain(|a| a != name);
        let removed = self.values.abilities.len() != before;
        if removed {
            self.revalidate(Field::Abilities);
        }
        removed
    }

    /// Validate everything; blocked while any field has an error
    pub fn submit(&mut self) -> Result<NewPokemon, FieldErrors> {
        match self.validator.parse(&self.values) {
            Ok(pokemon) => {
                self.errors = FieldErrors::default();
                Ok(pokemon)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// Like [`submit`](Self::submit) but only the fields that differ from the starting values
    pub fn submit_changes(&mut self) -> Result<PokemonPatch, FieldErrors> {
        let current = self.submit()?;
        let baseline = match Validator::lenient().parse(&self.initial) {
            Ok(baseline) => baseline,
            // Starting values were already broken - send everything
            Err(_) => {
                return Ok(PokemonPatch {
                    name: Some(current.name),
                    types: Some(current.types),
                    height: Some(current.height),
                    weight: Some(current.weight),
                    image_url: Some(current.image_url.unwrap_or_default()),
                    abilities: Some(current.abilities),
                })
            }
        };

        Ok(PokemonPatch {
            name: (current.name != baseline.name).then_some(current.name),
            types: (current.types != baseline.types).then_some(current.types),
            height: (current.height != baseline.height).then_some(current.height),
            weight: (current.weight != baseline.weight).then_some(current.weight),
            image_url: (current.image_url != baseline.image_url)
                .then(|| current.image_url.unwrap_or_default()),
            abilities: (current.abilities != baseline.abilities).then_some(current.abilities),
        })
    }

    fn revalidate(&mut self, field: Field) {
        let message = self.validator.check_field(&self.values, field);
        self.errors.set(field, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AbilityRef;

    fn pikachu_values() -> FormValues {
        FormValues {
            name: "Pikachu".into(),
            types: vec![PokemonType::Electric],
            height: "0.4".into(),
            weight: "6.0".into(),
            image_url: String::new(),
            abilities: vec!["Static".into()],
        }
    }

    #[test]
    fn test_valid_pikachu_passes() {
        let parsed = Validator::strict().parse(&pikachu_values()).unwrap();
        assert_eq!(parsed.name, "Pikachu");
        assert_eq!(parsed.types, vec![PokemonType::Electric]);
        assert_eq!(parsed.height, 0.4);
        assert_eq!(parsed.weight, 6.0);
        assert_eq!(parsed.image_url, None);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let values = FormValues {
            name: "".into(),
            ..pikachu_values()
        };
        let errors = Validator::strict().parse(&values).unwrap_err();
        assert_eq!(errors.get(Field::Name), Some("Name is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_strict_names() {
        let strict = Validator::strict();
        let lenient = Validator::lenient();
        let mut values = pikachu_values();

        values.name = "Farfetch'd".into();
        assert!(strict.check_field(&values, Field::Name).is_none());

        values.name = "Porygon2".into();
        assert!(strict.check_field(&values, Field::Name).is_some());
        assert!(lenient.check_field(&values, Field::Name).is_none());

        values.name = "a".repeat(51);
        assert!(lenient.check_field(&values, Field::Name).is_some());
    }

    #[test]
    fn test_measurements() {
        let v = Validator::strict();
        let mut values = pikachu_values();

        values.height = "tall".into();
        assert_eq!(v.check_field(&values, Field::Height).as_deref(), Some("Height must be a number"));
        values.height = "-1".into();
        assert_eq!(v.check_field(&values, Field::Height).as_deref(), Some("Height must be positive"));
        values.height = "100.5".into();
        assert!(v.check_field(&values, Field::Height).is_some());
        values.height = "NaN".into();
        assert!(v.check_field(&values, Field::Height).is_some());

        values.weight = "10000".into();
        assert!(v.check_field(&values, Field::Weight).is_none());
        values.weight = "10000.1".into();
        assert!(v.check_field(&values, Field::Weight).is_some());
    }

    #[test]
    fn test_image_url_and_types() {
        let v = Validator::strict();
        let mut values = pikachu_values();

        values.image_url = "not a url".into();
        assert!(v.check_field(&values, Field::ImageUrl).is_some());
        values.image_url = "ftp://img.example/a.png".into();
        assert!(v.check_field(&values, Field::ImageUrl).is_some());
        values.image_url = "https://img.example/a.png".into();
        assert!(v.check_field(&values, Field::ImageUrl).is_none());

        values.types = vec![];
        assert!(v.check_field(&values, Field::Types).is_some());
        values.types = vec![PokemonType::Fire, PokemonType::Fire];
        assert!(v.check_field(&values, Field::Types).is_some());
    }

    #[test]
    fn test_ability_list_rules() {
        let v = Validator::strict();
        let mut values = pikachu_values();

        values.abilities = vec!["Static".into(), "static".into()];
        assert!(v.check_field(&values, Field::Abilities).is_some());
        values.abilities = vec!["  ".into()];
        assert!(v.check_field(&values, Field::Abilities).is_some());
        values.abilities = (0..7).map(|i| format!("Ability {}", i)).collect();
        assert_eq!(
            v.check_field(&values, Field::Abilities).as_deref(),
            Some("Maximum 6 abilities allowed")
        );
    }

    #[test]
    fn test_errors_clear_as_soon_as_field_is_valid() {
        let mut form = PokemonForm::new(Validator::strict());
        assert!(form.submit().is_err());
        assert!(form.error(Field::Name).is_some());

        form.set_name("Pika");
        assert!(form.error(Field::Name).is_none());

        form.set_height("abc");
        assert!(form.error(Field::Height).is_some());
        form.set_height("0.4");
        assert!(form.error(Field::Height).is_none());

        assert!(form.submit().is_ok());
    }

    #[test]
    fn test_add_and_remove_abilities() {
        let mut form = PokemonForm::new(Validator::strict());
        assert!(form.add_ability(" Static "));
        assert!(!form.add_ability("static"));
        assert!(!form.add_ability("   "));
        for i in 0..5 {
            assert!(form.add_ability(&format!("Extra {}", i)));
        }
        assert!(!form.add_ability("Seventh"));
        assert_eq!(form.values().abilities.len(), MAX_ABILITIES);

        assert!(form.remove_ability("Static"));
        assert!(!form.remove_ability("Static"));
    }

    #[test]
    fn test_edit_form_produces_minimal_patch() {
        let pokemon = Pokemon {
            id: 25,
            name: "Pikachu".into(),
            types: vec![PokemonType::Electric],
            height: 0.4,
            weight: 6.0,
            image_url: None,
            abilities: vec![AbilityRef::named("Static")],
            created_at: None,
            updated_at: None,
        };

        let mut form = PokemonForm::edit(&pokemon, Validator::strict());
        assert!(!form.is_dirty());
        assert!(form.submit_changes().unwrap().is_empty());

        form.set_weight("6.5");
        form.toggle_type(PokemonType::Fairy);
        assert!(form.is_dirty());

        let patch = form.submit_changes().unwrap();
        assert_eq!(patch.weight, Some(6.5));
        assert_eq!(patch.types, Some(vec![PokemonType::Electric, PokemonType::Fairy]));
        assert_eq!(patch.name, None);
        assert_eq!(patch.height, None);

        form.reset();
        assert!(!form.is_dirty());
    }
}
