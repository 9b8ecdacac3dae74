use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use pokedex_core::{
    open_snapshot_store, Config, FilterState, FormValues, PokedexService, PokemonForm, PokemonType,
    SortKey, SortOrder, Validator,
};
use pokedex_tui::{run_tui, App};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Parser)]
#[command(name = "pokedex")]
#[command(version, about = "Browse and manage a Pokémon catalog from the terminal", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "POKEDEX_API_URL")]
    api_url: Option<String>,

    /// Key sent with create/update/delete requests
    #[arg(long, global = true, env = "POKEDEX_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Use the built-in demo data instead of the backend
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List Pokémon, one page at a time
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one Pokémon
    Show {
        id: u32,

        #[arg(long)]
        json: bool,
    },
    /// Create a Pokémon
    Create(RecordArgs),
    /// Change fields of an existing Pokémon
    Update {
        id: u32,

        #[command(flatten)]
        fields: RecordArgs,
    },
    /// Delete a Pokémon
    Delete { id: u32 },
    /// List abilities, optionally only the given ids
    Abilities {
        #[arg(value_delimiter = ',')]
        ids: Vec<u32>,

        #[arg(long)]
        json: bool,
    },
    /// Interactive browser (the default)
    Tui {
        /// Start from a saved view, e.g. "search=char&type=fire&page=2"
        #[arg(long)]
        query: Option<String>,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the offline snapshot database
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Name search (case-insensitive substring)
    #[arg(short, long)]
    search: Option<String>,

    #[arg(short = 't', long = "type")]
    pokemon_type: Option<PokemonType>,

    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Page size, 1-100
    #[arg(short, long)]
    limit: Option<u32>,

    /// id, name or type
    #[arg(long)]
    sort: Option<SortKey>,

    /// asc or desc
    #[arg(long, default_value = "asc")]
    order: SortOrder,

    /// Only Pokémon with these ability ids
    #[arg(long = "ability", value_delimiter = ',')]
    ability_ids: Vec<u32>,
}

#[derive(Args)]
struct RecordArgs {
    #[arg(long)]
    name: Option<String>,

    /// Repeat or comma-separate for several types
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    types: Vec<PokemonType>,

    /// Meters
    #[arg(long)]
    height: Option<String>,

    /// Kilograms
    #[arg(long)]
    weight: Option<String>,

    #[arg(long)]
    image_url: Option<String>,

    /// Ability names; repeat or comma-separate
    #[arg(short = 'a', long = "ability", value_delimiter = ',')]
    abilities: Vec<String>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print where the config file lives
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Count stored pages and records
    Stats,
    /// Drop every snapshot
    Clear,
    /// Drop snapshots older than the given number of days
    Prune {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Tui { .. }));
    init_logging(interactive)?;

    let mut config = Config::load()?;
    config.apply_overrides(cli.api_url, cli.api_key);
    if cli.offline {
        config.cache.offline_mode = true;
    }
    config.validate()?;

    let validator = Validator {
        strict_names: config.ui.strict_names,
    };

    match cli.command.unwrap_or(Commands::Tui { query: None }) {
        Commands::List { filter, json } => {
            let service = PokedexService::from_config(&config)?;
            let filter = filter.into_state(config.ui.page_size)?;
            info!("Listing {}", filter.key());
            let outcome = service.list(&filter).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.page)?);
            } else {
                output::print_list(&outcome);
            }
        }
        Commands::Show { id, json } => {
            let service = PokedexService::from_config(&config)?;
            let outcome = service.get(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.pokemon)?);
            } else {
                output::print_pokemon(&outcome.pokemon, outcome.source);
            }
        }
        Commands::Create(args) => {
            let values = args.into_values()?;
            let new = validator.parse(&values).map_err(|errors| anyhow!("{}", errors))?;
            let service = PokedexService::from_config(&config)?;
            let created = service.create(&new).await?;
            println!("Created {} {}", created.display_number(), created.name);
        }
        Commands::Update { id, fields } => {
            let service = PokedexService::from_config(&config)?;
            let current = service.get(id).await?.pokemon;
            let mut form = PokemonForm::edit(&current, validator);
            fields.apply_to(&mut form, &current);

            let patch = form.submit_changes().map_err(|errors| anyhow!("{}", errors))?;
            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            let updated = service.update(id, &patch).await?;
            println!("Updated {} {}", updated.display_number(), updated.name);
        }
        Commands::Delete { id } => {
            let service = PokedexService::from_config(&config)?;
            service.delete(id).await?;
            println!("Deleted #{:03}", id);
        }
        Commands::Abilities { ids, json } => {
            let service = PokedexService::from_config(&config)?;
            let abilities = match ids.as_slice() {
                [id] => vec![service.ability(*id).await?],
                _ => service.abilities(&ids).await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&abilities)?);
            } else {
                output::print_abilities(&abilities);
            }
        }
        Commands::Tui { query } => {
            let service = Arc::new(PokedexService::from_config(&config)?);
            let filter = match query {
                Some(q) => FilterState::from_query_string(&q),
                None => FilterState::with_page_size(config.ui.page_size),
            };
            let app = App::new(filter, config.ui.debounce(), validator);
            run_tui(app, service, config.ui.mouse_enabled).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", config.to_toml()?),
            ConfigAction::Path => println!("{}", Config::config_path()?.display()),
            ConfigAction::Init { force } => {
                let path = Config::config_path()?;
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                let written = Config::default().save()?;
                println!("Wrote {}", written.display());
            }
        },
        Commands::Cache { action } => {
            let store = open_snapshot_store()?;
            match action {
                CacheAction::Stats => {
                    let (pages, records) = store.counts()?;
                    println!("{} pages, {} records", pages, records);
                }
                CacheAction::Clear => {
                    store.clear()?;
                    println!("Snapshots cleared");
                }
                CacheAction::Prune { days } => {
                    let removed = store.prune_older_than(Utc::now() - chrono::Duration::days(days))?;
                    println!("Removed {} snapshots", removed);
                }
            }
        }
    }

    Ok(())
}

/// stderr for one-shot commands; a log file for the TUI so the screen stays clean
fn init_logging(to_file: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "pokedex=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if to_file {
        let path = Config::snapshot_path()?.with_file_name("pokedex.log");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

impl FilterArgs {
    fn into_state(self, default_page_size: u32) -> anyhow::Result<FilterState> {
        let page_size = pokedex_core::pagination::validate_page_size(self.limit.unwrap_or(default_page_size))?;
        if self.page == 0 {
            bail!("--page starts at 1");
        }
        Ok(FilterState {
            search: self.search.unwrap_or_default(),
            pokemon_type: self.pokemon_type,
            page: self.page,
            page_size,
            sort_by: self.sort,
            order: self.order,
            ability_ids: self.ability_ids,
        })
    }
}

impl RecordArgs {
    /// Everything a new record needs; missing required values are reported by the validator
    fn into_values(self) -> anyhow::Result<FormValues> {
        let name = self.name.context("--name is required")?;
        Ok(FormValues {
            name,
            types: self.types,
            height: self.height.unwrap_or_default(),
            weight: self.weight.unwrap_or_default(),
            image_url: self.image_url.unwrap_or_default(),
            abilities: self.abilities,
        })
    }

    /// Only the flags that were given replace form values
    fn apply_to(self, form: &mut PokemonForm, current: &pokedex_core::Pokemon) {
        if let Some(name) = self.name {
            form.set_name(name);
        }
        if !self.types.is_empty() {
            form.set_types(self.types);
        }
        if let Some(height) = self.height {
            form.set_height(height);
        }
        if let Some(weight) = self.weight {
            form.set_weight(weight);
        }
        if let Some(url) = self.image_url {
            form.set_image_url(url);
        }
        if !self.abilities.is_empty() {
            for name in current.ability_names() {
                form.remove_ability(name);
            }
            for name in &self.abilities {
                form.add_ability(name);
            }
        }
    }
}
