// Pokédex service with caching and offline fallback
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pokedex_api::{PokedexClient, RetryConfig};
use pokedex_cache::{Snapshot, SnapshotStore};
use tracing::{debug, info, warn};

use crate::{
    backend::PokemonBackend,
    config::Config,
    demo,
    providers::{HttpBackend, MemoryBackend},
    filter::{FilterState, ListKey},
    models::{Ability, ListPage, NewPokemon, Pokemon, PokemonPatch},
    query_cache::QueryCache,
    Error, Result,
};

/// How long a list page or record counts as fresh
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// Abilities barely change, so they live longer
pub const ABILITY_STALE_AFTER: Duration = Duration::from_secs(600);

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Fetched just now
    Network,
    /// Served from memory without a round trip
    Cache,
    /// Backend failed, last value held in memory
    StaleCache,
    /// Backend failed, last value persisted to SQLite
    Snapshot,
    /// Backend failed and nothing was cached - built-in sample data
    Demo,
}

impl DataSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DataSource::StaleCache | DataSource::Snapshot | DataSource::Demo)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Network => "live",
            DataSource::Cache => "cached",
            DataSource::StaleCache => "stale cache",
            DataSource::Snapshot => "offline snapshot",
            DataSource::Demo => "demo data",
        }
    }
}

/// A page plus how we got it; `error` is set whenever a fallback was used
#[derive(Debug)]
pub struct ListOutcome {
    pub page: ListPage,
    pub source: DataSource,
    pub error: Option<Error>,
    /// How old the page was when served from the snapshot store
    pub snapshot_age: Option<chrono::Duration>,
}

impl ListOutcome {
    /// Banner text for degraded results
    pub fn banner(&self) -> Option<String> {
        let err = self.error.as_ref()?;
        Some(match self.snapshot_age {
            Some(age) => format!("Showing {} from {}: {}", self.source.label(), describe_age(age), err),
            None => format!("Showing {}: {}", self.source.label(), err),
        })
    }
}

/// "just now", "5 min ago", "3 h ago", "2 days ago"
pub fn describe_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{} min ago", minutes)
    } else if minutes < 60 * 24 {
        format!("{} h ago", age.num_hours())
    } else {
        let days = age.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}

#[derive(Debug)]
pub struct RecordOutcome {
    pub pokemon: Pokemon,
    pub source: DataSource,
    pub error: Option<Error>,
}

/// Entry point for everything the UI does with Pokémon
///
/// Reads go through the in-memory query cache; on failure they fall back to
/// the last value in memory, then the SQLite snapshot, then demo data.
/// Mutations are sent straight to the backend and, when they succeed, patch
/// or invalidate the affected cache entries.
pub struct PokedexService {
    backend: Arc<dyn PokemonBackend>,
    lists: QueryCache<ListKey, ListPage>,
    records: QueryCache<u32, Pokemon>,
    ability_lists: QueryCache<Vec<u32>, Vec<Ability>>,
    abilities: QueryCache<u32, Ability>,
    snapshots: Option<Mutex<SnapshotStore>>,
    demo_fallback: bool,
}

impl PokedexService {
    pub fn new(backend: Arc<dyn PokemonBackend>) -> Self {
        Self {
            backend,
            lists: QueryCache::new(DEFAULT_STALE_AFTER),
            records: QueryCache::new(DEFAULT_STALE_AFTER),
            ability_lists: QueryCache::new(ABILITY_STALE_AFTER),
            abilities: QueryCache::new(ABILITY_STALE_AFTER),
            snapshots: None,
            demo_fallback: true,
        }
    }

    /// Wire up the backend, snapshot store and cache timings from `config`
    ///
    /// A snapshot store that can't be opened is logged and skipped; the
    /// service still works, it just has one fewer fallback.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn PokemonBackend> = if config.cache.offline_mode {
            info!("Offline mode, using built-in demo data");
            Arc::new(MemoryBackend::with_demo_data())
        } else {
            let client = PokedexClient::with_timeout(
                config.api.base_url.clone(),
                config.api.api_key.clone(),
                config.api.timeout(),
            )?
            .with_retry_config(RetryConfig::with_max_retries(config.api.max_retries));
            Arc::new(HttpBackend::new(client))
        };

        let mut service = Self::new(backend).with_stale_after(config.cache.stale_after());

        if config.cache.snapshot_enabled && !config.cache.offline_mode {
            match open_snapshot_store() {
                Ok(store) => service = service.with_snapshots(store),
                Err(e) => warn!("Snapshot store unavailable: {}", e),
            }
        }

        Ok(service)
    }

    pub fn with_snapshots(mut self, store: SnapshotStore) -> Self {
        self.snapshots = Some(Mutex::new(store));
        self
    }

    /// Replaces the list and record caches, so call it before the first read
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.lists = QueryCache::new(stale_after);
        self.records = QueryCache::new(stale_after);
        self
    }

    pub fn with_demo_fallback(mut self, enabled: bool) -> Self {
        self.demo_fallback = enabled;
        self
    }

    /// Fetch one page for `filter`
    ///
    /// Only fails when the backend fails and there is nothing at all to fall
    /// back on (demo fallback disabled and nothing cached).
    pub async fn list(&self, filter: &FilterState) -> Result<ListOutcome> {
        let key = filter.key();
        let fetched = AtomicBool::new(false);

        let result = self
            .lists
            .get_or_fetch(&key, || async {
                fetched.store(true, Ordering::SeqCst);
                info!("Fetching pokemon list {}", key);
                self.backend.list(filter).await
            })
            .await;

        match result {
            Ok(page) => {
                let source = if fetched.load(Ordering::SeqCst) {
                    self.with_snapshots_do(|store| store.put_page(key.as_str(), &page));
                    DataSource::Network
                } else {
                    DataSource::Cache
                };
                Ok(ListOutcome {
                    page,
                    source,
                    error: None,
                    snapshot_age: None,
                })
            }
            Err(err) => self.list_fallback(filter, &key, err),
        }
    }

    fn list_fallback(&self, filter: &FilterState, key: &ListKey, err: Error) -> Result<ListOutcome> {
        warn!("Pokemon list {} failed: {}", key, err);

        let mut snapshot_age = None;
        let (page, source) = if let Some(page) = self.lists.peek(key) {
            (page, DataSource::StaleCache)
        } else if let Some(snapshot) = self.snapshot_page(key) {
            let age = snapshot.age(Utc::now());
            info!("Snapshot for {} is {}", key, describe_age(age));
            snapshot_age = Some(age);
            (snapshot.value, DataSource::Snapshot)
        } else if self.demo_fallback {
            (demo::list(filter), DataSource::Demo)
        } else {
            return Err(err);
        };

        info!("Serving pokemon list {} from {}", key, source.label());
        Ok(ListOutcome {
            page,
            source,
            error: Some(err),
            snapshot_age,
        })
    }

    /// Fetch one record; `NotFound` never falls back
    pub async fn get(&self, id: u32) -> Result<RecordOutcome> {
        let fetched = AtomicBool::new(false);
        let result = self
            .records
            .get_or_fetch(&id, || async {
                fetched.store(true, Ordering::SeqCst);
                info!("Fetching pokemon {}", id);
                self.backend.get(id).await
            })
            .await;

        match result {
            Ok(pokemon) => {
                let source = if fetched.load(Ordering::SeqCst) {
                    self.with_snapshots_do(|store| store.put_record(id, &pokemon));
                    DataSource::Network
                } else {
                    DataSource::Cache
                };
                Ok(RecordOutcome {
                    pokemon,
                    source,
                    error: None,
                })
            }
            Err(err) if err.is_not_found() => {
                self.forget_record(id);
                Err(err)
            }
            Err(err) => self.record_fallback(id, err),
        }
    }

    fn record_fallback(&self, id: u32, err: Error) -> Result<RecordOutcome> {
        warn!("Pokemon {} failed: {}", id, err);

        let (pokemon, source) = if let Some(pokemon) = self.records.peek(&id) {
            (pokemon, DataSource::StaleCache)
        } else if let Some(snapshot) = self.snapshot_record(id) {
            info!("Snapshot for pokemon {} is {}", id, describe_age(snapshot.age(Utc::now())));
            (snapshot.value, DataSource::Snapshot)
        } else if let Some(pokemon) = demo::find(id).filter(|_| self.demo_fallback) {
            (pokemon, DataSource::Demo)
        } else {
            return Err(err);
        };

        Ok(RecordOutcome {
            pokemon,
            source,
            error: Some(err),
        })
    }

    pub async fn create(&self, pokemon: &NewPokemon) -> Result<Pokemon> {
        info!("Creating pokemon {}", pokemon.name);
        let created = self.backend.create(pokemon).await?;

        self.records.patch(created.id, created.clone());
        self.invalidate_lists();
        self.ability_lists.invalidate_all();
        self.with_snapshots_do(|store| store.put_record(created.id, &created));

        info!("Created pokemon {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update(&self, id: u32, patch: &PokemonPatch) -> Result<Pokemon> {
        if patch.is_empty() {
            debug!("Empty patch for pokemon {}, nothing to send", id);
            return self.get(id).await.map(|outcome| outcome.pokemon);
        }

        info!("Updating pokemon {}", id);
        let updated = match self.backend.update(id, patch).await {
            Ok(updated) => updated,
            Err(err) => {
                if err.is_not_found() {
                    self.forget_record(id);
                }
                return Err(err);
            }
        };

        self.records.patch(id, updated.clone());
        self.invalidate_lists();
        self.ability_lists.invalidate_all();
        self.with_snapshots_do(|store| store.put_record(id, &updated));

        Ok(updated)
    }

    pub async fn delete(&self, id: u32) -> Result<()> {
        info!("Deleting pokemon {}", id);
        if let Err(err) = self.backend.delete(id).await {
            if err.is_not_found() {
                self.forget_record(id);
            }
            return Err(err);
        }

        self.forget_record(id);
        info!("Deleted pokemon {}", id);
        Ok(())
    }

    /// Abilities by id, all of them for an empty slice
    pub async fn abilities(&self, ids: &[u32]) -> Result<Vec<Ability>> {
        let mut key = ids.to_vec();
        key.sort_unstable();
        key.dedup();

        let result = self
            .ability_lists
            .get_or_fetch(&key, || async { self.backend.abilities(&key).await })
            .await;

        match result {
            Ok(abilities) => Ok(abilities),
            Err(err) if self.demo_fallback && !err.is_not_found() => {
                warn!("Abilities failed, using sample set: {}", err);
                Ok(self.ability_lists.peek(&key).unwrap_or_else(|| demo::abilities(&key)))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn ability(&self, id: u32) -> Result<Ability> {
        self.abilities
            .get_or_fetch(&id, || async { self.backend.ability(id).await })
            .await
    }

    /// Mark every cached read stale, e.g. on a manual refresh
    pub fn refresh_all(&self) {
        let lists = self.lists.invalidate_all();
        let records = self.records.invalidate_all();
        self.ability_lists.invalidate_all();
        self.abilities.invalidate_all();
        debug!("Invalidated {} lists and {} records", lists, records);
    }

    fn invalidate_lists(&self) {
        let count = self.lists.invalidate_all();
        debug!("Invalidated {} cached list pages", count);
    }

    /// Drop a record everywhere and make lists refetch
    fn forget_record(&self, id: u32) {
        self.records.remove(&id);
        self.invalidate_lists();
        self.with_snapshots_do(|store| store.remove_record(id));
    }

    fn snapshot_page(&self, key: &ListKey) -> Option<Snapshot<ListPage>> {
        self.with_snapshots_do(|store| store.get_page::<ListPage>(key.as_str()))
            .flatten()
    }

    fn snapshot_record(&self, id: u32) -> Option<Snapshot<Pokemon>> {
        self.with_snapshots_do(|store| store.get_record::<Pokemon>(id))
            .flatten()
    }

    /// Snapshot failures are logged and otherwise ignored
    fn with_snapshots_do<T, F>(&self, op: F) -> Option<T>
    where
        F: FnOnce(&SnapshotStore) -> pokedex_cache::cache::Result<T>,
    {
        let store = self.snapshots.as_ref()?;
        let store = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match op(&store) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Snapshot store error: {}", e);
                None
            }
        }
    }
}

/// Open (creating if needed) the snapshot database under the user cache dir
pub fn open_snapshot_store() -> Result<SnapshotStore> {
    let path = Config::snapshot_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Opening snapshot store at {}", path.display());
    Ok(SnapshotStore::new(&path.to_string_lossy())?)
}
