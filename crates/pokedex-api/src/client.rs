use std::time::Duration;

use reqwest::{Response, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::models::{
    AbilityRecord, CreatePokemonRequest, ListParams, ListResponse, PokemonRecord,
    UpdatePokemonRequest,
};
use crate::retry::{is_retryable_status, with_retry_if, RetryConfig};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response; `message` comes verbatim from the error body
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// HTTP status carried by the error, if there was a response at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 404s and client errors never get better by asking again
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            ApiError::NetworkError(e) => match e.status() {
                Some(status) => is_retryable_status(status),
                None => !e.is_decode() && !e.is_builder(),
            },
            ApiError::NotFound(_) | ApiError::ParseError(_) | ApiError::InvalidConfig(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

pub struct PokedexClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry_config: RetryConfig,
}

impl PokedexClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(10))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Pokedex/0.1.0"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::InvalidConfig("base URL is empty".into()));
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            retry_config: RetryConfig::default(),
        })
    }

    /// Replace the retry policy used for reads
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /pokemons` with filters and pagination
    pub async fn list_pokemons(&self, params: &ListParams) -> Result<ListResponse> {
        let url = format!("{}/pokemons", self.base_url);
        let pairs = params.to_pairs();

        self.read(|| async {
            debug!("GET {} {:?}", url, pairs);
            let response = self.client.get(&url).query(&pairs).send().await?;
            let response = check(response, "pokemon list").await?;
            Ok(response.json::<ListResponse>().await?)
        })
        .await
    }

    /// `GET /pokemons/{id}`
    pub async fn get_pokemon(&self, id: u32) -> Result<PokemonRecord> {
        let url = format!("{}/pokemons/{}", self.base_url, id);
        let what = format!("pokemon {}", id);

        self.read(|| async {
            debug!("GET {}", url);
            let response = self.client.get(&url).send().await?;
            let response = check(response, &what).await?;
            Ok(response.json::<PokemonRecord>().await?)
        })
        .await
    }

    /// `POST /pokemons`
    pub async fn create_pokemon(&self, body: &CreatePokemonRequest) -> Result<PokemonRecord> {
        let url = format!("{}/pokemons", self.base_url);
        debug!("POST {}", url);

        let request = self.authorize(self.client.post(&url)).json(body);
        let response = check(request.send().await?, "pokemon").await?;
        Ok(response.json::<PokemonRecord>().await?)
    }

    /// `PATCH /pokemons/{id}`
    pub async fn update_pokemon(
        &self,
        id: u32,
        body: &UpdatePokemonRequest,
    ) -> Result<PokemonRecord> {
        let url = format!("{}/pokemons/{}", self.base_url, id);
        debug!("PATCH {}", url);

        let request = self.authorize(self.client.patch(&url)).json(body);
        let response = check(request.send().await?, &format!("pokemon {}", id)).await?;
        Ok(response.json::<PokemonRecord>().await?)
    }

    /// `DELETE /pokemons/{id}` - any 2xx counts, the body is ignored
    pub async fn delete_pokemon(&self, id: u32) -> Result<()> {
        let url = format!("{}/pokemons/{}", self.base_url, id);
        debug!("DELETE {}", url);

        let request = self.authorize(self.client.delete(&url));
        check(request.send().await?, &format!("pokemon {}", id)).await?;
        Ok(())
    }

    /// `GET /abilities?ids=...`; an empty id list fetches every ability
    pub async fn list_abilities(&self, ids: &[u32]) -> Result<Vec<AbilityRecord>> {
        let url = format!("{}/abilities", self.base_url);
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        self.read(|| async {
            debug!("GET {} ids={}", url, joined);
            let mut request = self.client.get(&url);
            if !joined.is_empty() {
                request = request.query(&[("ids", joined.as_str())]);
            }
            let response = check(request.send().await?, "abilities").await?;
            let body = response.text().await?;
            let list: AbilityList = serde_json::from_str(&body)?;
            Ok(list.into_vec())
        })
        .await
    }

    /// `GET /abilities/{id}`
    pub async fn get_ability(&self, id: u32) -> Result<AbilityRecord> {
        let url = format!("{}/abilities/{}", self.base_url, id);
        let what = format!("ability {}", id);

        self.read(|| async {
            debug!("GET {}", url);
            let response = self.client.get(&url).send().await?;
            let response = check(response, &what).await?;
            Ok(response.json::<AbilityRecord>().await?)
        })
        .await
    }

    async fn read<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        with_retry_if(&self.retry_config, operation, ApiError::is_retryable).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum AbilityList {
    Plain(Vec<AbilityRecord>),
    Paged { items: Vec<AbilityRecord> },
}

impl AbilityList {
    fn into_vec(self) -> Vec<AbilityRecord> {
        match self {
            AbilityList::Plain(items) | AbilityList::Paged { items } => items,
        }
    }
}

/// Turn non-2xx responses into typed errors
async fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body, status),
        });
    }

    Ok(response)
}

/// Pull the user-facing message out of an error body
///
/// Prefers the JSON `message` field (validation errors send an array of them),
/// then the raw body, then the status reason.
pub fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("message") {
            Some(serde_json::Value::String(message)) => return message.clone(),
            Some(serde_json::Value::Array(messages)) => {
                let joined = messages
                    .iter()
                    .filter_map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                if !joined.is_empty() {
                    return joined;
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| "Network error".to_string())
}
