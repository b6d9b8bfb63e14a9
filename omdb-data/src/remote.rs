use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    error::{DataError, Result},
    models::{Movie, MovieInfo},
};

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// OMDb answers a search with no hits using this error message
const NOT_FOUND_MESSAGE: &str = "Movie not found!";

/// Trait for the remote movie API
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    async fn get_movies(&self, title: &str) -> Result<Vec<Movie>>;
    async fn get_movie_info(&self, imdb_id: &str) -> Result<MovieInfo>;
}

/// Connection settings for the OMDb API
#[derive(Debug, Clone)]
pub struct OmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OmdbConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(rename = "Search", default)]
    search: Vec<Movie>,
}

#[derive(Debug, Deserialize)]
struct InfoEnvelope {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(flatten)]
    info: MovieInfo,
}

fn api_error(error: Option<String>) -> DataError {
    DataError::Fetch(error.unwrap_or_else(|| "OMDb request failed".to_string()))
}

pub(crate) fn decode_search(body: &str) -> Result<Vec<Movie>> {
    let envelope: SearchEnvelope = serde_json::from_str(body)
        .map_err(|e| DataError::Fetch(format!("invalid OMDb search response: {}", e)))?;

    if envelope.response.eq_ignore_ascii_case("true") {
        return Ok(envelope.search);
    }

    match envelope.error {
        Some(message) if message == NOT_FOUND_MESSAGE => Ok(Vec::new()),
        error => Err(api_error(error)),
    }
}

pub(crate) fn decode_movie_info(body: &str) -> Result<MovieInfo> {
    let envelope: InfoEnvelope = serde_json::from_str(body)
        .map_err(|e| DataError::Fetch(format!("invalid OMDb movie response: {}", e)))?;

    if !envelope.response.eq_ignore_ascii_case("true") {
        return Err(api_error(envelope.error));
    }
    if !envelope.info.is_present() {
        return Err(DataError::Fetch(
            "OMDb returned a movie without an IMDb id".to_string(),
        ));
    }
    Ok(envelope.info)
}

/// HTTP client for the OMDb API
pub struct OmdbClient {
    client: Client,
    config: OmdbConfig,
}

impl OmdbClient {
    pub fn new(config: OmdbConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("apikey", self.config.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DataError::Fetch(format!(
                "OMDb returned {}: {}",
                status, body
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl RemoteDataSource for OmdbClient {
    async fn get_movies(&self, title: &str) -> Result<Vec<Movie>> {
        info!("Searching OMDb for '{}'", title);
        let body = self.fetch(&[("s", title)]).await?;
        let movies = decode_search(&body)?;
        debug!("OMDb returned {} movies for '{}'", movies.len(), title);
        Ok(movies)
    }

    async fn get_movie_info(&self, imdb_id: &str) -> Result<MovieInfo> {
        info!("Fetching OMDb details for {}", imdb_id);
        let body = self.fetch(&[("i", imdb_id), ("plot", "full")]).await?;
        decode_movie_info(&body)
    }
}
