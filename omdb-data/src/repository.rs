//! MovieDataRepository – serves movie data from the local cache, falling back to the remote API.
//!
//! Every operation reads local storage first. On a cache miss the remote source is queried, the
//! result is saved locally, and the *saved* record is read back and returned, so callers always
//! see data in the shape local storage keeps it.
//!
//! Movie lists are trusted until the local source reports them expired (it returns an empty
//! list). Movie details are trusted forever once stored.
//!
//! Calls are independent: two concurrent misses for the same key both hit the remote API and
//! both save, relying on the local source to overwrite idempotently. Dropping a returned future
//! abandons the remote fetch and the save that depends on it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::Result,
    models::{Movie, MovieInfo, Search},
    remote::RemoteDataSource,
    storage::LocalDataSource,
};

/// Read access to movies, movie details and search history
#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn get_movies(&self, query: &str) -> Result<Vec<Movie>>;
    async fn get_movie_info(&self, imdb_id: &str) -> Result<MovieInfo>;
    async fn get_last_search(&self) -> Result<Search>;
    async fn get_all_queries(&self) -> Result<Vec<String>>;
}

/// Cache-or-fetch repository over a local and a remote data source.
#[derive(Clone)]
pub struct MovieDataRepository {
    local: Arc<dyn LocalDataSource>,
    remote: Arc<dyn RemoteDataSource>,
}

impl MovieDataRepository {
    pub fn new(local: Arc<dyn LocalDataSource>, remote: Arc<dyn RemoteDataSource>) -> Self {
        Self { local, remote }
    }

    async fn remote_movies(&self, query: &str) -> Result<Vec<Movie>> {
        let movies = self.remote.get_movies(query).await?;
        info!("Caching {} movies for '{}'", movies.len(), query);
        self.local.save_movies(query, movies).await?;
        self.local.get_movies(query).await
    }

    async fn remote_movie_info(&self, imdb_id: &str) -> Result<MovieInfo> {
        let info = self.remote.get_movie_info(imdb_id).await?;
        info!("Caching movie info for {}", imdb_id);
        self.local.save_movie_info(info).await?;
        self.local.get_movie_info(imdb_id).await
    }
}

#[async_trait]
impl MovieRepository for MovieDataRepository {
    async fn get_movies(&self, query: &str) -> Result<Vec<Movie>> {
        let movies = self.local.get_movies(query).await?;
        if !movies.is_empty() {
            debug!("Cache hit for '{}' ({} movies)", query, movies.len());
            return Ok(movies);
        }

        debug!("Cache miss for '{}'", query);
        self.remote_movies(query).await
    }

    async fn get_movie_info(&self, imdb_id: &str) -> Result<MovieInfo> {
        let info = self.local.get_movie_info(imdb_id).await?;
        if info.is_present() {
            debug!("Cache hit for {}", imdb_id);
            return Ok(info);
        }

        debug!("Cache miss for {}", imdb_id);
        self.remote_movie_info(imdb_id).await
    }

    async fn get_last_search(&self) -> Result<Search> {
        self.local.get_last_search().await
    }

    async fn get_all_queries(&self) -> Result<Vec<String>> {
        let searches = self.local.get_all_searches().await?;
        Ok(searches
            .into_iter()
            .map(|search| search.query.unwrap_or_default())
            .collect())
    }
}
