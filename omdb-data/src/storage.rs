use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::{
    error::{DataError, Result},
    models::{Movie, MovieInfo, Search, imdb_key, query_key},
};

/// Default lifetime of a cached movie list
pub const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Trait for the local cache of movies, movie details and search history.
///
/// Implementations own the expiration policy for movie lists: an expired
/// list is reported as empty, exactly like a list that was never saved.
#[async_trait]
pub trait LocalDataSource: Send + Sync {
    /// Movies stored under `query`, or an empty list if absent or expired
    async fn get_movies(&self, query: &str) -> Result<Vec<Movie>>;
    /// Overwrite the movies stored under `query` and record the search
    async fn save_movies(&self, query: &str, movies: Vec<Movie>) -> Result<()>;
    /// Detail record for `imdb_id`, or `MovieInfo::default()` if absent
    async fn get_movie_info(&self, imdb_id: &str) -> Result<MovieInfo>;
    async fn save_movie_info(&self, info: MovieInfo) -> Result<()>;
    /// Most recent search, or `Search::default()` if nothing was searched yet
    async fn get_last_search(&self) -> Result<Search>;
    /// All recorded searches, newest first
    async fn get_all_searches(&self) -> Result<Vec<Search>>;
}

#[derive(Debug, Clone)]
struct CachedMovies {
    movies: Vec<Movie>,
    saved_at: DateTime<Utc>,
}

/// In-memory implementation of LocalDataSource
pub struct InMemoryLocalDataSource {
    movies: Arc<DashMap<String, CachedMovies>>,
    movie_info: Arc<DashMap<String, MovieInfo>>,
    searches: Arc<Mutex<Vec<Search>>>,
    expiration: Duration,
}

impl InMemoryLocalDataSource {
    pub fn new() -> Self {
        Self {
            movies: Arc::new(DashMap::new()),
            movie_info: Arc::new(DashMap::new()),
            searches: Arc::new(Mutex::new(Vec::new())),
            expiration: Duration::hours(DEFAULT_EXPIRATION_HOURS),
        }
    }

    /// Set how long a saved movie list stays fresh
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    fn record_search(&self, query: &str, searched_at: DateTime<Utc>) -> Result<()> {
        let key = query_key(query);
        let mut searches = self
            .searches
            .lock()
            .map_err(|_| DataError::Storage("search history lock poisoned".to_string()))?;

        searches.retain(|search| {
            search
                .query
                .as_deref()
                .map(|existing| query_key(existing) != key)
                .unwrap_or(true)
        });
        searches.insert(0, Search::new(query.trim(), searched_at));
        Ok(())
    }
}

impl Default for InMemoryLocalDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalDataSource for InMemoryLocalDataSource {
    async fn get_movies(&self, query: &str) -> Result<Vec<Movie>> {
        let key = query_key(query);
        let Some(entry) = self.movies.get(&key) else {
            return Ok(Vec::new());
        };

        if Utc::now() - entry.saved_at >= self.expiration {
            debug!("Cached movies for '{}' expired", key);
            return Ok(Vec::new());
        }

        Ok(entry.movies.clone())
    }

    async fn save_movies(&self, query: &str, movies: Vec<Movie>) -> Result<()> {
        let saved_at = Utc::now();
        self.movies
            .insert(query_key(query), CachedMovies { movies, saved_at });
        self.record_search(query, saved_at)
    }

    async fn get_movie_info(&self, imdb_id: &str) -> Result<MovieInfo> {
        Ok(self
            .movie_info
            .get(&imdb_key(imdb_id))
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn save_movie_info(&self, info: MovieInfo) -> Result<()> {
        if !info.is_present() {
            return Err(DataError::Storage(
                "cannot save movie info without an IMDb id".to_string(),
            ));
        }
        self.movie_info.insert(imdb_key(&info.imdb_id), info);
        Ok(())
    }

    async fn get_last_search(&self) -> Result<Search> {
        let searches = self
            .searches
            .lock()
            .map_err(|_| DataError::Storage("search history lock poisoned".to_string()))?;
        Ok(searches.first().cloned().unwrap_or_default())
    }

    async fn get_all_searches(&self) -> Result<Vec<Search>> {
        let searches = self
            .searches
            .lock()
            .map_err(|_| DataError::Storage("search history lock poisoned".to_string()))?;
        Ok(searches.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_movies_round_trip_under_normalized_key() {
        let local = InMemoryLocalDataSource::new();
        local
            .save_movies(" Batman", vec![Movie::new("tt0372784", "Batman Begins")])
            .await
            .unwrap();

        let movies = local.get_movies("batman").await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Batman Begins");
        assert!(local.get_movies("superman").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_movies_read_as_empty() {
        let local = InMemoryLocalDataSource::new().with_expiration(Duration::zero());
        local
            .save_movies("alien", vec![Movie::new("tt0078748", "Alien")])
            .await
            .unwrap();

        assert!(local.get_movies("alien").await.unwrap().is_empty());
        // history survives expiration
        assert_eq!(
            local.get_last_search().await.unwrap().query.as_deref(),
            Some("alien")
        );
    }

    #[tokio::test]
    async fn test_search_history_is_newest_first_without_duplicates() {
        let local = InMemoryLocalDataSource::new();
        for query in ["batman", "inception", "Batman "] {
            local.save_movies(query, Vec::new()).await.unwrap();
        }

        let queries: Vec<_> = local
            .get_all_searches()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|search| search.query)
            .collect();
        assert_eq!(queries, vec!["Batman", "inception"]);
    }

    #[tokio::test]
    async fn test_empty_history_yields_default_search() {
        let local = InMemoryLocalDataSource::new();
        assert_eq!(local.get_last_search().await.unwrap(), Search::default());
        assert!(local.get_all_searches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movie_info_absent_until_saved() {
        let local = InMemoryLocalDataSource::new();
        assert!(!local.get_movie_info("tt0111161").await.unwrap().is_present());

        local
            .save_movie_info(MovieInfo::new("tt0111161", "The Shawshank Redemption"))
            .await
            .unwrap();
        let info = local.get_movie_info("tt0111161").await.unwrap();
        assert_eq!(info.title, "The Shawshank Redemption");
    }

    #[tokio::test]
    async fn test_movie_info_key_ignores_case_and_padding() {
        let local = InMemoryLocalDataSource::new();
        local
            .save_movie_info(MovieInfo::new("tt0111161", "The Shawshank Redemption"))
            .await
            .unwrap();

        for id in ["TT0111161", " tt0111161 "] {
            let info = local.get_movie_info(id).await.unwrap();
            assert_eq!(info.imdb_id, "tt0111161");
        }
    }

    #[tokio::test]
    async fn test_saving_movie_info_without_id_fails() {
        let local = InMemoryLocalDataSource::new();
        let err = local.save_movie_info(MovieInfo::default()).await.unwrap_err();
        assert!(err.is_storage());
    }
}
