use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, types::Json};
use tracing::{debug, info};

use crate::{
    error::{DataError, Result},
    models::{Movie, MovieInfo, Search, imdb_key, query_key},
    storage::{DEFAULT_EXPIRATION_HOURS, LocalDataSource},
};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS omdb_searches (
        query_key   TEXT PRIMARY KEY,
        query       TEXT NOT NULL,
        searched_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS omdb_movies (
        query_key TEXT NOT NULL,
        position  INTEGER NOT NULL,
        imdb_id   TEXT NOT NULL,
        title     TEXT NOT NULL,
        year      TEXT NOT NULL,
        kind      TEXT NOT NULL,
        poster    TEXT NOT NULL,
        PRIMARY KEY (query_key, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS omdb_movie_info (
        imdb_id  TEXT PRIMARY KEY,
        data     JSONB NOT NULL,
        saved_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// PostgreSQL implementation of LocalDataSource
pub struct PostgresLocalDataSource {
    pool: PgPool,
    expiration: Duration,
}

impl PostgresLocalDataSource {
    /// Connect to `database_url` and make sure the cache tables exist
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let source = Self::from_pool(pool);
        source.migrate().await?;
        Ok(source)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            expiration: Duration::hours(DEFAULT_EXPIRATION_HOURS),
        }
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Movie cache schema ready");
        Ok(())
    }
}

fn search_from_row(row: &sqlx::postgres::PgRow) -> Result<Search> {
    let query: String = row.try_get("query")?;
    let searched_at: DateTime<Utc> = row.try_get("searched_at")?;
    Ok(Search::new(query, searched_at))
}

#[async_trait]
impl LocalDataSource for PostgresLocalDataSource {
    async fn get_movies(&self, query: &str) -> Result<Vec<Movie>> {
        let key = query_key(query);

        let searched_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT searched_at FROM omdb_searches WHERE query_key = $1")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;

        match searched_at {
            Some(at) if Utc::now() - at < self.expiration => {}
            Some(_) => {
                debug!("Cached movies for '{}' expired", key);
                return Ok(Vec::new());
            }
            None => return Ok(Vec::new()),
        }

        let rows = sqlx::query(
            "SELECT imdb_id, title, year, kind, poster FROM omdb_movies \
             WHERE query_key = $1 ORDER BY position",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Movie> {
                Ok(Movie {
                    imdb_id: row.try_get("imdb_id")?,
                    title: row.try_get("title")?,
                    year: row.try_get("year")?,
                    kind: row.try_get("kind")?,
                    poster: row.try_get("poster")?,
                })
            })
            .collect()
    }

    async fn save_movies(&self, query: &str, movies: Vec<Movie>) -> Result<()> {
        let key = query_key(query);
        let mut tx = self.pool.begin().await?;

        // Upserting the search row first locks the key, so concurrent writers
        // for the same query run one after the other.
        sqlx::query(
            "INSERT INTO omdb_searches (query_key, query, searched_at) VALUES ($1, $2, $3) \
             ON CONFLICT (query_key) DO UPDATE SET query = EXCLUDED.query, searched_at = EXCLUDED.searched_at",
        )
        .bind(&key)
        .bind(query.trim())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM omdb_movies WHERE query_key = $1")
            .bind(&key)
            .execute(&mut *tx)
            .await?;

        for (position, movie) in movies.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| DataError::Storage("too many movies for one query".to_string()))?;
            sqlx::query(
                "INSERT INTO omdb_movies (query_key, position, imdb_id, title, year, kind, poster) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&key)
            .bind(position)
            .bind(&movie.imdb_id)
            .bind(&movie.title)
            .bind(&movie.year)
            .bind(&movie.kind)
            .bind(&movie.poster)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Saved {} movies for '{}'", movies.len(), key);
        Ok(())
    }

    async fn get_movie_info(&self, imdb_id: &str) -> Result<MovieInfo> {
        let data: Option<Json<MovieInfo>> =
            sqlx::query_scalar("SELECT data FROM omdb_movie_info WHERE imdb_id = $1")
                .bind(imdb_key(imdb_id))
                .fetch_optional(&self.pool)
                .await?;

        Ok(data.map(|json| json.0).unwrap_or_default())
    }

    async fn save_movie_info(&self, info: MovieInfo) -> Result<()> {
        if !info.is_present() {
            return Err(DataError::Storage(
                "cannot save movie info without an IMDb id".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO omdb_movie_info (imdb_id, data, saved_at) VALUES ($1, $2, $3) \
             ON CONFLICT (imdb_id) DO UPDATE SET data = EXCLUDED.data, saved_at = EXCLUDED.saved_at",
        )
        .bind(imdb_key(&info.imdb_id))
        .bind(Json(&info))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_last_search(&self) -> Result<Search> {
        let row = sqlx::query(
            "SELECT query, searched_at FROM omdb_searches ORDER BY searched_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => search_from_row(&row),
            None => Ok(Search::default()),
        }
    }

    async fn get_all_searches(&self) -> Result<Vec<Search>> {
        let rows =
            sqlx::query("SELECT query, searched_at FROM omdb_searches ORDER BY searched_at DESC")
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(search_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs only when DATABASE_URL points at a Postgres instance.
    async fn source() -> Option<PostgresLocalDataSource> {
        let database_url = std::env::var("DATABASE_URL").ok()?;
        Some(PostgresLocalDataSource::connect(&database_url).await.unwrap())
    }

    fn unique(name: &str) -> String {
        format!(
            "{}-{}",
            name,
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        )
    }

    #[tokio::test]
    async fn test_movies_keep_position_order_under_normalized_key() {
        let Some(local) = source().await else { return };
        let query = unique("Batman");
        let movies = vec![
            Movie::new("tt0372784", "Batman Begins"),
            Movie::new("tt0468569", "The Dark Knight"),
            Movie::new("tt1345836", "The Dark Knight Rises"),
        ];

        local
            .save_movies(&format!("  {} ", query.to_uppercase()), movies.clone())
            .await
            .unwrap();

        assert_eq!(local.get_movies(&query).await.unwrap(), movies);
        assert!(local.get_movies(&unique("superman")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resave_overwrites_previous_list() {
        let Some(local) = source().await else { return };
        let query = unique("alien");

        local
            .save_movies(
                &query,
                vec![Movie::new("tt0078748", "Alien"), Movie::new("tt0090605", "Aliens")],
            )
            .await
            .unwrap();
        local
            .save_movies(&query, vec![Movie::new("tt0103644", "Alien 3")])
            .await
            .unwrap();

        let movies = local.get_movies(&query).await.unwrap();
        assert_eq!(movies, vec![Movie::new("tt0103644", "Alien 3")]);
    }

    #[tokio::test]
    async fn test_expired_movies_read_as_empty() {
        let Some(local) = source().await else { return };
        let local = local.with_expiration(Duration::zero());
        let query = unique("heat");

        local
            .save_movies(&query, vec![Movie::new("tt0113277", "Heat")])
            .await
            .unwrap();

        assert!(local.get_movies(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_history_is_newest_first_without_duplicates() {
        let Some(local) = source().await else { return };
        let first = unique("batman");
        let second = unique("inception");

        local.save_movies(&first, Vec::new()).await.unwrap();
        local.save_movies(&second, Vec::new()).await.unwrap();
        local
            .save_movies(&first.to_uppercase(), Vec::new())
            .await
            .unwrap();

        let queries: Vec<_> = local
            .get_all_searches()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|search| search.query)
            .filter(|query| query_key(query) == first || query_key(query) == second)
            .collect();
        assert_eq!(queries, vec![first.to_uppercase(), second]);

        let last = local.get_last_search().await.unwrap();
        assert!(last.searched_at.is_some());
    }

    #[tokio::test]
    async fn test_movie_info_round_trips_through_jsonb() {
        let Some(local) = source().await else { return };
        let imdb_id = unique("tt");
        assert!(!local.get_movie_info(&imdb_id).await.unwrap().is_present());

        let mut info = MovieInfo::new(imdb_id.clone(), "The Shawshank Redemption");
        info.plot = "Two imprisoned men bond over a number of years.".to_string();
        info.imdb_rating = "9.3".to_string();
        local.save_movie_info(info.clone()).await.unwrap();

        assert_eq!(local.get_movie_info(&imdb_id).await.unwrap(), info);
        assert_eq!(
            local
                .get_movie_info(&format!(" {} ", imdb_id.to_uppercase()))
                .await
                .unwrap(),
            info
        );
    }

    #[tokio::test]
    async fn test_saving_movie_info_without_id_fails() {
        let Some(local) = source().await else { return };
        let err = local.save_movie_info(MovieInfo::default()).await.unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_concurrent_saves_for_new_query_both_succeed() {
        let Some(local) = source().await else { return };
        let query = unique("dune");
        let movies = vec![
            Movie::new("tt1160419", "Dune"),
            Movie::new("tt15239678", "Dune: Part Two"),
        ];

        let (first, second) = tokio::join!(
            local.save_movies(&query, movies.clone()),
            local.save_movies(&query, movies.clone()),
        );

        first.unwrap();
        second.unwrap();
        assert_eq!(local.get_movies(&query).await.unwrap(), movies);
    }
}
