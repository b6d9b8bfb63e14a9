pub mod error;
pub mod models;
pub mod remote;
pub mod repository;
pub mod storage;
pub mod storage_postgres;

// Re-export commonly used types
pub use error::{DataError, Result};
pub use models::{Movie, MovieInfo, Search};
pub use remote::{OmdbClient, OmdbConfig, RemoteDataSource};
pub use repository::{MovieDataRepository, MovieRepository};
pub use storage::{InMemoryLocalDataSource, LocalDataSource};
pub use storage_postgres::PostgresLocalDataSource;
