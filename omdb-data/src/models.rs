use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary record returned by a title search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Movie {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(default)]
    pub poster: String,
}

impl Movie {
    pub fn new(imdb_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Detail record for a single title.
///
/// An empty `imdb_id` marks the record as absent; local sources return
/// `MovieInfo::default()` when they hold nothing for an identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MovieInfo {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    pub rated: String,
    pub released: String,
    pub runtime: String,
    pub genre: String,
    pub director: String,
    pub writer: String,
    pub actors: String,
    pub plot: String,
    pub language: String,
    pub country: String,
    pub poster: String,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: String,
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

impl MovieInfo {
    pub fn new(imdb_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn is_present(&self) -> bool {
        !self.imdb_id.is_empty()
    }
}

/// A previously issued query.
///
/// `Search::default()` has no query and stands for "nothing searched yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    pub query: Option<String>,
    pub searched_at: Option<DateTime<Utc>>,
}

impl Search {
    pub fn new(query: impl Into<String>, searched_at: DateTime<Utc>) -> Self {
        Self {
            query: Some(query.into()),
            searched_at: Some(searched_at),
        }
    }
}

/// Cache key for a query: surrounding whitespace and letter case are ignored.
pub(crate) fn query_key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Cache key for a detail record, normalized like `query_key`.
pub(crate) fn imdb_key(imdb_id: &str) -> String {
    imdb_id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_info_decodes_omdb_fields() {
        let body = r#"{
            "Title": "The Shawshank Redemption",
            "Year": "1994",
            "Rated": "R",
            "Director": "Frank Darabont",
            "imdbRating": "9.3",
            "imdbID": "tt0111161",
            "Type": "movie",
            "Response": "True"
        }"#;

        let info: MovieInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.imdb_id, "tt0111161");
        assert_eq!(info.imdb_rating, "9.3");
        assert_eq!(info.kind, "movie");
        assert!(info.plot.is_empty());
        assert!(info.is_present());
    }

    #[test]
    fn test_default_records_are_absent() {
        assert!(!MovieInfo::default().is_present());
        assert!(Search::default().query.is_none());
    }

    #[test]
    fn test_query_key_ignores_case_and_padding() {
        assert_eq!(query_key("  Batman "), "batman");
        assert_eq!(query_key(""), "");
    }

    #[test]
    fn test_imdb_key_ignores_case_and_padding() {
        assert_eq!(imdb_key(" TT0111161"), "tt0111161");
    }
}
