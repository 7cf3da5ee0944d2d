use std::time::Duration;

use crate::{ChosenRow, DEFAULT_QUERY_TIMEOUT, Error, MAX_LIMIT, error::Result, with_timeout};
use futures::{StreamExt as _, TryStreamExt as _};
use marquee_types::{patch::null_as_default, Patch, Runtime, ValidationErrors, Validator};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row};
use tracing::debug;

pub const MIN_YEAR: i32 = 1888;
pub const MAX_TITLE_BYTES: usize = 500;
pub const MAX_GENRES: usize = 5;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: time::PrimitiveDateTime,
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
    pub version: i32,
}

impl sqlx::FromRow<'_, ChosenRow> for Movie {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let genres: String = row.try_get("genres")?;
        let genres =
            serde_json::from_str(&genres).map_err(|e| sqlx::Error::ColumnDecode {
                index: "genres".to_string(),
                source: Box::new(e),
            })?;
        Ok(Movie {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            runtime: Runtime(row.try_get("runtime")?),
            genres,
            version: row.try_get("version")?,
        })
    }
}

impl Movie {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        validate_movie(&mut v, self);
        v.into_result()
    }
}

/// Payload of movie creation, missing or `null` fields take zero values and are caught by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateMovie {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub runtime: Runtime,
    pub genres: Option<Vec<String>>,
}

impl CreateMovie {
    pub const FIELDS: &'static [&'static str] = &["title", "year", "runtime", "genres"];

    pub fn validate(self) -> Result<NewMovie, ValidationErrors> {
        let mut v = Validator::new();
        validate_movie(&mut v, &self);
        v.into_result()?;
        Ok(NewMovie {
            title: self.title,
            year: self.year,
            runtime: self.runtime,
            genres: self.genres.unwrap_or_default(),
        })
    }
}

/// Validated movie, not stored yet.
#[derive(Debug, Clone)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
}

/// Partial update, only fields present in the payload are changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMovie {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub year: Patch<i32>,
    #[serde(default)]
    pub runtime: Patch<Runtime>,
    #[serde(default)]
    pub genres: Patch<Vec<String>>,
}

impl UpdateMovie {
    pub const FIELDS: &'static [&'static str] = &["title", "year", "runtime", "genres"];

    pub fn apply_to(self, movie: &mut Movie) {
        self.title.apply_to(&mut movie.title);
        self.year.apply_to(&mut movie.year);
        self.runtime.apply_to(&mut movie.runtime);
        self.genres.apply_to(&mut movie.genres);
    }
}

/// Fields subject to validation, borrowed from either a stored movie or a create payload.
#[derive(Debug, Clone, Copy)]
pub struct MovieFields<'a> {
    pub title: &'a str,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Option<&'a [String]>,
}

impl<'a> From<&'a Movie> for MovieFields<'a> {
    fn from(movie: &'a Movie) -> Self {
        MovieFields {
            title: &movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: Some(&movie.genres),
        }
    }
}

impl<'a> From<&'a CreateMovie> for MovieFields<'a> {
    fn from(movie: &'a CreateMovie) -> Self {
        MovieFields {
            title: &movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres.as_deref(),
        }
    }
}

pub fn validate_movie<'a>(v: &mut Validator, movie: impl Into<MovieFields<'a>>) {
    let current_year = time::OffsetDateTime::now_utc().year();
    validate_movie_in_year(v, movie.into(), current_year);
}

/// All rules are evaluated, for each field the first failing rule is reported.
pub fn validate_movie_in_year(v: &mut Validator, movie: MovieFields<'_>, current_year: i32) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= MAX_TITLE_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(movie.year != 0, "year", "must be provided");
    v.check(movie.year >= MIN_YEAR, "year", "must be greater than 1888");
    v.check(movie.year <= current_year, "year", "must not be in the future");

    v.check(movie.runtime.minutes() != 0, "runtime", "must be provided");
    v.check(
        movie.runtime.minutes() > 0,
        "runtime",
        "must be a positive integer",
    );

    v.check(movie.genres.is_some(), "genres", "must be provided");
    let genres = movie.genres.map(<[String]>::len).unwrap_or_default();
    v.check(genres >= 1, "genres", "must contain at least 1 genre");
    v.check(
        genres <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
}

const MOVIE_COLUMNS: &str = "id, created_at, title, year, runtime, genres, version";

pub type MovieRepository = MovieRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn create(&self, movie: &NewMovie) -> Result<Movie> {
        with_timeout(self.timeout, async {
            let genres = serde_json::to_string(&movie.genres)?;
            let result = sqlx::query(
                "INSERT INTO movies (title, year, runtime, genres, version) VALUES (?, ?, ?, ?, 1)",
            )
            .bind(&movie.title)
            .bind(movie.year)
            .bind(movie.runtime.minutes())
            .bind(genres)
            .execute(&self.executor)
            .await?;

            let id = result.last_insert_rowid();
            debug!(id, "Created movie");
            self.fetch(id).await
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        with_timeout(self.timeout, self.fetch(id)).await
    }

    /// Stores all mutable fields and bumps the version.
    pub async fn update(&self, movie: &Movie) -> Result<Movie> {
        with_timeout(self.timeout, async {
            let genres = serde_json::to_string(&movie.genres)?;
            let result = sqlx::query(
                "UPDATE movies SET title = ?, year = ?, runtime = ?, genres = ?, version = version + 1 WHERE id = ?",
            )
            .bind(&movie.title)
            .bind(movie.year)
            .bind(movie.runtime.minutes())
            .bind(genres)
            .bind(movie.id)
            .execute(&self.executor)
            .await?;

            if result.rows_affected() == 0 {
                Err(Error::RecordNotFound("Movie".to_string()))
            } else {
                debug!(id = movie.id, "Updated movie");
                self.fetch(movie.id).await
            }
        })
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        with_timeout(self.timeout, async {
            let res = sqlx::query("DELETE FROM movies WHERE id = ?")
                .bind(id)
                .execute(&self.executor)
                .await?;

            if res.rows_affected() == 0 {
                Err(Error::RecordNotFound("Movie".to_string()))
            } else {
                debug!(id, "Deleted movie");
                Ok(())
            }
        })
        .await
    }

    /// Movies whose title contains `title` (case insensitive) and which have all of `genres`.
    /// Empty filters match everything.
    pub async fn list(&self, title: &str, genres: &[String]) -> Result<Vec<Movie>> {
        with_timeout(self.timeout, async {
            let genres = serde_json::to_string(genres)?;
            let sql = format!(
                r#"
                SELECT {MOVIE_COLUMNS} FROM movies
                WHERE (? = '' OR instr(lower(title), lower(?)) > 0)
                AND NOT EXISTS (
                    SELECT 1 FROM json_each(?) AS wanted
                    WHERE wanted.value NOT IN (SELECT value FROM json_each(movies.genres))
                )
                ORDER BY id
                "#
            );
            let records = sqlx::query_as::<_, Movie>(&sql)
                .bind(title)
                .bind(title)
                .bind(genres)
                .fetch(&self.executor)
                .take(MAX_LIMIT)
                .try_collect::<Vec<_>>()
                .await?;
            Ok(records)
        })
        .await
    }

    async fn fetch(&self, id: i64) -> Result<Movie> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?");
        sqlx::query_as::<_, Movie>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Movie".to_string()))
    }
}
