use axum::{
    extract::RawQuery,
    response::Response,
    routing::{get, post},
    Router,
};
use http::{header, HeaderMap, HeaderValue, StatusCode};
use marquee_dal::movie::{CreateMovie, MovieRepository, UpdateMovie};
use marquee_types::Validator;

use super::{method_not_allowed, paging::Filters, RecordId};
use crate::{
    decode::{StrictInput, StrictJson},
    envelope::{write_json, Envelope},
    error::{ApiError, ApiResult},
    query::QueryParams,
    repository_from_request,
    state::AppState,
};

repository_from_request!(MovieRepository);

impl StrictInput for CreateMovie {
    const FIELDS: &'static [&'static str] = CreateMovie::FIELDS;
}

impl StrictInput for UpdateMovie {
    const FIELDS: &'static [&'static str] = UpdateMovie::FIELDS;
}

pub async fn create(
    repository: MovieRepository,
    StrictJson(payload): StrictJson<CreateMovie>,
) -> ApiResult<Response> {
    let new_movie = payload.validate()?;
    let movie = repository.create(&new_movie).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/v1/movies/{}", movie.id))
        .map_err(|e| ApiError::Internal(e.into()))?;
    headers.insert(header::LOCATION, location);
    Ok(write_json(
        &Envelope::single("movie", &movie)?,
        StatusCode::CREATED,
        headers,
    )?)
}

pub async fn show(RecordId(id): RecordId, repository: MovieRepository) -> ApiResult<Response> {
    let movie = repository.get(id).await?;
    Ok(write_json(
        &Envelope::single("movie", &movie)?,
        StatusCode::OK,
        HeaderMap::new(),
    )?)
}

pub async fn update(
    RecordId(id): RecordId,
    repository: MovieRepository,
    StrictJson(changes): StrictJson<UpdateMovie>,
) -> ApiResult<Response> {
    let mut movie = repository.get(id).await?;
    changes.apply_to(&mut movie);
    movie.validate()?;
    let movie = repository.update(&movie).await?;
    Ok(write_json(
        &Envelope::single("movie", &movie)?,
        StatusCode::OK,
        HeaderMap::new(),
    )?)
}

pub async fn delete(RecordId(id): RecordId, repository: MovieRepository) -> ApiResult<Response> {
    repository.delete(id).await?;
    Ok(write_json(
        &Envelope::single("message", "movie successfully deleted")?,
        StatusCode::OK,
        HeaderMap::new(),
    )?)
}

pub async fn list(
    repository: MovieRepository,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let query = QueryParams::parse(query.as_deref());
    let mut v = Validator::new();
    let title = query.read_string("title", "");
    let genres = query.read_csv("genres", Vec::new());
    let filters = Filters::read(&query, &mut v);
    filters.validate(&mut v);
    v.into_result()?;

    let movies = repository.list(&title, &genres).await?;
    Ok(write_json(
        &Envelope::single("movies", &movies)?,
        StatusCode::OK,
        HeaderMap::new(),
    )?)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", get(show).patch(update).delete(delete))
        .method_not_allowed_fallback(method_not_allowed)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::extract::Request;
    use marquee_types::config::DbConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::AppConfig;

    async fn test_router() -> Router {
        let mut db = DbConfig::with_url("sqlite::memory:");
        db.max_open_conns = 1;
        let pool = marquee_dal::new_pool(&db).await.unwrap();
        marquee_dal::migrate(&pool).await.unwrap();
        let config = AppConfig {
            environment: "development".to_string(),
            version: "test".to_string(),
            max_body_bytes: 1024,
            query_timeout: Duration::from_secs(3),
        };
        Router::new()
            .nest("/v1/movies", router())
            .with_state(AppState::new(config, pool))
    }

    fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(body.into())
            .unwrap()
    }

    async fn call(router: &Router, req: Request) -> (StatusCode, HeaderMap, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    const MOVIE: &str =
        r#"{"title": "Moana", "year": 2016, "runtime": 107, "genres": ["animation", "adventure"]}"#;

    #[tokio::test]
    async fn test_create_and_show() {
        let router = test_router().await;
        let (status, headers, body) = call(&router, request("POST", "/v1/movies", MOVIE)).await;
        assert_eq!(StatusCode::CREATED, status);
        assert_eq!("/v1/movies/1", headers.get(header::LOCATION).unwrap());
        assert_eq!("application/json", headers.get(header::CONTENT_TYPE).unwrap());
        assert_eq!(
            json!({"movie": {
                "id": 1,
                "title": "Moana",
                "year": 2016,
                "runtime": "107 mins",
                "genres": ["animation", "adventure"],
                "version": 1
            }}),
            body
        );

        let (status, _, shown) = call(&router, request("GET", "/v1/movies/1", Body::empty())).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(body, shown);
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let router = test_router().await;

        let (status, _, body) = call(&router, request("POST", "/v1/movies", r#"{"title": ""}"#)).await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!(
            json!({"error": {
                "title": "must be provided",
                "year": "must be provided",
                "runtime": "must be provided",
                "genres": "must be provided"
            }}),
            body
        );

        let (status, _, body) = call(&router, request("POST", "/v1/movies", "null")).await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!(4, body["error"].as_object().unwrap().len());
        assert_eq!("must be provided", body["error"]["title"]);

        let (status, _, body) = call(
            &router,
            request(
                "POST",
                "/v1/movies",
                r#"{"title": null, "year": 2016, "runtime": 107, "genres": ["animation"]}"#,
            ),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!(json!({"error": {"title": "must be provided"}}), body);

        let (status, _, body) =
            call(&router, request("POST", "/v1/movies", r#"{"title": "x", "rating": 5}"#)).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(json!({"error": "body contains unknown key \"rating\""}), body);

        let (status, _, body) = call(&router, request("POST", "/v1/movies", Body::empty())).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(json!({"error": "body must not be empty"}), body);

        let large = format!(r#"{{"title": "{}"}}"#, "x".repeat(2048));
        let (status, _, body) = call(&router, request("POST", "/v1/movies", large)).await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!(json!({"error": "body must not be larger than 1024 bytes"}), body);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let router = test_router().await;
        call(&router, request("POST", "/v1/movies", MOVIE)).await;

        let (status, _, body) = call(
            &router,
            request("PATCH", "/v1/movies/1", r#"{"year": 2017, "runtime": 110}"#),
        )
        .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(2017, body["movie"]["year"]);
        assert_eq!("110 mins", body["movie"]["runtime"]);
        assert_eq!("Moana", body["movie"]["title"]);
        assert_eq!(2, body["movie"]["version"]);

        let (status, _, body) =
            call(&router, request("PATCH", "/v1/movies/1", r#"{"genres": []}"#)).await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!(
            json!({"error": {"genres": "must contain at least 1 genre"}}),
            body
        );

        let (status, _, body) =
            call(&router, request("DELETE", "/v1/movies/1", Body::empty())).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!({"message": "movie successfully deleted"}), body);

        let (status, _, _) = call(&router, request("DELETE", "/v1/movies/1", Body::empty())).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        let (status, _, _) =
            call(&router, request("PATCH", "/v1/movies/1", r#"{"year": 2000}"#)).await;
        assert_eq!(StatusCode::NOT_FOUND, status);
    }

    #[tokio::test]
    async fn test_invalid_id_and_method() {
        let router = test_router().await;
        for uri in ["/v1/movies/0", "/v1/movies/-3", "/v1/movies/abc"] {
            let (status, _, body) = call(&router, request("GET", uri, Body::empty())).await;
            assert_eq!(StatusCode::NOT_FOUND, status, "{uri}");
            assert_eq!(
                json!({"error": "the requested resource could not be found"}),
                body
            );
        }

        let (status, _, body) = call(&router, request("PUT", "/v1/movies/1", MOVIE)).await;
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED, status);
        assert_eq!(
            json!({"error": "the PUT method is not supported for this resource"}),
            body
        );
    }

    #[tokio::test]
    async fn test_list() {
        let router = test_router().await;
        call(&router, request("POST", "/v1/movies", MOVIE)).await;
        call(
            &router,
            request(
                "POST",
                "/v1/movies",
                r#"{"title": "Black Panther", "year": 2018, "runtime": 134, "genres": ["action", "adventure"]}"#,
            ),
        )
        .await;

        let (status, _, body) = call(&router, request("GET", "/v1/movies", Body::empty())).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(2, body["movies"].as_array().unwrap().len());

        let (_, _, body) = call(
            &router,
            request("GET", "/v1/movies?title=panther&genres=adventure", Body::empty()),
        )
        .await;
        let movies = body["movies"].as_array().unwrap();
        assert_eq!(1, movies.len());
        assert_eq!("Black Panther", movies[0]["title"]);

        let (_, _, body) =
            call(&router, request("GET", "/v1/movies?genres=western", Body::empty())).await;
        assert_eq!(json!({"movies": []}), body);

        let (status, _, body) = call(
            &router,
            request("GET", "/v1/movies?page=abc&page_size=1000&sort=foo", Body::empty()),
        )
        .await;
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!(
            json!({"error": {
                "page": "must be an integer",
                "page_size": "must be a maximum of 100",
                "sort": "invalid sort value"
            }}),
            body
        );
    }
}
