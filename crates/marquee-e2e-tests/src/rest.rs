use anyhow::{Result, anyhow};
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tracing::info;

pub async fn create_movie(
    client: &reqwest::Client,
    base_url: &Url,
    title: &str,
    year: i32,
    runtime: i32,
    genres: &[&str],
) -> Result<Value> {
    let payload = json!({"title": title, "year": year, "runtime": runtime, "genres": genres});
    let api_url = base_url.join("v1/movies")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Create movie response: {:#?}", response);
    if response.status() != StatusCode::CREATED {
        return Err(anyhow!("Unexpected status {}", response.status()));
    }

    let mut body: Value = response.json().await?;
    Ok(body["movie"].take())
}

pub async fn list_movies(client: &reqwest::Client, base_url: &Url, query: &str) -> Result<Vec<Value>> {
    let mut api_url = base_url.join("v1/movies")?;
    api_url.set_query(Some(query));
    let response = client.get(api_url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("Unexpected status {}", response.status()));
    }
    let body: Value = response.json().await?;
    body["movies"]
        .as_array()
        .cloned()
        .ok_or_else(|| anyhow!("Missing movies in response"))
}
