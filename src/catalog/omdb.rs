//! OMDb API client used as the general title catalog.
//!
//! OMDb indexes IMDb titles. Its `Type` values are mapped onto the IMDb-style
//! tags the resolver filters on: feature films are untyped.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::{TitleCatalog, TitleRecord};

pub const DEFAULT_OMDB_URL: &str = "https://www.omdbapi.com";

pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbSearchResponse {
    #[serde(default)]
    search: Vec<OmdbSearchItem>,
    response: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearchItem {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbDetailResponse {
    genre: Option<String>,
    response: String,
    error: Option<String>,
}

/// OMDb answers "not found" with a successful HTTP status and this error.
const NOT_FOUND_ERROR: &str = "Movie not found!";

fn map_type(kind: Option<&str>) -> Option<String> {
    match kind? {
        "movie" => None,
        "series" => Some("TV Series".to_string()),
        "episode" => Some("TV Episode".to_string()),
        "game" => Some("Video Game".to_string()),
        other => Some(other.to_string()),
    }
}

/// First four-digit run of an OMDb year such as `2008–2013`.
fn parse_year(year: &str) -> Option<u16> {
    year.get(..4).and_then(|digits| digits.parse().ok())
}

fn parse_genres(genre: &str) -> Vec<String> {
    genre
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty() && *g != "N/A")
        .map(str::to_string)
        .collect()
}

impl From<OmdbSearchItem> for TitleRecord {
    fn from(item: OmdbSearchItem) -> Self {
        Self {
            year: item.year.as_deref().and_then(parse_year),
            type_tag: map_type(item.kind.as_deref()),
            id: item.imdb_id,
            name: item.title,
        }
    }
}

impl OmdbClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .context("Failed to query OMDb")?;

        if !response.status().is_success() {
            anyhow::bail!("OMDb request failed with status: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse OMDb response")
    }
}

#[async_trait]
impl TitleCatalog for OmdbClient {
    async fn search_by_title(&self, title: &str) -> Result<Vec<TitleRecord>> {
        info!(query = %title, "Searching OMDb for titles");

        let response: OmdbSearchResponse = self.get(&[("s", title)]).await?;
        search_records(response)
    }

    async fn fetch_genres(&self, id: &str) -> Result<Vec<String>> {
        debug!(imdb = %id, "Fetching OMDb title detail");

        let response: OmdbDetailResponse = self.get(&[("i", id)]).await?;
        if response.response != "True" {
            return Err(anyhow!(
                "OMDb detail lookup for {} failed: {}",
                id,
                response.error.unwrap_or_default()
            ));
        }

        Ok(response
            .genre
            .as_deref()
            .map(parse_genres)
            .unwrap_or_default())
    }
}

fn search_records(response: OmdbSearchResponse) -> Result<Vec<TitleRecord>> {
    if response.response != "True" {
        return match response.error.as_deref() {
            Some(NOT_FOUND_ERROR) | None => Ok(Vec::new()),
            Some(error) => Err(anyhow!("OMDb search failed: {}", error)),
        };
    }

    let records: Vec<TitleRecord> = response.search.into_iter().map(Into::into).collect();
    debug!(count = records.len(), "OMDb search returned results");
    Ok(records)
}
