//! TVmaze API client used as the series catalog.
//!
//! TVmaze is free and needs no authentication. Base URL: https://api.tvmaze.com

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use super::{SeasonDetail, SeriesCatalog, SeriesRecord};

pub const DEFAULT_TVMAZE_URL: &str = "https://api.tvmaze.com";

pub struct TvMazeClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TvMazeSearchResult {
    show: TvMazeShow,
}

#[derive(Debug, Deserialize)]
struct TvMazeShow {
    id: u32,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
}

impl From<TvMazeShow> for SeriesRecord {
    fn from(show: TvMazeShow) -> Self {
        Self {
            id: show.id,
            name: show.name,
            genres: show.genres,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TvMazeEpisode {
    #[serde(default)]
    name: Option<String>,
    season: u32,
    /// Specials carry no episode number.
    number: Option<u32>,
}

impl TvMazeClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn group_episodes(episodes: Vec<TvMazeEpisode>) -> SeasonDetail {
    let mut detail = SeasonDetail::new();
    for episode in episodes {
        let Some(number) = episode.number else {
            continue;
        };
        detail
            .entry(episode.season)
            .or_default()
            .insert(number, episode.name.unwrap_or_default());
    }
    detail
}

#[async_trait]
impl SeriesCatalog for TvMazeClient {
    async fn search_by_title(&self, title: &str, limit: usize) -> Result<Vec<SeriesRecord>> {
        info!(query = %title, "Searching TVmaze for shows");

        let url = format!("{}/search/shows", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", title)])
            .send()
            .await
            .context("Failed to search TVmaze")?;

        if !response.status().is_success() {
            anyhow::bail!("TVmaze search failed with status: {}", response.status());
        }

        let results: Vec<TvMazeSearchResult> = response
            .json()
            .await
            .context("Failed to parse TVmaze search results")?;

        debug!(count = results.len(), "TVmaze search returned results");
        Ok(results
            .into_iter()
            .take(limit)
            .map(|result| result.show.into())
            .collect())
    }

    async fn lookup_by_external_id(&self, external_id: &str) -> Result<Option<SeriesRecord>> {
        debug!(imdb = %external_id, "Looking up TVmaze show by IMDb id");

        let url = format!("{}/lookup/shows", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("imdb", external_id)])
            .send()
            .await
            .context("Failed to look up TVmaze show")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("TVmaze lookup failed with status: {}", response.status());
        }

        let show: TvMazeShow = response
            .json()
            .await
            .context("Failed to parse TVmaze show")?;

        Ok(Some(show.into()))
    }

    async fn fetch_season_detail(&self, series_id: u32) -> Result<SeasonDetail> {
        info!(tvmaze_id = series_id, "Fetching episodes from TVmaze");

        let url = format!("{}/shows/{}/episodes", self.base_url, series_id);
        let response = self
            .client
            .get(&url)
            .query(&[("specials", "0")])
            .send()
            .await
            .context("Failed to fetch episodes from TVmaze")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "TVmaze get episodes failed with status: {}",
                response.status()
            );
        }

        let episodes: Vec<TvMazeEpisode> = response
            .json()
            .await
            .context("Failed to parse TVmaze episodes")?;

        Ok(group_episodes(episodes))
    }
}
