//! In-memory catalogs for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{SeasonDetail, SeriesCatalog, SeriesRecord, TitleCatalog, TitleRecord};

pub fn series(id: u32, name: &str, genres: &[&str]) -> SeriesRecord {
    SeriesRecord {
        id,
        name: name.to_string(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

pub fn title(id: &str, name: &str, year: Option<u16>, type_tag: Option<&str>) -> TitleRecord {
    TitleRecord {
        id: id.to_string(),
        name: name.to_string(),
        year,
        type_tag: type_tag.map(str::to_string),
    }
}

#[derive(Default)]
pub struct FakeSeriesCatalog {
    pub search_results: Vec<SeriesRecord>,
    pub by_external_id: HashMap<String, SeriesRecord>,
    pub seasons: HashMap<u32, SeasonDetail>,
    pub fail_search: bool,
    pub search_calls: Arc<AtomicUsize>,
    pub season_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SeriesCatalog for FakeSeriesCatalog {
    async fn search_by_title(&self, _title: &str, limit: usize) -> Result<Vec<SeriesRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(anyhow!("series search unavailable"));
        }
        Ok(self.search_results.iter().take(limit).cloned().collect())
    }

    async fn lookup_by_external_id(&self, external_id: &str) -> Result<Option<SeriesRecord>> {
        Ok(self.by_external_id.get(external_id).cloned())
    }

    async fn fetch_season_detail(&self, series_id: u32) -> Result<SeasonDetail> {
        self.season_calls.fetch_add(1, Ordering::SeqCst);
        self.seasons
            .get(&series_id)
            .cloned()
            .ok_or_else(|| anyhow!("no episodes for series {}", series_id))
    }
}

#[derive(Default)]
pub struct FakeTitleCatalog {
    pub search_results: Vec<TitleRecord>,
    pub genres: HashMap<String, Vec<String>>,
    pub fail_search: bool,
    pub search_calls: Arc<AtomicUsize>,
    pub detail_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TitleCatalog for FakeTitleCatalog {
    async fn search_by_title(&self, _title: &str) -> Result<Vec<TitleRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(anyhow!("title search unavailable"));
        }
        Ok(self.search_results.clone())
    }

    async fn fetch_genres(&self, id: &str) -> Result<Vec<String>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.genres
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("no detail for {}", id))
    }
}

/// Season detail from `(season, episode, title)` triples.
pub fn episodes(entries: &[(u32, u32, &str)]) -> SeasonDetail {
    let mut detail = SeasonDetail::new();
    for (season, episode, name) in entries {
        detail
            .entry(*season)
            .or_default()
            .insert(*episode, name.to_string());
    }
    detail
}
