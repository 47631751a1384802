//! Remote metadata catalogs.
//!
//! The importer talks to two kinds of catalog: a series catalog (series
//! search, external id lookup, episode listings) and a general title catalog
//! (title search, genre details). Both are traits so the resolver can be
//! driven by in-memory fakes in tests and by [`OfflineCatalog`] when the
//! network should not be used at all.

pub mod omdb;
pub mod tvmaze;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use omdb::OmdbClient;
pub use tvmaze::TvMazeClient;

/// A series as known to the series catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: u32,
    pub name: String,
    pub genres: Vec<String>,
}

/// A title (movie, series, video...) as known to the title catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: String,
    pub name: String,
    pub year: Option<u16>,
    /// `None` for plain feature films, otherwise e.g. `TV Series`, `Video`.
    pub type_tag: Option<String>,
}

impl TitleRecord {
    /// Name suffixed with the year when the catalog knows it.
    pub fn name_with_year(&self) -> String {
        match self.year {
            Some(year) => format!("{} {}", self.name, year),
            None => self.name.clone(),
        }
    }
}

/// Episode titles of one series, keyed by season then episode number.
pub type SeasonDetail = BTreeMap<u32, BTreeMap<u32, String>>;

#[async_trait]
pub trait SeriesCatalog: Send + Sync {
    async fn search_by_title(&self, title: &str, limit: usize) -> Result<Vec<SeriesRecord>>;

    /// Resolve an id from the title catalog (an IMDb id) to a series.
    async fn lookup_by_external_id(&self, external_id: &str) -> Result<Option<SeriesRecord>>;

    async fn fetch_season_detail(&self, series_id: u32) -> Result<SeasonDetail>;
}

#[async_trait]
pub trait TitleCatalog: Send + Sync {
    async fn search_by_title(&self, title: &str) -> Result<Vec<TitleRecord>>;

    /// Genres of a single title. Search results do not carry them.
    async fn fetch_genres(&self, id: &str) -> Result<Vec<String>>;
}

/// Catalog that knows nothing. Used when running without network access.
#[derive(Debug, Clone, Default)]
pub struct OfflineCatalog;

#[async_trait]
impl SeriesCatalog for OfflineCatalog {
    async fn search_by_title(&self, _title: &str, _limit: usize) -> Result<Vec<SeriesRecord>> {
        Ok(Vec::new())
    }

    async fn lookup_by_external_id(&self, _external_id: &str) -> Result<Option<SeriesRecord>> {
        Ok(None)
    }

    async fn fetch_season_detail(&self, _series_id: u32) -> Result<SeasonDetail> {
        Ok(SeasonDetail::new())
    }
}

#[async_trait]
impl TitleCatalog for OfflineCatalog {
    async fn search_by_title(&self, _title: &str) -> Result<Vec<TitleRecord>> {
        Ok(Vec::new())
    }

    async fn fetch_genres(&self, _id: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
