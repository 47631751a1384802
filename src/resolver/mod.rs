use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{SeasonDetail, SeriesCatalog, SeriesRecord, TitleCatalog, TitleRecord};
use crate::error::ImportError;
use crate::tokens;

/// Upper bound on entries recovered through the title catalog, and on title
/// search results kept per query.
pub const MAX_EXTRA_RESULTS: usize = 10;

/// Title catalog tags that denote a series.
pub const SERIES_TYPE_TAGS: &[&str] = &["TV Series", "TV Mini-Series"];

/// Title catalog tags accepted for movies, besides untyped feature films.
pub const MOVIE_TYPE_TAGS: &[&str] = &["Video", "TV Movie"];

/// Which title types a title lookup keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TitleScope {
    Movie,
    Any,
}

impl TitleScope {
    pub fn allows(&self, type_tag: Option<&str>) -> bool {
        match self {
            TitleScope::Any => true,
            TitleScope::Movie => type_tag.is_none_or(|tag| MOVIE_TYPE_TAGS.contains(&tag)),
        }
    }
}

/// Genre constraint. `!x` keeps items without genre `x`, anything else keeps
/// items with it. Comparison ignores case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreFilter {
    Include(String),
    Exclude(String),
}

impl GenreFilter {
    /// `None` for an empty filter.
    pub fn parse(filter: &str) -> Option<Self> {
        match filter.strip_prefix('!') {
            Some("") => None,
            Some(genre) => Some(GenreFilter::Exclude(genre.to_lowercase())),
            None if filter.is_empty() => None,
            None => Some(GenreFilter::Include(filter.to_lowercase())),
        }
    }

    pub fn keeps(&self, genres: &[String]) -> bool {
        let has = |wanted: &str| genres.iter().any(|g| g.to_lowercase() == wanted);
        match self {
            GenreFilter::Include(genre) => has(genre),
            GenreFilter::Exclude(genre) => !has(genre),
        }
    }
}

/// Keep the series that pass `filter`.
pub fn filter_series(series: Vec<SeriesRecord>, filter: &str) -> Vec<SeriesRecord> {
    match GenreFilter::parse(filter) {
        Some(genre_filter) => series
            .into_iter()
            .filter(|s| genre_filter.keeps(&s.genres))
            .collect(),
        None => series,
    }
}

/// Normalized query plus genre filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub genre: Option<String>,
}

impl CacheKey {
    pub fn new(title: &str, genre: Option<&str>) -> Self {
        Self {
            query: tokens::comparable(title),
            genre: genre.map(str::to_string),
        }
    }
}

/// Lookup results for one importer session. Never invalidated.
#[derive(Debug, Default)]
pub struct MetadataCache {
    series: HashMap<CacheKey, Vec<SeriesRecord>>,
    titles: HashMap<(TitleScope, CacheKey), Vec<TitleRecord>>,
    seasons: HashMap<u32, SeasonDetail>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.series.len() + self.titles.len() + self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remote catalog queries with per-session caching.
///
/// Search failures degrade to an empty candidate list and are not cached, so a
/// later file in the same run gets another chance.
pub struct MetadataResolver {
    series_catalog: Arc<dyn SeriesCatalog>,
    title_catalog: Arc<dyn TitleCatalog>,
    cache: MetadataCache,
    series_limit: usize,
}

impl MetadataResolver {
    pub fn new(
        series_catalog: Arc<dyn SeriesCatalog>,
        title_catalog: Arc<dyn TitleCatalog>,
        cache: MetadataCache,
        series_limit: usize,
    ) -> Self {
        Self {
            series_catalog,
            title_catalog,
            cache,
            series_limit,
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Series matching `title`, from the series search plus any series-typed
    /// title catalog hits the series search missed.
    pub async fn lookup_series(&mut self, title: &str, genre: Option<&str>) -> Vec<SeriesRecord> {
        let key = CacheKey::new(title, genre);
        if let Some(cached) = self.cache.series.get(&key) {
            debug!("Series cache hit for {:?}", key);
            return cached.clone();
        }

        let query = tokens::joined(title);
        let mut complete = true;

        let mut results = match self
            .series_catalog
            .search_by_title(&query, self.series_limit)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!("⚠️ Series search for '{}' failed: {:#}", query, e);
                complete = false;
                Vec::new()
            }
        };

        match self.title_catalog.search_by_title(&query).await {
            Ok(titles) => self.append_series_from_titles(&mut results, titles).await,
            Err(e) => {
                warn!("⚠️ Title search for series '{}' failed: {:#}", query, e);
                complete = false;
            }
        }

        let results = match genre {
            Some(filter) => filter_series(results, filter),
            None => results,
        };

        info!("📺 {} series match '{}'", results.len(), query);
        if complete {
            self.cache.series.insert(key, results.clone());
        }
        results
    }

    async fn append_series_from_titles(
        &self,
        results: &mut Vec<SeriesRecord>,
        titles: Vec<TitleRecord>,
    ) {
        let mut seen: HashSet<u32> = results.iter().map(|s| s.id).collect();
        let mut looked_up: HashSet<String> = HashSet::new();
        let mut added = 0;

        for title in titles {
            if added >= MAX_EXTRA_RESULTS {
                break;
            }
            let is_series = title
                .type_tag
                .as_deref()
                .is_some_and(|tag| SERIES_TYPE_TAGS.contains(&tag));
            if !is_series || !looked_up.insert(title.id.clone()) {
                continue;
            }

            match self.series_catalog.lookup_by_external_id(&title.id).await {
                Ok(Some(series)) => {
                    if seen.insert(series.id) {
                        debug!("Recovered series '{}' via {}", series.name, title.id);
                        results.push(series);
                        added += 1;
                    }
                }
                Ok(None) => debug!("No series known for {}", title.id),
                Err(e) => debug!("Series lookup for {} failed: {:#}", title.id, e),
            }
        }
    }

    /// Titles matching `title` within `scope`, deduplicated and capped. With a
    /// genre filter, each title's genres are fetched before filtering.
    pub async fn lookup_titles(
        &mut self,
        title: &str,
        scope: TitleScope,
        genre: Option<&str>,
    ) -> Vec<TitleRecord> {
        let key = (scope, CacheKey::new(title, genre));
        if let Some(cached) = self.cache.titles.get(&key) {
            debug!("Title cache hit for {:?}", key);
            return cached.clone();
        }

        let query = tokens::joined(title);
        let found = match self.title_catalog.search_by_title(&query).await {
            Ok(found) => found,
            Err(e) => {
                warn!("⚠️ Title search for '{}' failed: {:#}", query, e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let candidates: Vec<TitleRecord> = found
            .into_iter()
            .filter(|t| scope.allows(t.type_tag.as_deref()))
            .filter(|t| seen.insert(t.id.clone()))
            .take(MAX_EXTRA_RESULTS)
            .collect();

        let results = match genre.and_then(GenreFilter::parse) {
            Some(filter) => self.filter_titles_by_genre(candidates, &filter).await,
            None => candidates,
        };

        info!("🎬 {} titles match '{}'", results.len(), query);
        self.cache.titles.insert(key, results.clone());
        results
    }

    async fn filter_titles_by_genre(
        &self,
        titles: Vec<TitleRecord>,
        filter: &GenreFilter,
    ) -> Vec<TitleRecord> {
        let mut kept = Vec::new();
        for title in titles {
            match self.title_catalog.fetch_genres(&title.id).await {
                Ok(genres) if filter.keeps(&genres) => kept.push(title),
                Ok(_) => {}
                Err(e) => debug!("Skipping {}: genre lookup failed: {:#}", title.id, e),
            }
        }
        kept
    }

    /// Season and episode listing of a series, fetched once per session.
    pub async fn season_detail(&mut self, series_id: u32) -> Result<&SeasonDetail, ImportError> {
        if !self.cache.seasons.contains_key(&series_id) {
            let detail = self
                .series_catalog
                .fetch_season_detail(series_id)
                .await
                .map_err(|e| ImportError::Catalog(format!("{e:#}")))?;
            self.cache.seasons.insert(series_id, detail);
        }
        Ok(&self.cache.seasons[&series_id])
    }

    /// Catalog title of one episode. `Ok(None)` when the episode is listed
    /// without a title.
    pub async fn episode_title(
        &mut self,
        series: &SeriesRecord,
        season: u32,
        episode: u32,
    ) -> Result<Option<String>, ImportError> {
        let detail = self.season_detail(series.id).await?;
        let episodes = detail.get(&season).ok_or_else(|| ImportError::MissingSeason {
            series: series.name.clone(),
            season,
        })?;
        let name = episodes
            .get(&episode)
            .ok_or_else(|| ImportError::MissingEpisode {
                series: series.name.clone(),
                season,
                episode,
            })?;

        Ok(Some(name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{
        episodes, series, title, FakeSeriesCatalog, FakeTitleCatalog,
    };
    use std::sync::atomic::Ordering;

    fn resolver(series_catalog: FakeSeriesCatalog, title_catalog: FakeTitleCatalog) -> MetadataResolver {
        MetadataResolver::new(
            Arc::new(series_catalog),
            Arc::new(title_catalog),
            MetadataCache::new(),
            5,
        )
    }

    #[test]
    fn test_negated_genre_filter() {
        let input = vec![
            series(1, "Planet Earth", &["Documentary"]),
            series(2, "The Wire", &["Drama"]),
        ];
        let kept = filter_series(input, "!documentary");
        assert_eq!(kept, vec![series(2, "The Wire", &["Drama"])]);
    }

    #[test]
    fn test_positive_genre_filter_ignores_case() {
        let input = vec![
            series(1, "Planet Earth", &["DOCUMENTARY", "Nature"]),
            series(2, "The Wire", &["Drama"]),
        ];
        let kept = filter_series(input, "Documentary");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);
    }

    #[test]
    fn test_empty_genre_filter_keeps_everything() {
        assert_eq!(GenreFilter::parse(""), None);
        assert_eq!(GenreFilter::parse("!"), None);
        let input = vec![series(1, "A", &[]), series(2, "B", &["Drama"])];
        assert_eq!(filter_series(input.clone(), "").len(), 2);
    }

    #[test]
    fn test_title_scope() {
        assert!(TitleScope::Movie.allows(None));
        assert!(TitleScope::Movie.allows(Some("TV Movie")));
        assert!(TitleScope::Movie.allows(Some("Video")));
        assert!(!TitleScope::Movie.allows(Some("TV Series")));
        assert!(TitleScope::Any.allows(Some("TV Episode")));
    }

    #[tokio::test]
    async fn test_series_lookup_recovers_missing_series() {
        let series_catalog = FakeSeriesCatalog {
            search_results: vec![series(1, "The Office", &["Comedy"])],
            by_external_id: HashMap::from([
                ("tt0386676".to_string(), series(1, "The Office", &["Comedy"])),
                ("tt0290978".to_string(), series(2, "The Office (UK)", &["Comedy"])),
            ]),
            ..Default::default()
        };
        let title_catalog = FakeTitleCatalog {
            search_results: vec![
                title("tt0386676", "The Office", Some(2005), Some("TV Series")),
                title("tt0290978", "The Office", Some(2001), Some("TV Mini-Series")),
                title("tt9999999", "The Office", Some(2020), None),
            ],
            ..Default::default()
        };
        let mut resolver = resolver(series_catalog, title_catalog);

        let results = resolver.lookup_series("the.office", None).await;
        let ids: Vec<u32> = results.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_series_recovery_is_capped() {
        let by_external_id: HashMap<String, SeriesRecord> = (0..15)
            .map(|i| (format!("tt{i}"), series(100 + i, "Show", &[])))
            .collect();
        let titles = (0..15)
            .map(|i| title(&format!("tt{i}"), "Show", None, Some("TV Series")))
            .collect();
        let mut resolver = resolver(
            FakeSeriesCatalog {
                by_external_id,
                ..Default::default()
            },
            FakeTitleCatalog {
                search_results: titles,
                ..Default::default()
            },
        );

        let results = resolver.lookup_series("show", None).await;
        assert_eq!(results.len(), MAX_EXTRA_RESULTS);
    }

    #[tokio::test]
    async fn test_series_lookup_is_cached_per_query_and_genre() {
        let search_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let series_catalog = FakeSeriesCatalog {
            search_results: vec![
                series(1, "Planet Earth", &["Documentary"]),
                series(2, "Earth", &["Drama"]),
            ],
            search_calls: search_calls.clone(),
            ..Default::default()
        };
        let mut resolver = resolver(series_catalog, FakeTitleCatalog::default());

        let first = resolver.lookup_series("Planet Earth", Some("documentary")).await;
        let second = resolver.lookup_series("planet.earth", Some("documentary")).await;
        assert_eq!(first, second);
        assert_eq!(search_calls.load(Ordering::SeqCst), 1);

        let other_genre = resolver.lookup_series("planet earth", Some("!documentary")).await;
        assert_eq!(other_genre.len(), 1);
        assert_eq!(other_genre[0].id, 2);
        assert_eq!(search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_series_search_degrades_and_is_not_cached() {
        let search_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let series_catalog = FakeSeriesCatalog {
            fail_search: true,
            search_calls: search_calls.clone(),
            ..Default::default()
        };
        let mut resolver = resolver(series_catalog, FakeTitleCatalog::default());

        assert!(resolver.lookup_series("the wire", None).await.is_empty());
        assert!(resolver.lookup_series("the wire", None).await.is_empty());
        assert_eq!(search_calls.load(Ordering::SeqCst), 2);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_movie_title_lookup_filters_types_and_duplicates() {
        let title_catalog = FakeTitleCatalog {
            search_results: vec![
                title("tt1", "Heat", Some(1995), None),
                title("tt1", "Heat", Some(1995), None),
                title("tt2", "Heat", Some(1972), Some("TV Movie")),
                title("tt3", "Heat", Some(2013), Some("TV Series")),
                title("tt4", "Heat Making Of", Some(1999), Some("Video")),
            ],
            ..Default::default()
        };
        let mut resolver = resolver(FakeSeriesCatalog::default(), title_catalog);

        let results = resolver.lookup_titles("heat", TitleScope::Movie, None).await;
        let ids: Vec<&str> = results.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tt1", "tt2", "tt4"]);
    }

    #[tokio::test]
    async fn test_documentary_title_lookup_fetches_genres() {
        let detail_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let title_catalog = FakeTitleCatalog {
            search_results: vec![
                title("tt1", "Cosmos", Some(1980), Some("TV Series")),
                title("tt2", "Cosmos", Some(2019), None),
                title("tt3", "Cosmos Laundromat", Some(2015), None),
            ],
            genres: HashMap::from([
                ("tt1".to_string(), vec!["Documentary".to_string()]),
                ("tt2".to_string(), vec!["Drama".to_string()]),
            ]),
            detail_calls: detail_calls.clone(),
            ..Default::default()
        };
        let mut resolver = resolver(FakeSeriesCatalog::default(), title_catalog);

        let results = resolver
            .lookup_titles("cosmos", TitleScope::Any, Some("documentary"))
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "tt1");
        assert_eq!(detail_calls.load(Ordering::SeqCst), 3);

        resolver
            .lookup_titles("Cosmos", TitleScope::Any, Some("documentary"))
            .await;
        assert_eq!(detail_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_season_detail_is_fetched_once() {
        let season_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let series_catalog = FakeSeriesCatalog {
            seasons: HashMap::from([(7, episodes(&[(1, 1, "Pilot"), (1, 2, "  ")]))]),
            season_calls: season_calls.clone(),
            ..Default::default()
        };
        let mut resolver = resolver(series_catalog, FakeTitleCatalog::default());
        let show = series(7, "Show", &[]);

        assert_eq!(
            resolver.episode_title(&show, 1, 1).await.unwrap().as_deref(),
            Some("Pilot")
        );
        assert_eq!(resolver.episode_title(&show, 1, 2).await.unwrap(), None);
        assert!(matches!(
            resolver.episode_title(&show, 2, 1).await,
            Err(ImportError::MissingSeason { season: 2, .. })
        ));
        assert!(matches!(
            resolver.episode_title(&show, 1, 9).await,
            Err(ImportError::MissingEpisode { episode: 9, .. })
        ));
        assert_eq!(season_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_season_detail_failure_is_a_catalog_error() {
        let mut resolver = resolver(FakeSeriesCatalog::default(), FakeTitleCatalog::default());
        assert!(matches!(
            resolver.season_detail(42).await,
            Err(ImportError::Catalog(_))
        ));
    }
}
