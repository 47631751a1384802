//! Merging of local and remote candidates into one ordered list.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::catalog::{SeriesRecord, TitleRecord};
use crate::classify::{Classification, MediaKind};
use crate::library::{match_entries, MediaLibrary};
use crate::resolver::{MetadataResolver, TitleScope};
use crate::tokens;

/// Genre filter applied to TV series lookups.
pub const TV_GENRE_FILTER: &str = "!documentary";

/// Genre filter applied to documentary lookups.
pub const DOCUMENTARY_GENRE_FILTER: &str = "documentary";

/// Where a candidate came from. Declaration order is the tie-break priority:
/// on equal scores, earlier sources sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CandidateSource {
    LocalTv,
    LocalDocumentary,
    LocalMovie,
    RemoteTvCatalog,
    RemoteDocumentaryCatalog,
    RemoteDocumentaryTitle,
    RemoteMovieTitle,
}

impl CandidateSource {
    pub const ALL: [CandidateSource; 7] = [
        CandidateSource::LocalTv,
        CandidateSource::LocalDocumentary,
        CandidateSource::LocalMovie,
        CandidateSource::RemoteTvCatalog,
        CandidateSource::RemoteDocumentaryCatalog,
        CandidateSource::RemoteDocumentaryTitle,
        CandidateSource::RemoteMovieTitle,
    ];

    /// Media kind whose library root a candidate from this source goes to.
    pub fn kind(&self) -> MediaKind {
        match self {
            CandidateSource::LocalTv | CandidateSource::RemoteTvCatalog => MediaKind::TvShow,
            CandidateSource::LocalDocumentary
            | CandidateSource::RemoteDocumentaryCatalog
            | CandidateSource::RemoteDocumentaryTitle => MediaKind::Documentary,
            CandidateSource::LocalMovie | CandidateSource::RemoteMovieTitle => MediaKind::Movie,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CandidateSource::LocalTv => "Local TV shows",
            CandidateSource::LocalDocumentary => "Local documentaries",
            CandidateSource::LocalMovie => "Local movies",
            CandidateSource::RemoteTvCatalog => "TV series catalog",
            CandidateSource::RemoteDocumentaryCatalog => "Documentary series catalog",
            CandidateSource::RemoteDocumentaryTitle => "Documentary titles",
            CandidateSource::RemoteMovieTitle => "Movie titles",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a candidate refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CandidatePayload {
    Series(SeriesRecord),
    Title(TitleRecord),
    Local(String),
}

impl CandidatePayload {
    pub fn label(&self) -> &'static str {
        match self {
            CandidatePayload::Series(_) => "series record",
            CandidatePayload::Title(_) => "title record",
            CandidatePayload::Local(_) => "local name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub display_name: String,
    /// Edit distance to the classified title. Lower is better.
    pub score: usize,
    pub source: CandidateSource,
    pub payload: CandidatePayload,
    /// Index into the classifications of the file, whose fields back the
    /// destination path of this candidate.
    pub classification: usize,
}

impl ScoredCandidate {
    pub fn local(source: CandidateSource, name: &str, score: usize, classification: usize) -> Self {
        Self {
            display_name: name.to_string(),
            score,
            source,
            payload: CandidatePayload::Local(name.to_string()),
            classification,
        }
    }

    pub fn series(
        source: CandidateSource,
        record: SeriesRecord,
        score: usize,
        classification: usize,
    ) -> Self {
        Self {
            display_name: record.name.clone(),
            score,
            source,
            payload: CandidatePayload::Series(record),
            classification,
        }
    }

    pub fn title(
        source: CandidateSource,
        record: TitleRecord,
        score: usize,
        classification: usize,
    ) -> Self {
        let display_name = match record.year {
            Some(year) => format!("{} ({})", record.name, year),
            None => record.name.clone(),
        };
        Self {
            display_name,
            score,
            source,
            payload: CandidatePayload::Title(record),
            classification,
        }
    }
}

/// One display section: the best entries of a single source, numbered by
/// their position in the merged list.
#[derive(Debug)]
pub struct Section<'a> {
    pub source: CandidateSource,
    pub entries: Vec<(usize, &'a ScoredCandidate)>,
}

/// All candidates of one file in global order.
#[derive(Debug, Clone, Default)]
pub struct RankedCandidates {
    merged: Vec<ScoredCandidate>,
    visible_per_source: usize,
}

impl RankedCandidates {
    /// Concatenate the per-source lists and sort by (score, source priority).
    /// Candidates equal on both keep the order of their source list, so the
    /// result does not depend on the order the lists are passed in.
    pub fn merge(lists: Vec<Vec<ScoredCandidate>>, visible_per_source: usize) -> Self {
        let mut merged: Vec<ScoredCandidate> = lists.into_iter().flatten().collect();
        merged.sort_by_key(|candidate| (candidate.score, candidate.source));
        Self {
            merged,
            visible_per_source,
        }
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn first(&self) -> Option<&ScoredCandidate> {
        self.merged.first()
    }

    /// Candidate by 1-based position in the merged list.
    pub fn get(&self, position: usize) -> Option<&ScoredCandidate> {
        position.checked_sub(1).and_then(|index| self.merged.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredCandidate> {
        self.merged.iter()
    }

    /// The first entries of every non-empty source, in source priority order.
    pub fn sections(&self) -> Vec<Section<'_>> {
        CandidateSource::ALL
            .iter()
            .filter_map(|source| {
                let entries: Vec<(usize, &ScoredCandidate)> = self
                    .merged
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| candidate.source == *source)
                    .take(self.visible_per_source)
                    .map(|(index, candidate)| (index + 1, candidate))
                    .collect();
                (!entries.is_empty()).then_some(Section {
                    source: *source,
                    entries,
                })
            })
            .collect()
    }
}

/// Gathers candidates for every classification of a file.
pub struct CandidateRanker {
    visible_per_source: usize,
}

impl CandidateRanker {
    pub fn new(visible_per_source: usize) -> Self {
        Self { visible_per_source }
    }

    pub async fn rank(
        &self,
        classifications: &[Classification],
        library: &MediaLibrary,
        resolver: &mut MetadataResolver,
    ) -> RankedCandidates {
        let mut lists = Vec::new();

        for (index, classification) in classifications.iter().enumerate() {
            let fields = &classification.fields;
            let title = fields.title();
            let title_with_year = fields.title_with_year();

            match classification.kind {
                MediaKind::TvShow => {
                    lists.push(local_candidates(
                        library,
                        CandidateSource::LocalTv,
                        &title,
                        index,
                    ));
                    let series = resolver.lookup_series(&title, Some(TV_GENRE_FILTER)).await;
                    lists.push(score_series(
                        series,
                        CandidateSource::RemoteTvCatalog,
                        &title_with_year,
                        index,
                    ));
                }
                MediaKind::Documentary => {
                    lists.push(local_candidates(
                        library,
                        CandidateSource::LocalDocumentary,
                        &title,
                        index,
                    ));
                    if fields.has_numeric_episode() {
                        let series = resolver
                            .lookup_series(&title, Some(DOCUMENTARY_GENRE_FILTER))
                            .await;
                        lists.push(score_series(
                            series,
                            CandidateSource::RemoteDocumentaryCatalog,
                            &title_with_year,
                            index,
                        ));
                    }
                    let titles = resolver
                        .lookup_titles(&title, TitleScope::Any, Some(DOCUMENTARY_GENRE_FILTER))
                        .await;
                    lists.push(score_titles(
                        titles,
                        CandidateSource::RemoteDocumentaryTitle,
                        &title_with_year,
                        index,
                    ));
                }
                MediaKind::Movie => {
                    let titles = resolver.lookup_titles(&title, TitleScope::Movie, None).await;
                    lists.push(score_titles(
                        titles,
                        CandidateSource::RemoteMovieTitle,
                        &title_with_year,
                        index,
                    ));
                }
            }
        }

        let ranked = RankedCandidates::merge(lists, self.visible_per_source);
        info!("🔎 {} candidates ranked", ranked.len());
        ranked
    }
}

fn local_candidates(
    library: &MediaLibrary,
    source: CandidateSource,
    title: &str,
    classification: usize,
) -> Vec<ScoredCandidate> {
    let snapshot = library.snapshot(source.kind());
    let matches = match_entries(&snapshot.dirs, title);
    debug!("{} local entries compared for {}", matches.len(), source);
    matches
        .into_iter()
        .map(|m| ScoredCandidate::local(source, &m.name, m.distance, classification))
        .collect()
}

fn score_series(
    series: Vec<SeriesRecord>,
    source: CandidateSource,
    title_with_year: &str,
    classification: usize,
) -> Vec<ScoredCandidate> {
    series
        .into_iter()
        .map(|record| {
            let score = tokens::distance(title_with_year, &record.name);
            ScoredCandidate::series(source, record, score, classification)
        })
        .collect()
}

fn score_titles(
    titles: Vec<TitleRecord>,
    source: CandidateSource,
    title_with_year: &str,
    classification: usize,
) -> Vec<ScoredCandidate> {
    titles
        .into_iter()
        .map(|record| {
            let score = tokens::distance(title_with_year, &record.name_with_year());
            ScoredCandidate::title(source, record, score, classification)
        })
        .collect()
}
