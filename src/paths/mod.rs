//! Canonical library paths for a chosen candidate.
//!
//! Layouts, all with the `mkv` extension:
//!
//! | Shape   | Path                                                   |
//! |---------|--------------------------------------------------------|
//! | Episode | `root/Series/Season 01/Series S01E02 - Episode Title.mkv` |
//! | Title   | `root/Name (Year).mkv`                                 |
//! | Name    | `root/Name.mkv`                                        |
//!
//! The episode title suffix is left out when the catalog has none.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::catalog::SeriesRecord;
use crate::classify::{FieldSet, MediaKind};
use crate::config::Config;
use crate::error::ImportError;
use crate::ranking::{CandidatePayload, ScoredCandidate};
use crate::resolver::MetadataResolver;

/// Extension of every imported file.
pub const DESTINATION_EXTENSION: &str = "mkv";

/// Replacement for `/` inside a name: DIVISION SLASH, which looks the same
/// but does not split the path.
pub const SLASH_REPLACEMENT: char = '\u{2215}';

/// Characters rejected by SMB shares and FAT filesystems.
pub const RESERVED_CHARACTERS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

pub struct PathResolver {
    tv_root: PathBuf,
    documentary_root: PathBuf,
    movie_root: PathBuf,
    strip_reserved: bool,
}

impl PathResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            tv_root: config.tv_root.clone(),
            documentary_root: config.documentary_root.clone(),
            movie_root: config.movie_root.clone(),
            strip_reserved: config.strip_reserved_characters,
        }
    }

    fn root(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::TvShow => &self.tv_root,
            MediaKind::Documentary => &self.documentary_root,
            MediaKind::Movie => &self.movie_root,
        }
    }

    /// Make `name` safe to use as a single path component. Names that would
    /// collapse into or climb out of the parent directory are rejected.
    pub fn sanitize(&self, name: &str) -> Result<String, ImportError> {
        let replaced = name.trim().replace('/', &SLASH_REPLACEMENT.to_string());
        let sanitized = if self.strip_reserved {
            replaced
                .chars()
                .filter(|c| !RESERVED_CHARACTERS.contains(c))
                .collect::<String>()
                .trim()
                .to_string()
        } else {
            replaced
        };

        match sanitized.as_str() {
            "" | "." | ".." => Err(ImportError::InvalidName(name.to_string())),
            _ => Ok(sanitized),
        }
    }

    /// Destination of `fields` imported as `candidate`. Episode titles are
    /// looked up through `resolver` for series candidates.
    pub async fn resolve(
        &self,
        candidate: &ScoredCandidate,
        fields: &FieldSet,
        resolver: &mut MetadataResolver,
    ) -> Result<PathBuf, ImportError> {
        let kind = candidate.source.kind();
        let root = self.root(kind);

        let path = match (kind, &candidate.payload) {
            (MediaKind::TvShow, CandidatePayload::Series(series)) => {
                let (season, episode) = required_episode(fields)?;
                self.series_episode(root, series, season, episode, resolver)
                    .await?
            }
            (MediaKind::TvShow, CandidatePayload::Local(name)) => {
                let (season, episode) = required_episode(fields)?;
                self.episode_path(root, name, season, episode, None)?
            }
            (MediaKind::Documentary, CandidatePayload::Series(series)) => {
                let (season, episode) = documentary_episode(fields)?
                    .ok_or(ImportError::MissingField("episode"))?;
                self.series_episode(root, series, season, episode, resolver)
                    .await?
            }
            (MediaKind::Documentary | MediaKind::Movie, CandidatePayload::Title(title)) => {
                self.title_path(root, &title.name, title.year.map(u32::from))?
            }
            // Every field is optional here: a number that does not parse
            // drops the file to the next shape instead of failing it.
            (MediaKind::Documentary, CandidatePayload::Local(name)) => {
                match parsed_documentary_episode(fields) {
                    Some((season, episode)) => {
                        self.episode_path(root, name, season, episode, None)?
                    }
                    None => {
                        let year = fields.year_number().ok().flatten();
                        self.title_path(root, name, year)?
                    }
                }
            }
            (_, payload) => {
                return Err(ImportError::UnsupportedPayload {
                    source_label: candidate.source.label(),
                    payload: payload.label(),
                })
            }
        };

        debug!("Resolved destination {:?}", path);
        Ok(path)
    }

    async fn series_episode(
        &self,
        root: &Path,
        series: &SeriesRecord,
        season: u32,
        episode: u32,
        resolver: &mut MetadataResolver,
    ) -> Result<PathBuf, ImportError> {
        let episode_title = resolver.episode_title(series, season, episode).await?;
        self.episode_path(root, &series.name, season, episode, episode_title.as_deref())
    }

    fn episode_path(
        &self,
        root: &Path,
        series: &str,
        season: u32,
        episode: u32,
        episode_title: Option<&str>,
    ) -> Result<PathBuf, ImportError> {
        let series = self.sanitize(series)?;
        let mut file_name = format!("{} S{:02}E{:02}", series, season, episode);
        if let Some(title) = episode_title {
            file_name.push_str(" - ");
            file_name.push_str(&self.sanitize(title)?);
        }

        Ok(root
            .join(&series)
            .join(format!("Season {:02}", season))
            .join(format!("{}.{}", file_name, DESTINATION_EXTENSION)))
    }

    fn title_path(
        &self,
        root: &Path,
        name: &str,
        year: Option<u32>,
    ) -> Result<PathBuf, ImportError> {
        let name = self.sanitize(name)?;
        let file_name = match year {
            Some(year) => format!("{} ({}).{}", name, year, DESTINATION_EXTENSION),
            None => format!("{}.{}", name, DESTINATION_EXTENSION),
        };
        Ok(root.join(file_name))
    }
}

fn required_episode(fields: &FieldSet) -> Result<(u32, u32), ImportError> {
    let season = fields
        .season_number()?
        .ok_or(ImportError::MissingField("season"))?;
    let episode = fields
        .episode_number()?
        .ok_or(ImportError::MissingField("episode"))?;
    Ok((season, episode))
}

/// Season and episode of a documentary. A part number without a season
/// counts as season 1.
fn documentary_episode(fields: &FieldSet) -> Result<Option<(u32, u32)>, ImportError> {
    let Some(episode) = fields.episode_number()? else {
        return Ok(None);
    };
    let season = fields.season_number()?.unwrap_or(1);
    Ok(Some((season, episode)))
}

/// Like [`documentary_episode`], but numbers that do not parse count as absent.
fn parsed_documentary_episode(fields: &FieldSet) -> Option<(u32, u32)> {
    let episode = fields.episode_number().ok().flatten()?;
    let season = fields.season_number().ok()?.unwrap_or(1);
    Some((season, episode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{episodes, series, title, FakeSeriesCatalog, FakeTitleCatalog};
    use crate::classify::FilenameClassifier;
    use crate::ranking::CandidateSource;
    use crate::resolver::MetadataCache;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn config() -> Config {
        Config {
            tv_root: PathBuf::from("/media/TV"),
            documentary_root: PathBuf::from("/media/Documentaries"),
            movie_root: PathBuf::from("/media/Movies"),
            ..Config::default()
        }
    }

    fn resolver_with_wire() -> MetadataResolver {
        let series_catalog = FakeSeriesCatalog {
            seasons: HashMap::from([(
                179,
                episodes(&[(1, 1, "The Target"), (1, 2, "The Detail"), (2, 1, "")]),
            )]),
            ..Default::default()
        };
        MetadataResolver::new(
            Arc::new(series_catalog),
            Arc::new(FakeTitleCatalog::default()),
            MetadataCache::new(),
            5,
        )
    }

    fn fields(kind: MediaKind, file_name: &str) -> FieldSet {
        FilenameClassifier::new()
            .unwrap()
            .classify(kind, file_name)
            .unwrap()
            .fields
    }

    #[tokio::test]
    async fn test_tv_series_path_includes_episode_title() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate = ScoredCandidate::series(
            CandidateSource::RemoteTvCatalog,
            series(179, "The Wire", &["Drama"]),
            0,
            0,
        );

        let path = paths
            .resolve(&candidate, &fields(MediaKind::TvShow, "the.wire.s01e02.mkv"), &mut resolver)
            .await
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/media/TV/The Wire/Season 01/The Wire S01E02 - The Detail.mkv")
        );

        let untitled = paths
            .resolve(&candidate, &fields(MediaKind::TvShow, "the.wire.2x01.avi"), &mut resolver)
            .await
            .unwrap();
        assert_eq!(
            untitled,
            PathBuf::from("/media/TV/The Wire/Season 02/The Wire S02E01.mkv")
        );
    }

    #[tokio::test]
    async fn test_tv_missing_episode_fails() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate = ScoredCandidate::series(
            CandidateSource::RemoteTvCatalog,
            series(179, "The Wire", &[]),
            0,
            0,
        );

        let result = paths
            .resolve(&candidate, &fields(MediaKind::TvShow, "the.wire.s01e09.mkv"), &mut resolver)
            .await;
        assert!(matches!(result, Err(ImportError::MissingEpisode { episode: 9, .. })));

        let result = paths
            .resolve(&candidate, &fields(MediaKind::TvShow, "the.wire.s05e01.mkv"), &mut resolver)
            .await;
        assert!(matches!(result, Err(ImportError::MissingSeason { season: 5, .. })));
    }

    #[tokio::test]
    async fn test_tv_local_path_keeps_wide_season_numbers() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate = ScoredCandidate::local(CandidateSource::LocalTv, "Days of Our Lives", 0, 0);

        let path = paths
            .resolve(
                &candidate,
                &fields(MediaKind::TvShow, "days.of.our.lives.s1666e1.mkv"),
                &mut resolver,
            )
            .await
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/media/TV/Days of Our Lives/Season 1666/Days of Our Lives S1666E01.mkv")
        );
    }

    #[tokio::test]
    async fn test_tv_rejects_title_payload() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate = ScoredCandidate::title(
            CandidateSource::RemoteTvCatalog,
            title("tt0306414", "The Wire", Some(2002), Some("TV Series")),
            0,
            0,
        );

        let result = paths
            .resolve(&candidate, &fields(MediaKind::TvShow, "the.wire.s01e01.mkv"), &mut resolver)
            .await;
        assert!(matches!(result, Err(ImportError::UnsupportedPayload { .. })));
    }

    #[tokio::test]
    async fn test_movie_title_path() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate = ScoredCandidate::title(
            CandidateSource::RemoteMovieTitle,
            title("tt0113277", "Heat", Some(1995), None),
            0,
            0,
        );

        let path = paths
            .resolve(&candidate, &fields(MediaKind::Movie, "heat.1995.avi"), &mut resolver)
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/media/Movies/Heat (1995).mkv"));
    }

    #[tokio::test]
    async fn test_documentary_local_shapes() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate =
            ScoredCandidate::local(CandidateSource::LocalDocumentary, "Planet Earth", 0, 0);

        let cases = [
            (
                "planet.earth.s01e03.mkv",
                "/media/Documentaries/Planet Earth/Season 01/Planet Earth S01E03.mkv",
            ),
            (
                "planet.earth.part.2.mkv",
                "/media/Documentaries/Planet Earth/Season 01/Planet Earth S01E02.mkv",
            ),
            (
                "planet.earth.2006.part.3.mkv",
                "/media/Documentaries/Planet Earth/Season 01/Planet Earth S01E03.mkv",
            ),
            ("planet.earth.mkv", "/media/Documentaries/Planet Earth.mkv"),
        ];

        for (file_name, expected) in cases {
            let path = paths
                .resolve(&candidate, &fields(MediaKind::Documentary, file_name), &mut resolver)
                .await
                .unwrap();
            assert_eq!(path, PathBuf::from(expected), "{}", file_name);
        }

        let with_year = FieldSet {
            name: "planet.earth".to_string(),
            year: Some("2006".to_string()),
            season: None,
            episode: None,
            other: Some(String::new()),
            ext: "mkv".to_string(),
        };
        let path = paths
            .resolve(&candidate, &with_year, &mut resolver)
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/media/Documentaries/Planet Earth (2006).mkv"));
    }

    #[tokio::test]
    async fn test_documentary_local_out_of_range_part_falls_back_to_name() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate =
            ScoredCandidate::local(CandidateSource::LocalDocumentary, "Planet Earth", 0, 0);

        let file_fields = fields(MediaKind::Documentary, "planet.earth.part.99999999999.mkv");
        assert_eq!(file_fields.episode.as_deref(), Some("99999999999"));

        let path = paths
            .resolve(&candidate, &file_fields, &mut resolver)
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/media/Documentaries/Planet Earth.mkv"));

        let bad_season = FieldSet {
            season: Some("99999999999".to_string()),
            episode: Some("2".to_string()),
            year: Some("2006".to_string()),
            ..file_fields
        };
        let path = paths
            .resolve(&candidate, &bad_season, &mut resolver)
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/media/Documentaries/Planet Earth (2006).mkv"));
    }

    #[tokio::test]
    async fn test_documentary_series_path() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate = ScoredCandidate::series(
            CandidateSource::RemoteDocumentaryCatalog,
            series(179, "The Wire", &["Documentary"]),
            0,
            0,
        );

        let path = paths
            .resolve(
                &candidate,
                &fields(MediaKind::Documentary, "the.wire.s01e01.mkv"),
                &mut resolver,
            )
            .await
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/media/Documentaries/The Wire/Season 01/The Wire S01E01 - The Target.mkv")
        );
    }

    #[test]
    fn test_sanitize() {
        let paths = PathResolver::new(&config());
        assert_eq!(paths.sanitize("AC/DC: Live?").unwrap(), "AC\u{2215}DC: Live?");

        let strict = PathResolver::new(&Config {
            strip_reserved_characters: true,
            ..config()
        });
        assert_eq!(strict.sanitize("AC/DC: Live?").unwrap(), "AC\u{2215}DC Live");
        assert_eq!(strict.sanitize(r#"a\b*c"d<e>f|g"#).unwrap(), "abcdefg");
    }

    #[test]
    fn test_sanitize_rejects_names_that_leave_the_directory() {
        let paths = PathResolver::new(&config());
        for name in ["", "  ", ".", "..", " .. "] {
            assert!(
                matches!(paths.sanitize(name), Err(ImportError::InvalidName(_))),
                "{name:?}"
            );
        }
        assert_eq!(paths.sanitize("...And Justice").unwrap(), "...And Justice");

        let strict = PathResolver::new(&Config {
            strip_reserved_characters: true,
            ..config()
        });
        assert!(matches!(strict.sanitize("???"), Err(ImportError::InvalidName(_))));
        assert!(matches!(strict.sanitize(":.."), Err(ImportError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_catalog_name_cannot_escape_root() {
        let paths = PathResolver::new(&config());
        let mut resolver = resolver_with_wire();
        let candidate = ScoredCandidate::title(
            CandidateSource::RemoteMovieTitle,
            title("tt0000001", "..", None, None),
            0,
            0,
        );

        let result = paths
            .resolve(&candidate, &fields(MediaKind::Movie, "heat.1995.avi"), &mut resolver)
            .await;
        assert!(matches!(result, Err(ImportError::InvalidName(_))));

        let series_candidate = ScoredCandidate::local(CandidateSource::LocalTv, "..", 0, 0);
        let result = paths
            .resolve(
                &series_candidate,
                &fields(MediaKind::TvShow, "the.wire.s01e01.mkv"),
                &mut resolver,
            )
            .await;
        assert!(matches!(result, Err(ImportError::InvalidName(_))));
    }
}
