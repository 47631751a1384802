//! Filename classification: an ordered cascade of patterns per media kind.
//!
//! Patterns within a kind are tried from the most to the least specific and
//! the first match wins. Two properties of the table are load-bearing:
//!
//! - The name group is lazy and of variable length. When it precedes an
//!   *optional* fixed-width year, the regex engine happily folds the year into
//!   the name (`show.2009.s01e01` → name `show.2009`). Year-bearing forms are
//!   therefore separate entries that come before their year-less twins.
//! - The bare `name.ext` fallback matches nearly any filename, so it is
//!   always the last entry of a kind.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;

use crate::error::ImportError;
use crate::tokens;

/// Library category a file may belong to. A file is tried against all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MediaKind {
    TvShow,
    Documentary,
    Movie,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::TvShow, MediaKind::Documentary, MediaKind::Movie];

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::TvShow => "TV show",
            MediaKind::Documentary => "documentary",
            MediaKind::Movie => "movie",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields captured from a filename.
///
/// `name` and `ext` exist for every successful classification. The optional
/// fields are `None` when the matching pattern has no such group, which is
/// different from a group that matched the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSet {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
    pub ext: String,
}

impl FieldSet {
    fn from_captures(caps: &Captures) -> Option<Self> {
        let text = |group: &str| caps.name(group).map(|m| m.as_str().to_string());

        Some(Self {
            name: text("name")?,
            year: text("year"),
            season: text("season"),
            episode: text("episode"),
            other: text("other"),
            ext: text("ext")?,
        })
    }

    /// Title with separators normalized to single spaces.
    pub fn title(&self) -> String {
        tokens::joined(&self.name)
    }

    /// Title suffixed with the year when one was captured.
    pub fn title_with_year(&self) -> String {
        match &self.year {
            Some(year) => format!("{} {}", self.title(), year),
            None => self.title(),
        }
    }

    pub fn season_number(&self) -> Result<Option<u32>, ImportError> {
        parse_number("season", self.season.as_deref())
    }

    pub fn episode_number(&self) -> Result<Option<u32>, ImportError> {
        parse_number("episode", self.episode.as_deref())
    }

    pub fn year_number(&self) -> Result<Option<u32>, ImportError> {
        parse_number("year", self.year.as_deref())
    }

    /// Both season and episode parse as numbers.
    pub fn has_numeric_episode(&self) -> bool {
        matches!(
            (self.season_number(), self.episode_number()),
            (Ok(Some(_)), Ok(Some(_)))
        )
    }
}

fn parse_number(field: &'static str, value: Option<&str>) -> Result<Option<u32>, ImportError> {
    value
        .map(|text| {
            text.parse::<u32>().map_err(|_| ImportError::FieldParse {
                field,
                value: text.to_string(),
            })
        })
        .transpose()
}

/// Static description of one entry of a classification cascade.
struct PatternSpec {
    description: &'static str,
    example: &'static str,
    pattern: &'static str,
}

// Shared building blocks. `other` is whatever sits between the last captured
// marker and the extension, with surrounding separators trimmed off.
macro_rules! tail {
    () => {
        r"[^A-Za-z0-9]*(?P<other>.*?)[^A-Za-z0-9]*\.(?P<ext>[^.]+)$"
    };
}

macro_rules! year {
    () => {
        r"(?P<year>(?:19|20)[0-9]{2})"
    };
}

const TV_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        description: "name, year, SxxExx",
        example: "show.2009.s01e01.mkv",
        pattern: concat!(
            r"^(?P<name>.+?)[^A-Za-z0-9]+",
            year!(),
            r"[^A-Za-z0-9]+[sS](?P<season>[0-9]+).*?[eE](?P<episode>[0-9]+)",
            tail!()
        ),
    },
    PatternSpec {
        description: "name, SxxExx",
        example: "show.s01e01.mkv",
        pattern: concat!(
            r"^(?P<name>.+?)[^A-Za-z0-9]+[sS](?P<season>[0-9]+).*?[eE](?P<episode>[0-9]+)",
            tail!()
        ),
    },
    PatternSpec {
        description: "name, year, NxNN",
        example: "show.2009.1x01.mkv",
        pattern: concat!(
            r"^(?P<name>.+?)[^A-Za-z0-9]+",
            year!(),
            r"[^A-Za-z0-9]+(?P<season>[0-9]{1,2})[xX](?P<episode>[0-9]+)",
            tail!()
        ),
    },
    PatternSpec {
        description: "name, NxNN",
        example: "show.1x01.mkv",
        pattern: concat!(
            r"^(?P<name>.+?)[^A-Za-z0-9]+(?P<season>[0-9]{1,2})[xX](?P<episode>[0-9]+)",
            tail!()
        ),
    },
];

const DOCUMENTARY_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        description: "name, year, part number",
        example: "planet.earth.2006.part.3.mkv",
        pattern: concat!(
            r"^(?P<name>.+?)[^A-Za-z0-9]+",
            year!(),
            r"[^A-Za-z0-9]+(?i:part|pt|episode|ep)[^A-Za-z0-9]*(?P<episode>[0-9]+)",
            tail!()
        ),
    },
    PatternSpec {
        description: "name, part number",
        example: "planet.earth.pt2.mkv",
        pattern: concat!(
            r"^(?P<name>.+?)[^A-Za-z0-9]+(?i:part|pt|episode|ep)[^A-Za-z0-9]*(?P<episode>[0-9]+)",
            tail!()
        ),
    },
];

const MOVIE_PATTERNS: &[PatternSpec] = &[PatternSpec {
    description: "name, year",
    example: "movie.2009.1080p.mkv",
    // The year must not run into further letters or digits (`2009p`, `20091`).
    pattern: concat!(r"^(?P<name>.+?)[^A-Za-z0-9]+", year!(), r"(?:_|(?-u:\b))", tail!()),
}];

const BARE_PATTERN: PatternSpec = PatternSpec {
    description: "name only",
    example: "some.file.mkv",
    pattern: r"^(?P<name>.+?)[^A-Za-z0-9]*\.(?P<ext>[^.]+)$",
};

/// One compiled entry of a cascade.
#[derive(Debug, Clone)]
pub struct ClassifierPattern {
    pub description: &'static str,
    pub example: &'static str,
    regex: Regex,
}

impl ClassifierPattern {
    fn compile(spec: &PatternSpec) -> Result<Self> {
        let regex = Regex::new(spec.pattern)
            .with_context(|| format!("invalid pattern '{}'", spec.description))?;
        Ok(Self {
            description: spec.description,
            example: spec.example,
            regex,
        })
    }

    pub fn fields(&self, file_name: &str) -> Option<FieldSet> {
        self.regex
            .captures(file_name)
            .and_then(|caps| FieldSet::from_captures(&caps))
    }
}

/// Result of classifying a file name as one media kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub kind: MediaKind,
    pub pattern: &'static str,
    pub fields: FieldSet,
}

/// Ordered pattern cascades for every media kind.
#[derive(Debug, Clone)]
pub struct FilenameClassifier {
    tv: Vec<ClassifierPattern>,
    documentary: Vec<ClassifierPattern>,
    movie: Vec<ClassifierPattern>,
}

impl FilenameClassifier {
    pub fn new() -> Result<Self> {
        let compile_all = |specs: &[&PatternSpec]| -> Result<Vec<ClassifierPattern>> {
            specs.iter().map(|spec| ClassifierPattern::compile(spec)).collect()
        };

        // Documentaries may carry season/episode markers, so the TV cascade
        // goes first. TV itself has no bare fallback: a TV episode without an
        // episode marker cannot be placed.
        let tv: Vec<&PatternSpec> = TV_PATTERNS.iter().collect();
        let documentary: Vec<&PatternSpec> = TV_PATTERNS
            .iter()
            .chain(DOCUMENTARY_PATTERNS)
            .chain(std::iter::once(&BARE_PATTERN))
            .collect();
        let movie: Vec<&PatternSpec> = MOVIE_PATTERNS
            .iter()
            .chain(std::iter::once(&BARE_PATTERN))
            .collect();

        Ok(Self {
            tv: compile_all(&tv)?,
            documentary: compile_all(&documentary)?,
            movie: compile_all(&movie)?,
        })
    }

    /// The cascade for a kind, in the order it is tried.
    pub fn patterns(&self, kind: MediaKind) -> &[ClassifierPattern] {
        match kind {
            MediaKind::TvShow => &self.tv,
            MediaKind::Documentary => &self.documentary,
            MediaKind::Movie => &self.movie,
        }
    }

    /// Classify a bare file name as one kind. `None` means no pattern matched.
    pub fn classify(&self, kind: MediaKind, file_name: &str) -> Option<Classification> {
        self.patterns(kind).iter().find_map(|pattern| {
            pattern.fields(file_name).map(|fields| Classification {
                kind,
                pattern: pattern.description,
                fields,
            })
        })
    }

    /// Classify a file name against every kind, skipping kinds that miss.
    pub fn classify_all(&self, file_name: &str) -> Vec<Classification> {
        MediaKind::ALL
            .iter()
            .filter_map(|kind| self.classify(*kind, file_name))
            .collect()
    }
}
