use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort the import of a single file.
///
/// Classification misses and catalog search failures never show up here: they
/// are logged and absorbed where they happen, so a file only fails when it can
/// no longer be placed in the library.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("field '{field}' is not a number: {value:?}")]
    FieldParse { field: &'static str, value: String },

    #[error("field '{0}' is required for this candidate but was not parsed")]
    MissingField(&'static str),

    #[error("catalog lookup failed: {0}")]
    Catalog(String),

    #[error("season {season} of '{series}' is not listed in the catalog")]
    MissingSeason { series: String, season: u32 },

    #[error("episode S{season:02}E{episode:02} of '{series}' is not listed in the catalog")]
    MissingEpisode {
        series: String,
        season: u32,
        episode: u32,
    },

    #[error("{source_label} candidates cannot be placed from a {payload} payload")]
    UnsupportedPayload {
        source_label: &'static str,
        payload: &'static str,
    },

    #[error("{0:?} cannot be used as a library file or directory name")]
    InvalidName(String),

    #[error("no candidates found for {0:?}")]
    NoCandidates(PathBuf),

    #[error("invalid selection: {0}")]
    SelectionInput(String),

    #[error("cannot materialize {path:?}: {reason}")]
    Materialization { path: PathBuf, reason: String },

    #[error("all remux tools failed for {input:?}:\n{failures}")]
    RemuxFailed { input: PathBuf, failures: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
