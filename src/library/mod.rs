use anyhow::{anyhow, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::classify::MediaKind;
use crate::config::Config;
use crate::tokens;

/// Immediate children of one library root, captured once.
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    pub root: PathBuf,
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

impl LibrarySnapshot {
    /// Enumerate the immediate children of `root`, skipping names that match
    /// any of the ignore patterns (NAS housekeeping folders, dotfiles).
    pub fn capture(root: &Path, ignore: &[Pattern]) -> Result<Self> {
        if !root.is_dir() {
            return Err(anyhow!("Library root is not a directory: {:?}", root));
        }

        let mut snapshot = Self {
            root: root.to_path_buf(),
            ..Self::default()
        };

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if ignore.iter().any(|pattern| pattern.matches(&name)) {
                debug!("Ignoring library entry: {:?}", entry.path());
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                snapshot.dirs.push(name);
            } else if file_type.is_file() {
                snapshot.files.push(name);
            }
        }

        debug!(
            "Captured {} directories and {} files under {:?}",
            snapshot.dirs.len(),
            snapshot.files.len(),
            root
        );

        Ok(snapshot)
    }

    /// Like [`LibrarySnapshot::capture`], but a missing or unreadable root
    /// yields an empty snapshot so the remaining kinds keep working.
    pub fn capture_or_empty(root: &Path, ignore: &[Pattern]) -> Self {
        Self::capture(root, ignore).unwrap_or_else(|e| {
            warn!("⚠️ {}", e);
            Self {
                root: root.to_path_buf(),
                ..Self::default()
            }
        })
    }

    /// Record a directory created by an import so later files in the same
    /// run can match it.
    pub fn record_dir(&mut self, name: &str) {
        if !self.dirs.iter().any(|dir| dir == name) {
            debug!("Recording new library directory: {}", name);
            self.dirs.push(name.to_string());
        }
    }
}

/// Snapshots of every library root, taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct MediaLibrary {
    pub tv: LibrarySnapshot,
    pub documentary: LibrarySnapshot,
    pub movie: LibrarySnapshot,
}

impl MediaLibrary {
    pub fn capture(config: &Config) -> Self {
        let ignore = config.ignore_patterns();
        Self {
            tv: LibrarySnapshot::capture_or_empty(&config.tv_root, &ignore),
            documentary: LibrarySnapshot::capture_or_empty(&config.documentary_root, &ignore),
            movie: LibrarySnapshot::capture_or_empty(&config.movie_root, &ignore),
        }
    }

    pub fn snapshot(&self, kind: MediaKind) -> &LibrarySnapshot {
        match kind {
            MediaKind::TvShow => &self.tv,
            MediaKind::Documentary => &self.documentary,
            MediaKind::Movie => &self.movie,
        }
    }

    /// Remember the top-level entry an import landed in, e.g. a new series
    /// directory, so the next file of the batch can match it locally.
    pub fn record_import(&mut self, kind: MediaKind, destination: &Path) {
        let snapshot = match kind {
            MediaKind::TvShow => &mut self.tv,
            MediaKind::Documentary => &mut self.documentary,
            MediaKind::Movie => &mut self.movie,
        };

        let Ok(relative) = destination.strip_prefix(&snapshot.root) else {
            return;
        };
        let mut components = relative.components();
        let (Some(first), Some(_)) = (components.next(), components.next()) else {
            // Files placed directly in the root have no directory to record.
            return;
        };
        snapshot.record_dir(&first.as_os_str().to_string_lossy());
    }
}

/// A library entry and its edit distance to the searched title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatch {
    pub name: String,
    pub distance: usize,
}

/// Rank library entry names by edit distance to `title`, closest first.
/// Entries at equal distance keep their snapshot order.
pub fn match_entries(entries: &[String], title: &str) -> Vec<LocalMatch> {
    let target = tokens::comparable(title);

    let mut matches: Vec<LocalMatch> = entries
        .iter()
        .map(|name| LocalMatch {
            name: name.clone(),
            distance: strsim::levenshtein(&tokens::comparable(name), &target),
        })
        .collect();

    matches.sort_by_key(|m| m.distance);
    matches
}
