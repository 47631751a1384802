use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::classify::{Classification, FilenameClassifier, MediaKind};
use crate::config::Config;
use crate::error::ImportError;
use crate::library::MediaLibrary;
use crate::paths::PathResolver;
use crate::ranking::{CandidateRanker, ScoredCandidate};
use crate::remux::{MediaMaterializer, Materialized, RemuxRunner};
use crate::resolver::MetadataResolver;
use crate::selection::SelectionPolicy;

/// A file whose candidate and destination are decided but which has not been
/// written to the library yet.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: MediaKind,
    pub candidate: ScoredCandidate,
}

/// Result of importing one file
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub plan: ImportPlan,
    pub materialized: Materialized,
}

/// Imports files one at a time: classify, rank, select, resolve the
/// destination, materialize.
pub struct Importer {
    classifier: FilenameClassifier,
    library: MediaLibrary,
    resolver: MetadataResolver,
    ranker: CandidateRanker,
    selection: Box<dyn SelectionPolicy>,
    paths: PathResolver,
    materializer: MediaMaterializer,
}

impl Importer {
    pub fn new(
        config: &Config,
        library: MediaLibrary,
        resolver: MetadataResolver,
        selection: Box<dyn SelectionPolicy>,
        runner: Arc<dyn RemuxRunner>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            classifier: FilenameClassifier::new()?,
            library,
            resolver,
            ranker: CandidateRanker::new(config.visible_results),
            selection,
            paths: PathResolver::new(config),
            materializer: MediaMaterializer::new(config, runner),
        })
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    pub async fn import(&mut self, source: &Path) -> Result<ImportOutcome, ImportError> {
        let plan = self.plan(source).await?;
        self.complete(plan).await
    }

    /// Everything up to the destination path. Nothing is written.
    pub async fn plan(&mut self, source: &Path) -> Result<ImportPlan, ImportError> {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| ImportError::Materialization {
                path: source.to_path_buf(),
                reason: "not a file path".to_string(),
            })?;

        info!("📄 Importing {}", file_name);
        let classifications = self.classify(&file_name);
        if classifications.is_empty() {
            return Err(ImportError::NoCandidates(source.to_path_buf()));
        }

        let ranked = self
            .ranker
            .rank(&classifications, &self.library, &mut self.resolver)
            .await;
        let candidate = self.selection.select(source, &ranked)?.clone();
        let classification = &classifications[candidate.classification];

        let destination = self
            .paths
            .resolve(&candidate, &classification.fields, &mut self.resolver)
            .await?;
        info!("📍 Destination: {:?}", destination);

        Ok(ImportPlan {
            source: source.to_path_buf(),
            destination,
            kind: candidate.source.kind(),
            candidate,
        })
    }

    /// Write the planned file into the library.
    pub async fn complete(&mut self, plan: ImportPlan) -> Result<ImportOutcome, ImportError> {
        let materialized = self
            .materializer
            .materialize(&plan.source, &plan.destination)
            .await?;

        self.library.record_import(plan.kind, &plan.destination);

        Ok(ImportOutcome { plan, materialized })
    }

    fn classify(&self, file_name: &str) -> Vec<Classification> {
        let mut classifications = Vec::new();
        for kind in MediaKind::ALL {
            match self.classifier.classify(kind, file_name) {
                Some(classification) => {
                    debug!(
                        "Classified as {} using '{}': {:?}",
                        kind, classification.pattern, classification.fields
                    );
                    classifications.push(classification);
                }
                None => debug!("Not classified as {}", kind),
            }
        }
        classifications
    }
}
