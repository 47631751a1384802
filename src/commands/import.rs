use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::catalog::{OfflineCatalog, OmdbClient, SeriesCatalog, TitleCatalog, TvMazeClient};
use crate::config::Config;
use crate::error::ImportError;
use crate::importer::{ImportOutcome, Importer};
use crate::library::MediaLibrary;
use crate::remux::{Materialized, ProcessRunner};
use crate::resolver::{MetadataCache, MetadataResolver};
use crate::selection::{AutomaticSelection, InteractiveSelection, SelectionPolicy};

/// Command to import files into the library
pub struct ImportCommand {
    config_path: PathBuf,
    files: Vec<PathBuf>,
    automatic: bool,
    offline: bool,
    keep_going: bool,
}

impl ImportCommand {
    pub fn new(
        config_path: PathBuf,
        files: Vec<PathBuf>,
        automatic: bool,
        offline: bool,
        keep_going: bool,
    ) -> Self {
        Self {
            config_path,
            files,
            automatic,
            offline,
            keep_going,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(&self.config_path)?;

        let library = MediaLibrary::capture(&config);
        info!(
            "📚 Library: {} TV shows, {} documentaries, {} movies",
            library.tv.dirs.len(),
            library.documentary.dirs.len(),
            library.movie.dirs.len() + library.movie.files.len()
        );

        let (series_catalog, title_catalog) = self.catalogs(&config)?;
        let resolver = MetadataResolver::new(
            series_catalog,
            title_catalog,
            MetadataCache::new(),
            config.visible_results,
        );

        let selection: Box<dyn SelectionPolicy> = if self.automatic {
            Box::new(AutomaticSelection)
        } else {
            Box::new(InteractiveSelection::console())
        };

        let mut importer = Importer::new(
            &config,
            library,
            resolver,
            selection,
            Arc::new(ProcessRunner),
        )?;

        let mut imported = 0;
        let mut skipped = 0;
        let mut failed = 0;

        for file in &self.files {
            match import_file(&mut importer, file).await {
                Ok(outcome) => match outcome.materialized {
                    Materialized::AlreadyImported => skipped += 1,
                    _ => {
                        imported += 1;
                        info!(
                            "✅ Imported {:?} as '{}'",
                            outcome.plan.destination, outcome.plan.candidate.display_name
                        );
                    }
                },
                Err(e) if self.keep_going => {
                    failed += 1;
                    error!("❌ Failed to import {:?}: {}", file, e);
                }
                Err(e) => {
                    return Err(anyhow!(e)).with_context(|| format!("Failed to import {:?}", file));
                }
            }
        }

        info!(
            "🎉 Done: {} imported, {} already present, {} failed ({} cached lookups)",
            imported,
            skipped,
            failed,
            importer.resolver().cache().len()
        );

        if failed > 0 {
            bail!("{} of {} files failed to import", failed, self.files.len());
        }
        Ok(())
    }

    fn catalogs(
        &self,
        config: &Config,
    ) -> Result<(Arc<dyn SeriesCatalog>, Arc<dyn TitleCatalog>)> {
        if self.offline {
            info!("📴 Offline mode: only the local library is searched");
            let series_catalog: Arc<dyn SeriesCatalog> = Arc::new(OfflineCatalog);
            let title_catalog: Arc<dyn TitleCatalog> = Arc::new(OfflineCatalog);
            return Ok((series_catalog, title_catalog));
        }

        // Requests carry no timeout.
        let client = Client::builder()
            .user_agent(concat!("nasimport/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let series_catalog: Arc<dyn SeriesCatalog> =
            Arc::new(TvMazeClient::new(client.clone(), config.tvmaze_url.as_str()));

        let title_catalog: Arc<dyn TitleCatalog> = match &config.omdb_api_key {
            Some(key) => Arc::new(OmdbClient::new(client, config.omdb_url.as_str(), key.as_str())),
            None => {
                warn!("⚠️ No OMDb API key configured, title lookups are disabled");
                Arc::new(OfflineCatalog)
            }
        };

        Ok((series_catalog, title_catalog))
    }
}

async fn import_file(importer: &mut Importer, file: &Path) -> Result<ImportOutcome, ImportError> {
    let plan = importer.plan(file).await?;

    let spinner = create_spinner(&format!("Writing {}", plan.destination.display()));
    let result = importer.complete(plan).await;
    spinner.finish_and_clear();

    result
}

fn create_spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed_precise}]") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(msg.to_string());
    spinner
}
