use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::classify::{Classification, FilenameClassifier};

/// Classification report for one input file
#[derive(Debug, Serialize)]
pub struct ClassifyReport {
    pub file: PathBuf,
    pub classifications: Vec<Classification>,
}

/// Command to show how file names are classified, without importing anything
pub struct ClassifyCommand {
    files: Vec<PathBuf>,
}

impl ClassifyCommand {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    pub async fn execute(&self) -> Result<Vec<ClassifyReport>> {
        let classifier = FilenameClassifier::new()?;

        let reports: Vec<ClassifyReport> = self
            .files
            .iter()
            .map(|file| {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let classifications = classifier.classify_all(&name);
                debug!("{} classification(s) for {:?}", classifications.len(), file);
                ClassifyReport {
                    file: file.clone(),
                    classifications,
                }
            })
            .collect();

        info!("🔍 Classified {} file(s)", reports.len());
        Ok(reports)
    }

    /// Print the reports as pretty JSON on stdout.
    pub fn print_report(&self, reports: &[ClassifyReport]) -> Result<()> {
        let json = serde_json::to_string_pretty(reports).context("Failed to serialize report")?;
        println!("{}", json);
        Ok(())
    }
}
