use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::error::ImportError;
use crate::ranking::{RankedCandidates, ScoredCandidate};

/// Resolves the ranked candidates of a file to the one to import as.
pub trait SelectionPolicy {
    fn select<'a>(
        &mut self,
        file: &Path,
        ranked: &'a RankedCandidates,
    ) -> Result<&'a ScoredCandidate, ImportError>;
}

/// Always takes the best ranked candidate.
#[derive(Debug, Default)]
pub struct AutomaticSelection;

impl SelectionPolicy for AutomaticSelection {
    fn select<'a>(
        &mut self,
        file: &Path,
        ranked: &'a RankedCandidates,
    ) -> Result<&'a ScoredCandidate, ImportError> {
        let chosen = ranked
            .first()
            .ok_or_else(|| ImportError::NoCandidates(file.to_path_buf()))?;
        info!(
            "🤖 Selected '{}' from {} (score {})",
            chosen.display_name, chosen.source, chosen.score
        );
        Ok(chosen)
    }
}

/// Lists the candidates and asks for a number until a valid one is given.
pub struct InteractiveSelection<R, W> {
    input: R,
    output: W,
}

impl InteractiveSelection<StdinLock<'static>, Stdout> {
    pub fn console() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> InteractiveSelection<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn print_candidates(&mut self, file: &Path, ranked: &RankedCandidates) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", file.display())?;
        for section in ranked.sections() {
            writeln!(self.output, "  {}:", section.source)?;
            for (number, candidate) in section.entries {
                writeln!(
                    self.output,
                    "    {:>3}) {} [{}]",
                    number, candidate.display_name, candidate.score
                )?;
            }
        }
        Ok(())
    }

    /// Read one answer. `Ok(None)` means the input was closed.
    fn prompt(&mut self, max: usize) -> io::Result<Option<String>> {
        write!(self.output, "Select [1-{}]: ", max)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> SelectionPolicy for InteractiveSelection<R, W> {
    fn select<'a>(
        &mut self,
        file: &Path,
        ranked: &'a RankedCandidates,
    ) -> Result<&'a ScoredCandidate, ImportError> {
        if ranked.is_empty() {
            return Err(ImportError::NoCandidates(file.to_path_buf()));
        }

        self.print_candidates(file, ranked)?;

        loop {
            let answer = self
                .prompt(ranked.len())?
                .ok_or_else(|| ImportError::SelectionInput("input closed".to_string()))?;

            match answer.parse::<usize>().ok().and_then(|n| ranked.get(n)) {
                Some(chosen) => {
                    info!("👉 Selected '{}' from {}", chosen.display_name, chosen.source);
                    return Ok(chosen);
                }
                None => {
                    warn!("Invalid selection: {:?}", answer);
                    writeln!(
                        self.output,
                        "Please enter a number between 1 and {}",
                        ranked.len()
                    )?;
                }
            }
        }
    }
}
