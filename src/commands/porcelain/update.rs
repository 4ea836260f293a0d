use crate::areas::repository::Repository;
use crate::artifacts::index::{AppendOutcome, DedupIndex, IndexEntries, ReconcileReport};
use crate::artifacts::manifest::hint::Hint;
use colored::Colorize;
use is_terminal::IsTerminal;
use std::io::Write;

impl Repository {
    /// Reconcile the index with the chunks referenced by the filtered files
    /// of the working tree
    pub fn update(&self, force: bool, prune: bool) -> anyhow::Result<ReconcileReport> {
        let config = self.config()?;

        let files = self.workspace().filtered_files()?;
        let mut tracked = IndexEntries::new();
        for (path, manifest) in self.workspace().manifests(&files)? {
            let hint = Hint::from_path(&path);
            for chunk in manifest.chunks() {
                tracked.insert(chunk.oid().clone(), hint.clone());
            }
        }

        let show_progress = std::io::stderr().is_terminal();
        let index = DedupIndex::new(self.database(), config.snapshot_capacity);
        let report = index.reconcile(&tracked, force, prune, |progress| {
            if show_progress {
                eprint!("\rScanning index: {}/{}", progress.scanned, progress.total);
                if progress.scanned == progress.total {
                    eprintln!();
                }
            }
        })?;

        writeln!(
            self.writer(),
            "{} files, {} chunks tracked, {} indexed, {} missing, {} stale",
            files.len(),
            report.tracked,
            report.indexed,
            report.missing,
            report.stale
        )?;
        match &report.outcome {
            AppendOutcome::Unchanged => writeln!(self.writer(), "{}", "Index up to date".green())?,
            AppendOutcome::Appended { units, tip } => writeln!(
                self.writer(),
                "{} {} snapshot unit(s), index at {}",
                "Wrote".green(),
                units,
                tip.to_short_oid().yellow()
            )?,
            AppendOutcome::Conflicted => writeln!(
                self.writer(),
                "{}",
                "Index was updated concurrently, run update again".red()
            )?,
        }

        Ok(report)
    }
}
