use crate::areas::repository::Repository;
use crate::artifacts::core::config::ONDISK_KEY;
use std::io::Write;

impl Repository {
    /// Choose whether clean spools file content to disk instead of memory
    pub fn ondisk(&self, enabled: bool) -> anyhow::Result<()> {
        self.set_config(ONDISK_KEY, if enabled { "true" } else { "false" })?;

        let mode = if enabled { "on disk" } else { "in memory" };
        writeln!(self.writer(), "Clean now buffers files {mode}")?;

        Ok(())
    }
}
