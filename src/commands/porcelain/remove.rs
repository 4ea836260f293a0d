use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Undo `install`. Tracking patterns and the index branch stay.
    pub fn remove(&self) -> anyhow::Result<()> {
        self.uninstall()?;

        writeln!(
            self.writer(),
            "Removed git-fastcdc from {}",
            self.path().display()
        )?;

        Ok(())
    }
}
