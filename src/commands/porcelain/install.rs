use crate::areas::repository::Repository;
use std::io::Write;

pub const FILTER_PROCESS_KEY: &str = "filter.git_fastcdc.process";
pub const FILTER_REQUIRED_KEY: &str = "filter.git_fastcdc.required";

/// How git starts the filter
pub const FILTER_PROCESS_COMMAND: &str = "git-fastcdc process";

impl Repository {
    /// Register the filter in the local config and protect the attribute
    /// files from it. Running it again repairs a partial installation.
    pub fn install(&self) -> anyhow::Result<()> {
        self.uninstall()?;

        self.set_config(FILTER_PROCESS_KEY, FILTER_PROCESS_COMMAND)?;
        self.set_config(FILTER_REQUIRED_KEY, "true")?;
        self.workspace().install_attributes()?;

        writeln!(
            self.writer(),
            "Installed git-fastcdc in {}",
            self.path().display()
        )?;

        Ok(())
    }

    pub(crate) fn uninstall(&self) -> anyhow::Result<()> {
        self.unset_config(FILTER_PROCESS_KEY)?;
        self.unset_config(FILTER_REQUIRED_KEY)?;
        self.workspace().remove_attributes()
    }
}
