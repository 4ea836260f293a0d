use crate::areas::batch::CatFileBatch;
use crate::areas::database::GitDatabase;
use crate::areas::git::GitCommand;
use crate::areas::workspace::Workspace;
use crate::artifacts::core::config::FilterConfig;
use anyhow::Context;
use std::cell::{RefCell, RefMut};
use std::path::{Path, PathBuf};

/// Exit code of `git config --unset` for a key that is not set
const CONFIG_KEY_ABSENT: i32 = 5;

pub struct Repository {
    path: Box<Path>,
    git_dir: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    database: GitDatabase,
    workspace: Workspace,
}

impl Repository {
    /// Open the repository containing `start`, rooted at its top level
    pub fn discover(start: &Path, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let toplevel = GitCommand::new(start, &["rev-parse", "--show-toplevel"])
            .text()
            .with_context(|| format!("{} is not inside a git work tree", start.display()))?;
        let path = PathBuf::from(toplevel).canonicalize()?;
        let git_dir = GitCommand::new(&path, &["rev-parse", "--absolute-git-dir"]).text()?;

        Ok(Repository {
            path: path.clone().into_boxed_path(),
            git_dir: PathBuf::from(git_dir).into_boxed_path(),
            writer: RefCell::new(writer),
            database: GitDatabase::new(path.clone().into_boxed_path()),
            workspace: Workspace::new(path.into_boxed_path()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &GitDatabase {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// A fresh, not yet started `cat-file --batch` channel
    pub fn blob_reader(&self) -> CatFileBatch {
        CatFileBatch::new(self.path.clone())
    }

    /// Filter settings from the local git config, read once per command
    pub fn config(&self) -> anyhow::Result<FilterConfig> {
        FilterConfig::from_lookup(|key| self.get_config(key))
    }

    pub fn get_config(&self, key: &str) -> anyhow::Result<Option<String>> {
        GitCommand::new(&self.path, &["config", "--local", "--get", key]).lookup()
    }

    pub fn set_config(&self, key: &str, value: &str) -> anyhow::Result<()> {
        GitCommand::new(&self.path, &["config", "--local", key, value]).output()?;
        Ok(())
    }

    /// Remove a key; removing an absent key is not an error
    pub fn unset_config(&self, key: &str) -> anyhow::Result<()> {
        GitCommand::new(&self.path, &["config", "--local", "--unset", key])
            .lookup_with(CONFIG_KEY_ABSENT)?;
        Ok(())
    }
}
