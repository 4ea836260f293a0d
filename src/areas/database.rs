use crate::areas::git::GitCommand;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::database::{ObjectStore, RefStore};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use std::path::Path;

/// Object and reference store backed by the repository's own object database
#[derive(Debug)]
pub struct GitDatabase {
    path: Box<Path>,
}

impl GitDatabase {
    pub fn new(path: Box<Path>) -> Self {
        GitDatabase { path }
    }

    fn git(&self, args: &[&str]) -> GitCommand {
        GitCommand::new(&self.path, args)
    }

    fn parse_oid(output: &[u8]) -> anyhow::Result<ObjectId> {
        ObjectId::try_parse(String::from_utf8_lossy(output).trim().to_string())
    }
}

impl ObjectStore for GitDatabase {
    fn write_blob(&self, content: &[u8]) -> anyhow::Result<ObjectId> {
        let output = self
            .git(&["hash-object", "-w", "-t", "blob", "--stdin"])
            .output_with_input(content)?;

        Self::parse_oid(&output)
    }

    fn read_blob(&self, oid: &ObjectId) -> anyhow::Result<Bytes> {
        let output = self.git(&["cat-file", "blob", oid.as_ref()]).output()?;

        Ok(Bytes::from(output))
    }

    fn read_tree(&self, oid: &ObjectId) -> anyhow::Result<Vec<DatabaseEntry>> {
        let output = self.git(&["ls-tree", "-z", oid.as_ref()]).output()?;

        String::from_utf8_lossy(&output)
            .split('\0')
            .filter(|record| !record.is_empty())
            .map(DatabaseEntry::parse_ls_tree_record)
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("Unable to read tree {oid}"))
    }

    fn write_tree(&self, entries: &[DatabaseEntry]) -> anyhow::Result<ObjectId> {
        let input = entries
            .iter()
            .map(|entry| format!("{}\0", entry.to_mktree_record()))
            .collect::<String>();
        let output = self.git(&["mktree", "-z"]).output_with_input(input.as_bytes())?;

        Self::parse_oid(&output)
    }

    fn write_commit(
        &self,
        tree: &ObjectId,
        parent: Option<&ObjectId>,
        message: &str,
    ) -> anyhow::Result<ObjectId> {
        let mut command = self.git(&["commit-tree", tree.as_ref(), "-m", message]);
        if let Some(parent) = parent {
            command = command.arg("-p").arg(parent.as_ref());
        }

        Self::parse_oid(&command.with_index_identity().output()?)
    }

    fn commit_tree(&self, commit: &ObjectId) -> anyhow::Result<ObjectId> {
        let output = self
            .git(&["rev-parse", "--verify", &format!("{commit}^{{tree}}")])
            .output()?;

        Self::parse_oid(&output)
    }

    fn history(&self, tip: &ObjectId, limit: Option<usize>) -> anyhow::Result<Vec<ObjectId>> {
        let mut command = self.git(&["rev-list", "--first-parent"]);
        if let Some(limit) = limit {
            command = command.arg(format!("--max-count={limit}"));
        }
        let output = command.arg(tip.as_ref()).output()?;

        String::from_utf8_lossy(&output)
            .lines()
            .map(|line| ObjectId::try_parse(line.trim().to_string()))
            .collect()
    }
}

impl RefStore for GitDatabase {
    fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        self.git(&["rev-parse", "--verify", "--quiet", &format!("{name}^{{commit}}")])
            .lookup()?
            .map(ObjectId::try_parse)
            .transpose()
    }

    fn update_ref(
        &self,
        name: &str,
        new: &ObjectId,
        expected: Option<&ObjectId>,
    ) -> anyhow::Result<bool> {
        // An all-zero old value asks git to verify the reference does not exist
        let old = match expected {
            Some(expected) => expected.to_string(),
            None => "0".repeat(new.as_ref().len()),
        };

        match self
            .git(&["update-ref", "-m", "git-fastcdc", name, new.as_ref(), &old])
            .output()
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if self.read_ref(name)?.as_ref() != expected {
                    Ok(false)
                } else {
                    Err(err.context(format!("Unable to move {name} to {new}")))
                }
            }
        }
    }
}
