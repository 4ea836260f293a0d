use crate::areas::batch::CatFileBatch;
use crate::areas::git::GitCommand;
use crate::artifacts::database::BlobReader;
use crate::artifacts::manifest::Manifest;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use file_guard::Lock;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ATTRIBUTES_FILE: &str = ".gitattributes";

/// Attribute routing a path through the filter
pub const FILTER_ATTRIBUTE: &str = "filter=git_fastcdc";

/// Lines keeping the attribute and ignore files themselves out of the filter
pub const PROTECTED_ATTRIBUTES: [&str; 2] = [
    "/.gitattributes text -binary -filter",
    "/.gitignore text -binary -filter",
];

const MANIFEST_PIECE_SIZE: usize = 64 * 1024;

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn attributes_path(&self) -> PathBuf {
        self.path.join(ATTRIBUTES_FILE)
    }

    /// Lines of the top-level attributes file; a missing file has none
    pub fn read_attributes(&self) -> anyhow::Result<Vec<String>> {
        let path = self.attributes_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {:?}", path))?;
        Ok(content.lines().map(str::to_string).collect())
    }

    /// Rewrite the attributes file through `edit`, holding an exclusive lock
    /// for the whole read-modify-write cycle
    pub fn edit_attributes(
        &self,
        edit: impl FnOnce(Vec<String>) -> Vec<String>,
    ) -> anyhow::Result<()> {
        let path = self.attributes_path();
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to open {:?}", path))?;
        let mut lock = file_guard::lock(&mut file, Lock::Exclusive, 0, 1)?;

        let mut content = String::new();
        lock.deref_mut().read_to_string(&mut content)?;
        let lines = edit(content.lines().map(str::to_string).collect());

        let mut updated = lines.join("\n");
        if !updated.is_empty() {
            updated.push('\n');
        }
        let file = lock.deref_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(updated.as_bytes())?;

        Ok(())
    }

    /// Make sure the protected attribute lines are present exactly once, at the end
    pub fn install_attributes(&self) -> anyhow::Result<()> {
        self.edit_attributes(|lines| {
            let mut lines = without_protected(lines);
            while lines.last().is_some_and(|line| line.trim().is_empty()) {
                lines.pop();
            }
            lines.extend(PROTECTED_ATTRIBUTES.iter().map(|line| line.to_string()));
            lines
        })
    }

    pub fn remove_attributes(&self) -> anyhow::Result<()> {
        self.edit_attributes(without_protected)
    }

    /// Route `patterns` through the filter. Returns the patterns that were
    /// not tracked yet.
    pub fn track(&self, patterns: &[String]) -> anyhow::Result<Vec<String>> {
        let mut added = Vec::new();
        self.edit_attributes(|mut lines| {
            for pattern in patterns {
                let tracked = lines
                    .iter()
                    .filter_map(|line| filter_pattern(line))
                    .any(|existing| existing == pattern);
                if !tracked {
                    lines.push(format!("{pattern} {FILTER_ATTRIBUTE}"));
                    added.push(pattern.clone());
                }
            }
            lines
        })?;

        Ok(added)
    }

    /// Patterns of the attribute lines that enable the filter
    pub fn tracked_patterns(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .read_attributes()?
            .iter()
            .filter_map(|line| filter_pattern(line))
            .map(str::to_string)
            .collect())
    }

    /// Files known to git, relative to the top level
    pub fn list_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let output = GitCommand::new(&self.path, &["ls-files", "-z"]).output()?;

        Ok(String::from_utf8_lossy(&output)
            .split('\0')
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    /// Files known to git that the filter applies to and that exist on disk
    pub fn filtered_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let matcher = build_matcher(&self.tracked_patterns()?)?;

        Ok(self
            .list_files()?
            .into_iter()
            .filter(|path| path.file_name().is_some_and(|name| name != ATTRIBUTES_FILE))
            .filter(|path| matcher.is_match(path))
            .filter(|path| {
                let present = self.path.join(path).is_file();
                if !present {
                    debug!(path = %path.display(), "Skipping file missing from the working tree");
                }
                present
            })
            .collect())
    }

    /// Manifests of the given files as git would store them: each file is run
    /// through its clean filter and the result written to the object store.
    pub fn manifests(&self, paths: &[PathBuf]) -> anyhow::Result<Vec<(PathBuf, Manifest)>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut input = Vec::new();
        for path in paths {
            input.extend_from_slice(path.to_string_lossy().as_bytes());
            input.push(b'\n');
        }
        let output = GitCommand::new(&self.path, &["hash-object", "-w", "--stdin-paths"])
            .output_with_input(&input)?;
        let output = String::from_utf8_lossy(&output).into_owned();

        let oids = output
            .lines()
            .map(|line| ObjectId::try_parse(line.trim().to_string()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if oids.len() != paths.len() {
            anyhow::bail!(
                "hash-object returned {} ids for {} files",
                oids.len(),
                paths.len()
            );
        }

        let mut blobs = CatFileBatch::new(self.path.clone());
        paths
            .iter()
            .zip(oids)
            .map(|(path, oid)| {
                let mut content = Vec::new();
                blobs
                    .stream_blob(&oid, MANIFEST_PIECE_SIZE, &mut |piece| {
                        content.extend_from_slice(piece);
                        Ok(())
                    })
                    .with_context(|| format!("Unable to read manifest of {}", path.display()))?;
                Ok((path.clone(), Manifest::parse(&String::from_utf8_lossy(&content))))
            })
            .collect()
    }
}

fn without_protected(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .filter(|line| !PROTECTED_ATTRIBUTES.iter().any(|protected| line.contains(protected)))
        .collect()
}

/// Pattern of an attribute line that sets the filter attribute
fn filter_pattern(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let pattern = tokens.next()?;
    tokens
        .any(|attribute| attribute == FILTER_ATTRIBUTE)
        .then_some(pattern)
}

/// Match paths the way git matches attribute patterns of the top-level file:
/// a pattern without a slash matches the file name at any depth, anything
/// else is anchored at the top level.
pub fn build_matcher(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if pattern.ends_with('/') {
            continue;
        }

        let glob = match pattern.strip_prefix('/') {
            Some(anchored) => anchored.to_string(),
            None if pattern.contains('/') => pattern.clone(),
            None => format!("**/{pattern}"),
        };
        builder.add(
            GlobBuilder::new(&glob)
                .literal_separator(true)
                .build()
                .with_context(|| format!("Invalid attribute pattern {pattern:?}"))?,
        );
    }

    Ok(builder.build()?)
}
