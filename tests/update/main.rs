#[path = "../common/mod.rs"]
mod common;

use assert_fs::TempDir;
use common::command::{installed_repository, work_tree};
use common::file::{random_bytes, staged_manifest, write_file};
use common::{fastcdc_command, git_command, git_output};
use predicates::prelude::predicate;
use rstest::rstest;
use std::collections::BTreeSet;
use std::path::Path;

/// Chunk references recorded anywhere on the index branch
fn indexed_chunks(root: &Path) -> BTreeSet<String> {
    let commits = String::from_utf8(git_output(root, &["rev-list", "git-fastcdc"]))
        .expect("rev-list output is text");

    commits
        .lines()
        .flat_map(|commit| {
            String::from_utf8(git_output(root, &["ls-tree", "--name-only", commit]))
                .expect("ls-tree output is text")
                .lines()
                .filter(|name| name.ends_with(".cdc"))
                .map(|name| name.rsplit('-').next().unwrap_or(name).to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn commit_file(root: &Path, relative: &str, content: &[u8]) -> BTreeSet<String> {
    write_file(root, relative, content);
    git_command(root, &["add", relative]).assert().success();
    git_command(root, &["commit", "--quiet", "-m", relative])
        .assert()
        .success();

    staged_manifest(root, relative).into_iter().collect()
}

#[rstest]
fn update_restores_a_deleted_index(
    #[from(installed_repository)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    let chunks = commit_file(&root, "data.bin", &random_bytes(1, 900_000));
    git_command(&root, &["update-ref", "-d", "refs/heads/git-fastcdc"])
        .assert()
        .success();

    fastcdc_command(&root, &["update"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "{} chunks tracked",
            chunks.len()
        )));

    assert_eq!(indexed_chunks(&root), chunks);

    fastcdc_command(&root, &["update"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Index up to date"));

    Ok(())
}

#[rstest]
fn update_prune_drops_unreferenced_chunks(
    #[from(installed_repository)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    let kept = commit_file(&root, "kept.bin", &random_bytes(2, 700_000));
    let dropped = commit_file(&root, "dropped.bin", &random_bytes(3, 700_000));
    git_command(&root, &["rm", "--quiet", "dropped.bin"])
        .assert()
        .success();

    fastcdc_command(&root, &["update"]).assert().success();
    assert!(indexed_chunks(&root).is_superset(&dropped));

    fastcdc_command(&root, &["update", "--prune"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{} stale", dropped.len())));

    assert_eq!(indexed_chunks(&root), kept);

    Ok(())
}

#[rstest]
fn update_works_from_a_subdirectory(
    #[from(installed_repository)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    commit_file(&root, "deep/inside/file.bin", &random_bytes(4, 300_000));

    fastcdc_command(&root.join("deep/inside"), &["update"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files"));

    Ok(())
}

#[rstest]
fn update_outside_a_repository_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;

    fastcdc_command(dir.path(), &["update"]).assert().failure();

    Ok(())
}
