#[path = "../common/mod.rs"]
mod common;

use assert_fs::TempDir;
use common::command::{installed_repository, repository_dir, work_tree};
use common::file::{file_name, random_bytes, staged_manifest, write_file};
use common::{fastcdc_command, git_command, git_output};
use pretty_assertions::assert_eq;
use regex::Regex;
use rstest::rstest;

const MIB: usize = 1024 * 1024;

#[rstest]
fn large_file_round_trips_through_the_filter(
    #[from(installed_repository)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    let name = file_name("bin");
    let content = random_bytes(42, 2 * MIB);
    write_file(&root, &name, &content);

    git_command(&root, &["add", &name]).assert().success();
    git_command(&root, &["commit", "--quiet", "-m", "Add binary"])
        .assert()
        .success();

    let manifest = staged_manifest(&root, &name);
    let line = Regex::new(r"^([0-9a-f]{40}|[0-9a-f]{64})\.cdc$")?;
    assert!(
        (3..=16).contains(&manifest.len()),
        "unexpected chunk count {}",
        manifest.len()
    );
    assert!(manifest.iter().all(|entry| line.is_match(entry)));

    std::fs::remove_file(root.join(&name))?;
    git_command(&root, &["checkout", "--", &name])
        .assert()
        .success();

    assert_eq!(std::fs::read(root.join(&name))?, content);

    Ok(())
}

#[rstest]
fn identical_files_share_their_manifest(
    #[from(installed_repository)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    let content = random_bytes(7, MIB);
    write_file(&root, "first.bin", &content);
    write_file(&root, "nested/second.bin", &content);

    git_command(&root, &["add", "first.bin", "nested/second.bin"])
        .assert()
        .success();

    assert_eq!(
        staged_manifest(&root, "first.bin"),
        staged_manifest(&root, "nested/second.bin")
    );

    Ok(())
}

#[rstest]
fn clean_records_chunks_on_the_index_branch(
    #[from(installed_repository)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    write_file(&root, "assets/logo.bin", &random_bytes(9, 600_000));

    git_command(&root, &["add", "assets/logo.bin"])
        .assert()
        .success();

    let manifest = staged_manifest(&root, "assets/logo.bin");
    let entries = String::from_utf8(git_output(
        &root,
        &["ls-tree", "--name-only", "git-fastcdc"],
    ))?;
    for chunk in &manifest {
        assert!(
            entries.lines().any(|entry| entry == format!("assets-logo-{chunk}")),
            "{chunk} missing from index:\n{entries}"
        );
    }
    assert!(entries.lines().any(|entry| entry == ".gitattributes"));

    Ok(())
}

#[rstest]
fn unfiltered_files_are_stored_verbatim(
    #[from(installed_repository)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    write_file(&root, "notes.txt", b"plain text\n");

    git_command(&root, &["add", "notes.txt"]).assert().success();

    assert_eq!(
        git_output(&root, &["cat-file", "blob", ":notes.txt"]),
        b"plain text\n".to_vec()
    );

    Ok(())
}

#[rstest]
fn process_answers_the_handshake(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    let input = "0016git-filter-client\n000eversion=2\n0000\
                 0015capability=clean\n0016capability=smudge\n0000\
                 0000";

    fastcdc_command(&root, &["process"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(
            "0016git-filter-server\n000eversion=2\n0000\
             0015capability=clean\n0016capability=smudge\n0000",
        );

    Ok(())
}

#[rstest]
fn process_rejects_a_foreign_client(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);

    fastcdc_command(&root, &["process"])
        .write_stdin("000ahello\n0000")
        .assert()
        .failure();

    Ok(())
}
