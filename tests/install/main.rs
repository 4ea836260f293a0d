#[path = "../common/mod.rs"]
mod common;

use assert_fs::TempDir;
use common::command::{repository_dir, work_tree};
use common::fastcdc_command;
use fake::Fake;
use fake::faker::lorem::en::Word;
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::Path;

const PROTECTED: &str = "/.gitattributes text -binary -filter\n/.gitignore text -binary -filter\n";

fn config(root: &Path, key: &str) -> Option<String> {
    let output = common::git_command(root, &["config", "--local", "--get", key])
        .output()
        .expect("git config runs");

    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn attributes(root: &Path) -> String {
    std::fs::read_to_string(root.join(".gitattributes")).unwrap_or_default()
}

#[rstest]
fn install_configures_the_filter(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);

    fastcdc_command(&root, &["install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed git-fastcdc"));

    assert_eq!(
        config(&root, "filter.git_fastcdc.process").as_deref(),
        Some("git-fastcdc process")
    );
    assert_eq!(
        config(&root, "filter.git_fastcdc.required").as_deref(),
        Some("true")
    );
    assert_eq!(attributes(&root), PROTECTED);

    Ok(())
}

#[rstest]
fn install_twice_keeps_one_copy(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    std::fs::write(root.join(".gitattributes"), "*.txt text\n")?;

    fastcdc_command(&root, &["install"]).assert().success();
    fastcdc_command(&root, &["install"]).assert().success();

    assert_eq!(attributes(&root), format!("*.txt text\n{PROTECTED}"));

    Ok(())
}

#[rstest]
fn remove_undoes_install(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);
    let pattern = format!("*.{}", Word().fake::<String>());
    fastcdc_command(&root, &["install"]).assert().success();
    fastcdc_command(&root, &["track", &pattern]).assert().success();

    fastcdc_command(&root, &["remove"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed git-fastcdc"));

    assert_eq!(config(&root, "filter.git_fastcdc.process"), None);
    assert_eq!(config(&root, "filter.git_fastcdc.required"), None);
    assert_eq!(
        attributes(&root),
        format!("{pattern} filter=git_fastcdc\n")
    );

    Ok(())
}

#[rstest]
fn remove_without_install_succeeds(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    fastcdc_command(&work_tree(&dir), &["remove"])
        .assert()
        .success();

    Ok(())
}

#[rstest]
fn track_reports_known_patterns(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);

    fastcdc_command(&root, &["track", "*.psd", "*.iso"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracking *.psd"))
        .stdout(predicate::str::contains("Tracking *.iso"));
    fastcdc_command(&root, &["track", "*.psd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("*.psd is already tracked"));

    assert_eq!(
        attributes(&root),
        "*.psd filter=git_fastcdc\n*.iso filter=git_fastcdc\n"
    );

    Ok(())
}

#[rstest]
#[case("on", "true")]
#[case("off", "false")]
fn ondisk_sets_the_spool_mode(
    #[from(repository_dir)] dir: TempDir,
    #[case] switch: &str,
    #[case] expected: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = work_tree(&dir);

    fastcdc_command(&root, &["ondisk", switch]).assert().success();

    assert_eq!(config(&root, "fastcdc.ondisk").as_deref(), Some(expected));

    Ok(())
}

#[rstest]
fn ondisk_rejects_other_values(
    #[from(repository_dir)] dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    fastcdc_command(&work_tree(&dir), &["ondisk", "sometimes"])
        .assert()
        .failure();

    Ok(())
}
