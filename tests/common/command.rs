use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const BINARY: &str = "git-fastcdc";

/// Environment shared by every command, so that git finds the filter binary
/// and commits without depending on the user's configuration
fn test_env(home: &Path) -> Vec<(String, OsString)> {
    let binary_dir = assert_cmd::cargo::cargo_bin(BINARY)
        .parent()
        .map(PathBuf::from)
        .expect("binary has a parent directory");
    let mut path = vec![binary_dir];
    path.extend(std::env::split_paths(
        &std::env::var_os("PATH").unwrap_or_default(),
    ));

    vec![
        (
            "PATH".to_string(),
            std::env::join_paths(path).expect("valid PATH"),
        ),
        ("HOME".to_string(), home.as_os_str().to_os_string()),
        ("GIT_CONFIG_NOSYSTEM".to_string(), "1".into()),
        ("NO_COLOR".to_string(), "1".into()),
        ("GIT_AUTHOR_NAME".to_string(), "Test Author".into()),
        ("GIT_AUTHOR_EMAIL".to_string(), "author@example.com".into()),
        ("GIT_COMMITTER_NAME".to_string(), "Test Author".into()),
        ("GIT_COMMITTER_EMAIL".to_string(), "author@example.com".into()),
    ]
}

fn home_of(dir: &Path) -> PathBuf {
    dir.parent().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf())
}

pub fn fastcdc_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin(BINARY).expect("Failed to find git-fastcdc binary");
    cmd.envs(test_env(&home_of(dir)));
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.envs(test_env(&home_of(dir)));
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// Stdout of a git command that must succeed
pub fn git_output(dir: &Path, args: &[&str]) -> Vec<u8> {
    git_command(dir, args).assert().success().get_output().stdout.clone()
}

#[fixture]
pub fn repository_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repository = dir.path().join("repository");
    std::fs::create_dir(&repository).expect("Failed to create repository dir");

    git_command(&repository, &["init", "--quiet"])
        .assert()
        .success();

    dir
}

/// Work tree of a fixture created by `repository_dir`
pub fn work_tree(dir: &TempDir) -> PathBuf {
    dir.path().join("repository")
}

#[fixture]
pub fn installed_repository(repository_dir: TempDir) -> TempDir {
    let root = work_tree(&repository_dir);

    fastcdc_command(&root, &["install"]).assert().success();
    fastcdc_command(&root, &["track", "*.bin"]).assert().success();
    git_command(&root, &["add", ".gitattributes"])
        .assert()
        .success();
    git_command(&root, &["commit", "--quiet", "-m", "Track binaries"])
        .assert()
        .success();

    repository_dir
}
