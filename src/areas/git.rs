//! `git` subprocess invocations
//!
//! Every call runs with the repository top level as working directory and
//! fails with the command line and git's stderr attached.

use anyhow::Context;
use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Identity recorded on index snapshot commits, independent of user config
const INDEX_IDENTITY: [(&str, &str); 4] = [
    ("GIT_AUTHOR_NAME", "git-fastcdc"),
    ("GIT_AUTHOR_EMAIL", "git-fastcdc@localhost"),
    ("GIT_COMMITTER_NAME", "git-fastcdc"),
    ("GIT_COMMITTER_EMAIL", "git-fastcdc@localhost"),
];

pub struct GitCommand {
    command: Command,
    line: String,
}

impl GitCommand {
    pub fn new(root: &Path, args: &[&str]) -> Self {
        let mut command = Command::new("git");
        command.current_dir(root).args(args);

        Self {
            command,
            line: format!("git {}", args.join(" ")),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.line.push(' ');
        self.line.push_str(&arg.as_ref().to_string_lossy());
        self.command.arg(arg);
        self
    }

    /// Commit as the fixed index identity
    pub fn with_index_identity(mut self) -> Self {
        self.command.envs(INDEX_IDENTITY);
        self
    }

    /// Run to completion and return stdout; a non-zero exit is an error
    pub fn output(self) -> anyhow::Result<Vec<u8>> {
        self.run(None)
    }

    /// Like `output`, feeding `input` to stdin first
    pub fn output_with_input(self, input: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.run(Some(input))
    }

    /// Stdout as text, trailing whitespace removed
    pub fn text(self) -> anyhow::Result<String> {
        let output = self.output()?;
        Ok(String::from_utf8_lossy(&output).trim_end().to_string())
    }

    /// Run to completion. Exit code 1 yields `None`, the way git reports an
    /// absent value for `config --get` and `rev-parse --verify --quiet`.
    pub fn lookup(self) -> anyhow::Result<Option<String>> {
        self.lookup_with(1)
    }

    /// Like `lookup`, with `absent` as the exit code meaning "nothing there"
    pub fn lookup_with(mut self, absent: i32) -> anyhow::Result<Option<String>> {
        debug!(command = %self.line, "Running");
        let output = self
            .command
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Unable to run `{}`", self.line))?;

        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            )),
            Some(code) if code == absent => Ok(None),
            _ => Err(failure(&self.line, &output)),
        }
    }

    fn run(mut self, input: Option<&[u8]>) -> anyhow::Result<Vec<u8>> {
        debug!(command = %self.line, "Running");
        let stdin = match input {
            Some(_) => Stdio::piped(),
            None => Stdio::null(),
        };
        let mut child = self
            .command
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Unable to run `{}`", self.line))?;

        // Stdin is fed from its own thread so git never blocks on a full
        // stdout pipe while we are still writing.
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match (input, stdin) {
                (Some(input), Some(mut stdin)) => stdin.write_all(input),
                _ => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.with_context(|| format!("Unable to wait for `{}`", self.line))?;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(anyhow::Error::new(err).context(format!(
                    "Unable to write to `{}` ({}): {}",
                    self.line,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
            Err(_) => anyhow::bail!("Writer for `{}` panicked", self.line),
        }
        if !output.status.success() {
            return Err(failure(&self.line, &output));
        }

        Ok(output.stdout)
    }
}

fn failure(line: &str, output: &Output) -> anyhow::Error {
    anyhow::anyhow!(
        "`{line}` failed ({}): {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn repository() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        GitCommand::new(dir.path(), &["init", "-q"]).output().unwrap();
        dir
    }

    #[rstest]
    fn test_large_input_and_output_do_not_block(repository: TempDir) {
        let requests = "HEAD\n".repeat(100_000);

        let output = GitCommand::new(repository.path(), &["cat-file", "--batch-check"])
            .output_with_input(requests.as_bytes())
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&output).lines().count(), 100_000);
    }

    #[rstest]
    fn test_rejected_input_reports_stderr(repository: TempDir) {
        let input = vec![b'x'; 4 * 1024 * 1024];

        let err = GitCommand::new(repository.path(), &["rev-parse", "--verify", "nowhere"])
            .output_with_input(&input)
            .unwrap_err();

        assert!(format!("{err:#}").contains("single revision"), "{err:#}");
    }

    #[rstest]
    #[case(&["config", "--get", "fastcdc.absent"], None)]
    #[case(&["rev-parse", "--is-inside-work-tree"], Some("true"))]
    fn test_lookup(repository: TempDir, #[case] args: &[&str], #[case] expected: Option<&str>) {
        assert_eq!(
            GitCommand::new(repository.path(), args).lookup().unwrap(),
            expected.map(str::to_string)
        );
    }
}
