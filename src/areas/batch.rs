//! Persistent `git cat-file --batch` channel
//!
//! ```text
//! request:   <oid>\n
//! response:  <oid> <type> <size>\n<content>\n
//!            <oid> missing\n
//! ```
//!
//! The subprocess is started on the first lookup and kept for the rest of the
//! session. Dropping the channel tears it down without ever blocking for long:
//! pipes are closed, the process gets a short grace period to exit, then
//! SIGTERM, then SIGKILL.

use crate::artifacts::database::BlobReader;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Sleeps between exit checks after the pipes were closed
const EXIT_POLL_STEPS: [Duration; 6] = [
    Duration::from_micros(100),
    Duration::from_millis(1),
    Duration::from_millis(10),
    Duration::from_millis(50),
    Duration::from_millis(100),
    Duration::from_millis(300),
];

/// How long a terminated process may take to exit before it is killed
const TERMINATE_GRACE: Duration = Duration::from_secs(1);

const TERMINATE_POLL: Duration = Duration::from_millis(10);

const READ_BUFFER_SIZE: usize = 64 * 1024;

struct Channel {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
}

pub struct CatFileBatch {
    path: Box<Path>,
    channel: Option<Channel>,
}

impl CatFileBatch {
    pub fn new(path: Box<Path>) -> Self {
        CatFileBatch {
            path,
            channel: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Shut the subprocess down now instead of when the channel is dropped
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.shutdown();
        }
    }

    fn channel(&mut self) -> anyhow::Result<&mut Channel> {
        if self.channel.is_none() {
            self.channel = Some(Channel::open(&self.path)?);
        }

        self.channel
            .as_mut()
            .context("cat-file channel unavailable")
    }
}

impl BlobReader for CatFileBatch {
    fn stream_blob(
        &mut self,
        oid: &ObjectId,
        piece_size: usize,
        sink: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<u64> {
        let result = self.channel()?.stream(oid, piece_size.max(1), sink);

        // The response may be partially consumed; the stream cannot be reused
        if result.is_err() {
            self.close();
        }

        result
    }
}

impl Drop for CatFileBatch {
    fn drop(&mut self) {
        self.close();
    }
}

impl Channel {
    fn open(path: &Path) -> anyhow::Result<Self> {
        debug!("Starting git cat-file --batch");
        let mut child = Command::new("git")
            .current_dir(path)
            .args(["cat-file", "--batch"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Unable to start `git cat-file --batch`")?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .map(|stdout| BufReader::with_capacity(READ_BUFFER_SIZE, stdout));

        Ok(Channel {
            child,
            stdin,
            stdout,
        })
    }

    fn stream(
        &mut self,
        oid: &ObjectId,
        piece_size: usize,
        sink: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
    ) -> anyhow::Result<u64> {
        let stdin = self.stdin.as_mut().context("cat-file stdin closed")?;
        writeln!(stdin, "{oid}").context("Unable to send cat-file request")?;
        stdin.flush()?;

        let stdout = self.stdout.as_mut().context("cat-file stdout closed")?;
        read_response(stdout, oid, piece_size, sink)
    }

    fn shutdown(mut self) {
        drop(self.stdin.take());
        drop(self.stdout.take());

        for step in EXIT_POLL_STEPS {
            if self.exited() {
                return;
            }
            std::thread::sleep(step);
        }

        #[cfg(unix)]
        {
            if let Ok(pid) = libc::pid_t::try_from(self.child.id()) {
                // Safety: the pid belongs to a child that has not been reaped yet
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }

            let deadline = Instant::now() + TERMINATE_GRACE;
            while Instant::now() < deadline {
                if self.exited() {
                    return;
                }
                std::thread::sleep(TERMINATE_POLL);
            }
        }

        warn!(pid = self.child.id(), "git cat-file did not exit, killing it");
        if let Err(err) = self.child.kill() {
            warn!("Unable to kill git cat-file: {err}");
        }
        let _ = self.child.wait();
    }

    fn exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }
}

/// Read one response: header, exactly `size` content bytes handed to `sink`
/// in pieces of at most `piece_size`, then the terminating LF
fn read_response<R: BufRead>(
    stdout: &mut R,
    oid: &ObjectId,
    piece_size: usize,
    sink: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
) -> anyhow::Result<u64> {
    let mut header = String::new();
    if stdout.read_line(&mut header)? == 0 {
        anyhow::bail!("git cat-file exited while reading {oid}");
    }
    let size = parse_header(oid, header.trim_end())?;

    let mut buffer = vec![0u8; piece_size.clamp(1, READ_BUFFER_SIZE)];
    let mut remaining = size;
    while remaining > 0 {
        let want = remaining.min(buffer.len() as u64) as usize;
        stdout
            .read_exact(&mut buffer[..want])
            .with_context(|| format!("Truncated cat-file response for {oid}"))?;
        sink(&buffer[..want])?;
        remaining -= want as u64;
    }

    let mut terminator = [0u8; 1];
    stdout
        .read_exact(&mut terminator)
        .with_context(|| format!("Missing cat-file terminator for {oid}"))?;
    if terminator[0] != b'\n' {
        anyhow::bail!("cat-file stream out of sync after {oid}");
    }

    Ok(size)
}

/// Parse `<oid> <type> <size>`, returning the size of a blob
fn parse_header(oid: &ObjectId, header: &str) -> anyhow::Result<u64> {
    let mut fields = header.split(' ');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(_), Some("missing"), None) => anyhow::bail!("Chunk {oid} is missing"),
        (Some(_), Some(kind), Some(size)) => {
            let kind = ObjectType::try_from(kind)?;
            if kind != ObjectType::Blob {
                anyhow::bail!("Object {oid} is a {kind}, not a blob");
            }
            size.parse::<u64>()
                .with_context(|| format!("Invalid size in cat-file header {header:?}"))
        }
        _ => anyhow::bail!("Unexpected cat-file header {header:?}"),
    }
}
