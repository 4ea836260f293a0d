//! Filter session
//!
//! One session serves one `git-fastcdc process` invocation:
//!
//! ```text
//! git                                   filter
//! git-filter-client, version=2, 0000 -> 
//!                                    <- git-filter-server, version=2, 0000
//! capability=clean, ..., 0000        ->
//!                                    <- capability=clean, capability=smudge, 0000
//! command=clean, pathname=..., 0000  ->
//! content..., 0000                   ->
//!                                    <- status=success, 0000
//!                                    <- content..., 0000, 0000
//! ...
//! 0000 or end of input
//! ```
//!
//! When the command loop ends, chunks produced by clean commands that the
//! recent index window does not know yet are recorded in the index.

use crate::artifacts::chunking::sizer::ChunkSizer;
use crate::artifacts::core::config::FilterConfig;
use crate::artifacts::database::{BlobReader, ObjectStore, RefStore};
use crate::artifacts::index::{AppendOutcome, DedupIndex};
use crate::artifacts::manifest::Manifest;
use crate::artifacts::manifest::hint::Hint;
use crate::artifacts::manifest::path_kind::PathKind;
use crate::artifacts::pipeline::clean::Cleaner;
use crate::artifacts::pipeline::smudge::smudge;
use crate::artifacts::pipeline::spool::Spool;
use crate::artifacts::protocol::ProtocolError;
use crate::artifacts::protocol::capability::Capabilities;
use crate::artifacts::protocol::pkt_line::{Packet, PktLineReader, PktLineWriter};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CLIENT_WELCOME: &str = "git-filter-client";
const SERVER_WELCOME: &str = "git-filter-server";
const PROTOCOL_VERSION: &str = "version=2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clean,
    Smudge,
}

impl TryFrom<&str> for Command {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "clean" => Ok(Command::Clean),
            "smudge" => Ok(Command::Smudge),
            other => Err(ProtocolError::UnexpectedCommand(other.to_string())),
        }
    }
}

/// One command sent by git
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub pathname: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub commands: usize,
    pub cleaned: usize,
    pub smudged: usize,
    pub passed_through: usize,
    pub failed: usize,
    pub chunks: usize,
    pub stored: usize,
    pub index: Option<AppendOutcome>,
}

enum Status {
    Success,
    Error,
}

impl Status {
    fn line(&self) -> &'static str {
        match self {
            Status::Success => "status=success",
            Status::Error => "status=error",
        }
    }
}

pub struct FilterSession<'s, S, B> {
    store: &'s S,
    blobs: B,
    config: FilterConfig,
    spool_dir: PathBuf,
    cleaner: Cleaner<'s, S>,
    summary: SessionSummary,
}

impl<'s, S, B> FilterSession<'s, S, B>
where
    S: ObjectStore + RefStore,
    B: BlobReader,
{
    /// `spool_dir` receives the temporary files of on-disk spooling, normally
    /// the repository's git directory.
    pub fn new(store: &'s S, blobs: B, config: FilterConfig, spool_dir: &Path) -> Self {
        Self {
            store,
            blobs,
            config,
            spool_dir: spool_dir.to_path_buf(),
            cleaner: Cleaner::new(store, ChunkSizer::default()),
            summary: SessionSummary::default(),
        }
    }

    pub fn with_sizer(mut self, sizer: ChunkSizer) -> Self {
        self.cleaner = Cleaner::new(self.store, sizer);
        self
    }

    /// Serve git until it closes the command loop, then update the index
    pub fn run<R: Read, W: Write>(mut self, input: R, output: W) -> anyhow::Result<SessionSummary> {
        let mut reader = PktLineReader::new(input);
        let mut writer = PktLineWriter::new(output);

        handshake(&mut reader, &mut writer)?;
        debug!("Handshake complete");

        while let Some(request) = read_request(&mut reader)? {
            self.summary.commands += 1;
            self.serve(&request, &mut reader, &mut writer)?;
        }

        self.finish()
    }

    fn serve<R: Read, W: Write>(
        &mut self,
        request: &Request,
        reader: &mut PktLineReader<R>,
        writer: &mut PktLineWriter<W>,
    ) -> anyhow::Result<()> {
        debug!(command = ?request.command, pathname = %request.pathname.display(), "Serving");

        match (PathKind::resolve(&request.pathname), request.command) {
            (PathKind::Passthrough, _) => self.pass_through(reader, writer),
            (PathKind::Chunked { hint }, Command::Clean) => {
                self.clean(&request.pathname, hint.as_ref(), reader, writer)
            }
            (PathKind::Chunked { .. }, Command::Smudge) => self.smudge(reader, writer),
        }
    }

    fn pass_through<R: Read, W: Write>(
        &mut self,
        reader: &mut PktLineReader<R>,
        writer: &mut PktLineWriter<W>,
    ) -> anyhow::Result<()> {
        let mut content = Vec::new();
        reader.read_until_flush(|payload| {
            content.extend_from_slice(payload);
            Ok(())
        })?;

        respond(writer, Status::Success)?;
        writer.write_content(&content)?;
        finish_response(writer)?;
        self.summary.passed_through += 1;

        Ok(())
    }

    fn clean<R: Read, W: Write>(
        &mut self,
        pathname: &Path,
        hint: Option<&Hint>,
        reader: &mut PktLineReader<R>,
        writer: &mut PktLineWriter<W>,
    ) -> anyhow::Result<()> {
        let spooled = match Spool::create(self.config.spool, &self.spool_dir) {
            Ok(mut spool) => spool.fill(reader)?.map(|()| spool),
            Err(err) => {
                reader.read_until_flush(|_| Ok(()))?;
                Err(err)
            }
        };

        let mut spool = match spooled {
            Ok(spool) => spool,
            Err(err) => {
                warn!(pathname = %pathname.display(), "Unable to clean: {err:#}");
                respond(writer, Status::Error)?;
                self.summary.failed += 1;
                return Ok(());
            }
        };

        let bounds = self.cleaner.bounds_for(spool.len());
        debug!(size = spool.len(), average = bounds.avg, "Chunking");
        respond(writer, Status::Success)?;

        let chunks = self.cleaner.clean(&mut spool, bounds, hint, |chunk| {
            writer.write_text(&chunk.to_string())?;
            Ok(())
        })?;
        finish_response(writer)?;

        debug!(pathname = %pathname.display(), chunks, "Cleaned");
        self.summary.cleaned += 1;

        Ok(())
    }

    fn smudge<R: Read, W: Write>(
        &mut self,
        reader: &mut PktLineReader<R>,
        writer: &mut PktLineWriter<W>,
    ) -> anyhow::Result<()> {
        let mut text = Vec::new();
        reader.read_until_flush(|payload| {
            text.extend_from_slice(payload);
            Ok(())
        })?;
        let manifest = Manifest::parse(&String::from_utf8_lossy(&text));

        respond(writer, Status::Success)?;
        let size = smudge(&mut self.blobs, &manifest, &mut |piece| {
            writer.write_packet(piece)?;
            Ok(())
        })?;
        finish_response(writer)?;

        debug!(chunks = manifest.len(), size, "Smudged");
        self.summary.smudged += 1;

        Ok(())
    }

    fn finish(mut self) -> anyhow::Result<SessionSummary> {
        let stats = self.cleaner.stats();
        self.summary.chunks = stats.chunks;
        self.summary.stored = stats.stored;

        let working = self.cleaner.into_working_set();
        if !working.is_empty() {
            let index = DedupIndex::new(self.store, self.config.snapshot_capacity);
            self.summary.index = Some(index.record_session(&working, self.config.window)?);
        }

        info!(
            commands = self.summary.commands,
            chunks = self.summary.chunks,
            stored = self.summary.stored,
            "Filter session finished"
        );

        Ok(self.summary)
    }
}

fn handshake<R: Read, W: Write>(
    reader: &mut PktLineReader<R>,
    writer: &mut PktLineWriter<W>,
) -> Result<(), ProtocolError> {
    let welcome = reader.read_text_list()?;
    match welcome.first() {
        Some(line) if line == CLIENT_WELCOME => {}
        other => {
            return Err(ProtocolError::Handshake {
                expected: CLIENT_WELCOME.to_string(),
                received: other.cloned().unwrap_or_default(),
            });
        }
    }
    if !welcome.iter().skip(1).any(|line| line == PROTOCOL_VERSION) {
        return Err(ProtocolError::Handshake {
            expected: PROTOCOL_VERSION.to_string(),
            received: welcome[1..].join(" "),
        });
    }

    writer.write_text(SERVER_WELCOME)?;
    writer.write_text(PROTOCOL_VERSION)?;
    writer.flush_packet()?;

    let mut offered = Capabilities::empty();
    for line in reader.read_text_list()? {
        let name = line
            .strip_prefix("capability=")
            .ok_or_else(|| ProtocolError::UnexpectedKey {
                expected: "capability",
                received: line.clone(),
            })?;
        if let Some(capability) = Capabilities::from_capability(name) {
            offered |= capability;
        }
    }
    if !offered.contains(Capabilities::CLEAN) {
        return Err(ProtocolError::MissingCapability("clean"));
    }
    if !offered.contains(Capabilities::SMUDGE) {
        return Err(ProtocolError::MissingCapability("smudge"));
    }

    for name in Capabilities::SUPPORTED.names() {
        writer.write_text(&format!("capability={name}"))?;
    }
    writer.flush_packet()?;

    Ok(())
}

/// Read the next command header. A flush packet or end of input instead of a
/// command ends the loop.
fn read_request<R: Read>(reader: &mut PktLineReader<R>) -> Result<Option<Request>, ProtocolError> {
    let first = match reader.read_packet()? {
        None | Some(Packet::Flush) => return Ok(None),
        Some(Packet::Data(payload)) => PktLineReader::<R>::decode_text(payload)?,
    };
    let command = first
        .strip_prefix("command=")
        .ok_or_else(|| ProtocolError::UnexpectedKey {
            expected: "command",
            received: first.clone(),
        })
        .and_then(Command::try_from)?;

    let metadata = reader.read_text_list()?;
    let pathname = metadata
        .iter()
        .find_map(|line| line.strip_prefix("pathname="))
        .ok_or_else(|| ProtocolError::UnexpectedKey {
            expected: "pathname",
            received: metadata.join(" "),
        })?;

    Ok(Some(Request {
        command,
        pathname: PathBuf::from(pathname),
    }))
}

fn respond<W: Write>(writer: &mut PktLineWriter<W>, status: Status) -> Result<(), ProtocolError> {
    writer.write_text(status.line())?;
    writer.flush_packet()
}

/// Close the content list and the (empty) trailing status list
fn finish_response<W: Write>(writer: &mut PktLineWriter<W>) -> Result<(), ProtocolError> {
    writer.flush_packet()?;
    writer.flush_packet()
}
