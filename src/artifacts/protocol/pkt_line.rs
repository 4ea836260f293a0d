//! pkt-line framing
//!
//! ```text
//! 0009hello    4 hex digits (length including themselves) + payload
//! 0000         flush packet, no payload
//! ```

use crate::artifacts::protocol::ProtocolError;
use bytes::Bytes;
use std::io::{ErrorKind, Read, Write};

/// Size of the hexadecimal length prefix
pub const PREFIX_SIZE: usize = 4;

/// Largest packet git sends or accepts, prefix included
pub const MAX_PACKET_SIZE: usize = 65520;

/// Largest payload that fits into a single packet
pub const MAX_PAYLOAD: usize = MAX_PACKET_SIZE - PREFIX_SIZE;

const FLUSH: &[u8; PREFIX_SIZE] = b"0000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Data(Bytes),
    Flush,
}

#[derive(Debug)]
pub struct PktLineReader<R> {
    inner: R,
}

impl<R: Read> PktLineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next packet. `None` means the peer closed the stream cleanly
    /// between packets.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, ProtocolError> {
        let mut prefix = [0u8; PREFIX_SIZE];
        let read = self.read_full(&mut prefix)?;
        if read == 0 {
            return Ok(None);
        }
        if read < PREFIX_SIZE {
            return Err(ProtocolError::Truncated {
                expected: PREFIX_SIZE,
                actual: read,
            });
        }

        let length = Self::parse_length(&prefix)?;
        if length == 0 {
            return Ok(Some(Packet::Flush));
        }

        let mut payload = vec![0u8; length - PREFIX_SIZE];
        let read = self.read_full(&mut payload)?;
        if read < payload.len() {
            return Err(ProtocolError::Truncated {
                expected: payload.len(),
                actual: read,
            });
        }

        Ok(Some(Packet::Data(payload.into())))
    }

    /// Read a packet that must exist; end of input is a protocol violation.
    /// A flush packet is returned as `None`.
    pub fn read_data(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        match self.read_packet()? {
            Some(Packet::Data(payload)) => Ok(Some(payload)),
            Some(Packet::Flush) => Ok(None),
            None => Err(ProtocolError::UnexpectedEof),
        }
    }

    /// Read a text packet, trimmed of trailing whitespace. A flush packet is
    /// returned as `None`.
    pub fn read_text(&mut self) -> Result<Option<String>, ProtocolError> {
        match self.read_data()? {
            Some(payload) => Ok(Some(Self::decode_text(payload)?)),
            None => Ok(None),
        }
    }

    /// Read text packets up to the next flush packet
    pub fn read_text_list(&mut self) -> Result<Vec<String>, ProtocolError> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_text()? {
            lines.push(line);
        }

        Ok(lines)
    }

    /// Read every payload up to the next flush packet, handing each to `sink`
    pub fn read_until_flush(
        &mut self,
        mut sink: impl FnMut(&[u8]) -> std::io::Result<()>,
    ) -> Result<u64, ProtocolError> {
        let mut total = 0u64;
        while let Some(payload) = self.read_data()? {
            sink(&payload)?;
            total += payload.len() as u64;
        }

        Ok(total)
    }

    pub fn decode_text(payload: Bytes) -> Result<String, ProtocolError> {
        let text = String::from_utf8(payload.to_vec())?;
        Ok(text.trim_end().to_string())
    }

    fn parse_length(prefix: &[u8; PREFIX_SIZE]) -> Result<usize, ProtocolError> {
        let invalid = || ProtocolError::InvalidLength(String::from_utf8_lossy(prefix).into_owned());

        if !prefix.iter().all(u8::is_ascii_hexdigit) {
            return Err(invalid());
        }
        let text = std::str::from_utf8(prefix).map_err(|_| invalid())?;
        let length = usize::from_str_radix(text, 16).map_err(|_| invalid())?;

        match length {
            0 => Ok(0),
            1..PREFIX_SIZE => Err(invalid()),
            _ => Ok(length),
        }
    }

    /// Fill `buffer` as far as the stream allows, returning the number of bytes
    /// read. Anything short of `buffer.len()` means end of input.
    fn read_full(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(filled)
    }
}

#[derive(Debug)]
pub struct PktLineWriter<W> {
    inner: W,
}

impl<W: Write> PktLineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_packet(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }

        write!(self.inner, "{:04x}", payload.len() + PREFIX_SIZE)?;
        self.inner.write_all(payload)?;
        self.inner.flush()?;

        Ok(())
    }

    /// Write a text packet terminated by a newline
    pub fn write_text(&mut self, line: &str) -> Result<(), ProtocolError> {
        self.write_packet(format!("{line}\n").as_bytes())
    }

    /// Write `content` split into as many packets as needed
    pub fn write_content(&mut self, content: &[u8]) -> Result<(), ProtocolError> {
        for piece in content.chunks(MAX_PAYLOAD) {
            self.write_packet(piece)?;
        }

        Ok(())
    }

    pub fn flush_packet(&mut self) -> Result<(), ProtocolError> {
        self.inner.write_all(FLUSH)?;
        self.inner.flush()?;

        Ok(())
    }
}
