//! Newline-delimited framing shared by client and service.

use std::io::{self, Read, Write};

use serde::Serialize;

/// Upper bound on a single frame, newline included.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Reads one `\n`-terminated frame.
///
/// Returns `Ok(None)` when the peer closes before sending anything. A peer
/// that closes mid-frame yields the partial bytes. Frames over
/// [`MAX_FRAME_BYTES`] fail with `InvalidData`. Bytes after the first newline
/// are discarded: each connection carries exactly one frame per direction.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let bytes_read = read_chunk_with_retry(reader, &mut chunk)?;
        if bytes_read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }
        let received = chunk.get(..bytes_read).unwrap_or_default();
        if let Some(pos) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(received.get(..=pos).unwrap_or_default());
            enforce_frame_limit(buffer.len())?;
            return Ok(Some(buffer));
        }
        buffer.extend_from_slice(received);
        enforce_frame_limit(buffer.len())?;
    }
}

/// Serialises `message` as one JSON line and flushes the writer.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn read_chunk_with_retry<R: Read>(reader: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_frame_limit(size: usize) -> io::Result<()> {
    if size > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame exceeds maximum size",
        ));
    }
    Ok(())
}
