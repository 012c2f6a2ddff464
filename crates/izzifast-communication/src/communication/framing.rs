//! Frame extraction from a raw byte stream
//!
//! The bus has no start-of-frame marker beyond the discriminator byte, so a
//! reader that joins mid-frame scans byte by byte until a known discriminator
//! shows up, then takes the rest of the frame as a block. The timeout of each
//! blocking read is whatever the underlying stream is configured with.

use super::TransportResult;
use crate::firmware::izzi::constants::FRAME_LEN;
use crate::firmware::izzi::{Frame, FrameKind};
use izzifast_core::ConnectionError;
use std::io::{self, Read};

/// Size of the scratch buffer used when draining stale input
const DRAIN_CHUNK: usize = 1024;

/// Result of a single blocking read
enum ReadStep {
    Data(usize),
    TimedOut,
}

fn read_step<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> TransportResult<ReadStep> {
    loop {
        match reader.read(buf) {
            Ok(0) => {
                return Err(ConnectionError::ConnectionLost {
                    reason: "stream closed by peer".to_string(),
                })
            }
            Ok(n) => return Ok(ReadStep::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => return Ok(ReadStep::TimedOut),
            Err(e) => {
                return Err(ConnectionError::ConnectionLost {
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Read one frame, resynchronizing on the discriminator byte
///
/// Returns `Ok(None)` when any read times out before the frame is complete.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> TransportResult<Option<Frame>> {
    let mut bytes = [0u8; FRAME_LEN];

    loop {
        match read_step(reader, &mut bytes[..1])? {
            ReadStep::TimedOut => return Ok(None),
            ReadStep::Data(_) => {}
        }
        if FrameKind::from_discriminator(bytes[0]).is_known() {
            break;
        }
        tracing::trace!("Skipping byte {:02x} while resynchronizing", bytes[0]);
    }

    let mut filled = 1;
    while filled < FRAME_LEN {
        match read_step(reader, &mut bytes[filled..])? {
            ReadStep::TimedOut => {
                tracing::debug!("Partial frame dropped after {} bytes", filled);
                return Ok(None);
            }
            ReadStep::Data(n) => filled += n,
        }
    }

    let frame = Frame::new(bytes);
    tracing::debug!("RX {}", frame.to_hex());
    Ok(Some(frame))
}

/// Discard everything readable until the stream goes quiet
///
/// Returns the number of bytes thrown away.
pub fn drain<R: Read + ?Sized>(reader: &mut R) -> TransportResult<usize> {
    let mut scratch = [0u8; DRAIN_CHUNK];
    let mut discarded = 0;
    loop {
        match read_step(reader, &mut scratch)? {
            ReadStep::TimedOut => break,
            ReadStep::Data(n) => discarded += n,
        }
    }
    if discarded > 0 {
        tracing::debug!("Drained {} stale bytes", discarded);
    }
    Ok(discarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::izzi::constants::{COMMAND_FRAME_ID, STATUS_FRAME_ID};
    use std::collections::VecDeque;

    /// Scripted reader: each chunk is returned by one read, then timeouts
    struct ChunkReader {
        chunks: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ChunkReader {
        fn new(chunks: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                chunks: chunks.into(),
            }
        }
    }

    impl Read for ChunkReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "timeout")),
                Some(Err(e)) => Err(e),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        chunk.drain(..n);
                        self.chunks.push_front(Ok(chunk));
                    }
                    Ok(n)
                }
            }
        }
    }

    fn frame_bytes(id: u8, fill: u8) -> Vec<u8> {
        let mut v = vec![fill; FRAME_LEN];
        v[0] = id;
        v
    }

    #[test]
    fn test_reads_aligned_frame() {
        let mut reader = ChunkReader::new(vec![Ok(frame_bytes(STATUS_FRAME_ID, 7))]);
        let frame = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(frame.kind(), FrameKind::Status);
        assert_eq!(frame.u8_at(FRAME_LEN - 1), 7);
    }

    #[test]
    fn test_resyncs_past_garbage() {
        let mut stream = vec![0x00, 0xFF, 0x12];
        stream.extend(frame_bytes(COMMAND_FRAME_ID, 1));
        let mut reader = ChunkReader::new(vec![Ok(stream)]);
        let frame = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(frame.kind(), FrameKind::Command);
        assert_eq!(frame.u8_at(1), 1);
    }

    #[test]
    fn test_frame_split_across_reads() {
        let bytes = frame_bytes(STATUS_FRAME_ID, 9);
        let mut reader = ChunkReader::new(vec![
            Ok(bytes[..1].to_vec()),
            Ok(bytes[1..6].to_vec()),
            Ok(bytes[6..].to_vec()),
        ]);
        assert!(read_frame(&mut reader).unwrap().is_some());
    }

    #[test]
    fn test_partial_frame_is_a_timeout() {
        let bytes = frame_bytes(STATUS_FRAME_ID, 9);
        let mut reader = ChunkReader::new(vec![Ok(bytes[..8].to_vec())]);
        assert!(read_frame(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_silence_is_a_timeout() {
        let mut reader = ChunkReader::new(vec![]);
        assert!(read_frame(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_eof_is_connection_lost() {
        let mut reader = ChunkReader::new(vec![Ok(vec![])]);
        assert!(matches!(
            read_frame(&mut reader),
            Err(ConnectionError::ConnectionLost { .. })
        ));
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let mut reader = ChunkReader::new(vec![
            Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
            Ok(frame_bytes(STATUS_FRAME_ID, 2)),
        ]);
        assert!(read_frame(&mut reader).unwrap().is_some());
    }

    #[test]
    fn test_drain_discards_until_quiet() {
        let mut reader = ChunkReader::new(vec![Ok(vec![1; 10]), Ok(vec![2; 5])]);
        assert_eq!(drain(&mut reader).unwrap(), 15);
        assert!(read_frame(&mut reader).unwrap().is_none());
    }
}
