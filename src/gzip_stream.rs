//! Pull-based gzip encoder.
//!
//! [`GzipStreamEncoder`] wraps any reader and yields a single gzip member
//! without holding the payload in memory. Output is produced in three phases:
//! a fixed 10-byte header, the raw deflate body, then an 8-byte trailer with
//! the CRC-32 and length of the uncompressed input. The trailer is only
//! computed once the body has been fully drained.

use flate2::read::DeflateEncoder;
use flate2::{Compression, CrcReader};
use std::io::{self, Read};

const GZIP_MAGIC: u16 = 0x8b1f;
const CM_DEFLATE: u8 = 8;
const TRAILER_SIZE: usize = 8;

/// Gzip header: magic, CM=deflate, no flags, MTIME=0, XFL=0, OS=0.
pub const GZIP_HEADER: [u8; 10] = [
    (GZIP_MAGIC & 0xff) as u8,
    (GZIP_MAGIC >> 8) as u8,
    CM_DEFLATE,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
];

#[derive(Debug)]
enum Phase {
    Header { pos: usize },
    Body,
    Trailer { bytes: [u8; TRAILER_SIZE], pos: usize },
    Done,
}

/// Encodes one input stream into one gzip member, once.
pub struct GzipStreamEncoder<R: Read> {
    body: DeflateEncoder<CrcReader<R>>,
    phase: Phase,
}

impl<R: Read> GzipStreamEncoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            body: DeflateEncoder::new(CrcReader::new(inner), Compression::default()),
            phase: Phase::Header { pos: 0 },
        }
    }

    fn trailer(&self) -> [u8; TRAILER_SIZE] {
        let crc = self.body.get_ref().crc();
        let mut bytes = [0u8; TRAILER_SIZE];
        bytes[..4].copy_from_slice(&crc.sum().to_le_bytes());
        // amount() already wraps modulo 2^32
        bytes[4..].copy_from_slice(&crc.amount().to_le_bytes());
        bytes
    }
}

impl<R: Read> Read for GzipStreamEncoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match &mut self.phase {
                Phase::Header { pos } => {
                    let n = copy_from(&GZIP_HEADER, pos, buf);
                    if *pos == GZIP_HEADER.len() {
                        self.phase = Phase::Body;
                    }
                    return Ok(n);
                }
                Phase::Body => {
                    let n = self.body.read(buf)?;
                    if n > 0 {
                        return Ok(n);
                    }
                    self.phase = Phase::Trailer {
                        bytes: self.trailer(),
                        pos: 0,
                    };
                }
                Phase::Trailer { bytes, pos } => {
                    let n = copy_from(bytes, pos, buf);
                    if *pos == TRAILER_SIZE {
                        self.phase = Phase::Done;
                    }
                    return Ok(n);
                }
                Phase::Done => return Ok(0),
            }
        }
    }
}

fn copy_from(src: &[u8], pos: &mut usize, dst: &mut [u8]) -> usize {
    let n = (src.len() - *pos).min(dst.len());
    dst[..n].copy_from_slice(&src[*pos..*pos + n]);
    *pos += n;
    n
}
