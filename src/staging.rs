//! Staging of uploaded chart archives on local disk.
//!
//! An upload stream can only be read once, but packaging needs the bytes
//! several times. [`TemporaryArtifact`] copies the stream into a named
//! temporary file whose suffix records its format; the file is removed when
//! the artifact is dropped, whichever way the caller exits.

use crate::error::Result;
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Compression of an archive, sniffed from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    pub fn from_filename(filename: &str) -> Self {
        if filename.ends_with(".bz2") {
            Compression::Bzip2
        } else if filename.ends_with(".tgz") || filename.ends_with(".tar.gz") {
            Compression::Gzip
        } else {
            Compression::None
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(Self::from_filename)
            .unwrap_or(Compression::None)
    }

    /// Wraps `input` so that it yields uncompressed tar bytes.
    ///
    /// Every member of a multi-member gzip or bzip2 stream is decoded.
    pub fn decoder<'a, R: Read + 'a>(self, input: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(input),
            Compression::Gzip => Box::new(MultiGzDecoder::new(input)),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(input)),
        }
    }
}

#[derive(Debug)]
pub struct TemporaryArtifact {
    file: NamedTempFile,
}

impl TemporaryArtifact {
    fn create(suffix: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("helm2oci-")
            .suffix(suffix)
            .tempfile()?;
        Ok(Self { file })
    }

    /// Stages `input` as an uncompressed `.tar`, whatever its compression.
    pub fn stage_tar<R: Read>(input: R, filename: &str) -> Result<Self> {
        let staged = Self::create(".tar")?;
        let mut decoded = Compression::from_filename(filename).decoder(input);
        let mut out = staged.file.as_file();
        let copied = io::copy(&mut decoded, &mut out)?;
        out.flush()?;
        log::debug!(
            "Staged {} as tar ({} bytes) at {}",
            filename,
            copied,
            staged.path().display()
        );
        Ok(staged)
    }

    /// Stages `input` as a gzip-compressed `.tgz`.
    ///
    /// Bzip2 input is decompressed first; anything not already gzip is
    /// compressed on the way in.
    pub fn stage_tgz<R: Read>(input: R, filename: &str) -> Result<Self> {
        let staged = Self::create(".tgz")?;
        let compression = Compression::from_filename(filename);
        let mut out = staged.file.as_file();
        let copied = match compression {
            Compression::Gzip => io::copy(&mut { input }, &mut out)?,
            Compression::None | Compression::Bzip2 => {
                let mut decoded = compression.decoder(input);
                let mut encoder = GzEncoder::new(out, flate2::Compression::default());
                let copied = io::copy(&mut decoded, &mut encoder)?;
                encoder.finish()?;
                copied
            }
        };
        log::debug!(
            "Staged {} as tgz ({} input bytes) at {}",
            filename,
            copied,
            staged.path().display()
        );
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
