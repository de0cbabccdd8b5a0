use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

use crate::config::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hash used to fold file content into a [`ContentDigest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5, matching reports written by earlier versions of the tool
    #[default]
    Md5,
    /// BLAKE3 output truncated to 128 bits
    Blake3,
}

/// 128-bit digest of a file's full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(pub [u8; 16]);

impl ContentDigest {
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

enum StreamHasher {
    Md5(md5::Context),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(chunk),
            Self::Blake3(hasher) => {
                hasher.update(chunk);
            }
        }
    }

    fn finish(self) -> ContentDigest {
        match self {
            Self::Md5(ctx) => ContentDigest(ctx.compute().0),
            Self::Blake3(hasher) => {
                let mut out = [0u8; 16];
                hasher.finalize_xof().fill(&mut out);
                ContentDigest(out)
            }
        }
    }
}

/// Computes exact-content digests by streaming files in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct HashService {
    algorithm: DigestAlgorithm,
    chunk_size: usize,
}

impl HashService {
    pub fn new(algorithm: DigestAlgorithm, chunk_size: usize) -> Self {
        Self {
            algorithm,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Compute the content digest of `file_path` without loading the whole
    /// file into memory.
    pub fn compute_content_digest(&self, file_path: &Path) -> Result<ContentDigest, HashError> {
        let file = File::open(file_path)?;
        let mut reader = BufReader::with_capacity(self.chunk_size, file);
        let mut hasher = StreamHasher::new(self.algorithm);
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finish())
    }

    /// Like [`compute_content_digest`](Self::compute_content_digest), but an
    /// unreadable file is logged and yields `None` so a bulk scan keeps going.
    pub fn try_content_digest(&self, file_path: &Path) -> Option<ContentDigest> {
        match self.compute_content_digest(file_path) {
            Ok(digest) => Some(digest),
            Err(e) => {
                log::warn!("Failed to compute hash for {}: {}", file_path.display(), e);
                None
            }
        }
    }
}

impl Default for HashService {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default(), DEFAULT_CHUNK_SIZE)
    }
}
