//! DCT-based perceptual signatures.
//!
//! Visually similar images (recompressed, resized, lightly edited) land a
//! few bits apart; unrelated images differ in roughly half of the 64 bits.

use image::{DynamicImage, ImageReader, Limits, imageops::FilterType};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

use crate::config::DEFAULT_MAX_DECODE_BYTES;

/// Side of the low-frequency DCT block that becomes the signature.
const HASH_SIDE: u32 = 8;

#[derive(Debug, Error)]
pub enum PerceptualError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decoder panicked on {path}")]
    DecoderPanic { path: String },

    #[error("Unexpected hash length: {len} bytes")]
    HashLength { len: usize },
}

/// 64-bit perceptual signature, packed big-endian from the hash bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualSignature(pub u64);

impl PerceptualSignature {
    /// Hamming distance, in `0..=64`.
    pub fn distance(&self, other: &PerceptualSignature) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, PerceptualError> {
        if bytes.len() != 8 {
            return Err(PerceptualError::HashLength { len: bytes.len() });
        }
        Ok(Self(
            bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        ))
    }
}

impl fmt::Display for PerceptualSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Decodes images under an allocation limit and turns them into signatures.
pub struct PerceptualService {
    hasher: Hasher,
    max_decode_bytes: u64,
}

impl PerceptualService {
    pub fn new(max_decode_bytes: u64) -> Self {
        let hasher = HasherConfig::new()
            .hash_size(HASH_SIDE, HASH_SIDE)
            .preproc_dct()
            .hash_alg(HashAlg::Median)
            .resize_filter(FilterType::Lanczos3)
            .to_hasher();
        Self {
            hasher,
            max_decode_bytes,
        }
    }

    pub fn decode(&self, path: &Path) -> Result<DynamicImage, PerceptualError> {
        let mut reader = ImageReader::open(path)?.with_guessed_format()?;
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_decode_bytes);
        reader.limits(limits);

        // A decoder bug on one corrupt file must not take the worker pool down.
        match panic::catch_unwind(AssertUnwindSafe(move || reader.decode())) {
            Ok(result) => Ok(result?),
            Err(_) => Err(PerceptualError::DecoderPanic {
                path: path.to_string_lossy().to_string(),
            }),
        }
    }

    /// Signature of an already decoded image.
    pub fn signature_of(&self, img: &DynamicImage) -> Result<PerceptualSignature, PerceptualError> {
        let hash = self.hasher.hash_image(img);
        PerceptualSignature::from_bytes(hash.as_bytes())
    }

    pub fn compute_signature(&self, path: &Path) -> Result<PerceptualSignature, PerceptualError> {
        let img = self.decode(path)?;
        self.signature_of(&img)
    }

    /// Decode failures are logged and yield `None`; the file then simply
    /// sits out the visual pass.
    pub fn try_signature(&self, path: &Path) -> Option<PerceptualSignature> {
        match self.compute_signature(path) {
            Ok(signature) => Some(signature),
            Err(e) => {
                log::warn!("Failed to decode {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl Default for PerceptualService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECODE_BYTES)
    }
}
