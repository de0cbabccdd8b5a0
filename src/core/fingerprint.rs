use indicatif::ProgressBar;
use rayon::prelude::*;

use super::hash::{ContentDigest, HashService};
use super::perceptual::{PerceptualService, PerceptualSignature};
use super::scanner::MediaFile;

/// Everything the grouping engine needs to know about one scanned file.
/// Either half may be missing when the file could not be read or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub file_id: usize,
    pub digest: Option<ContentDigest>,
    pub signature: Option<PerceptualSignature>,
}

pub struct Fingerprinter {
    hash_service: HashService,
    perceptual_service: PerceptualService,
}

impl Fingerprinter {
    pub fn new(hash_service: HashService, perceptual_service: PerceptualService) -> Self {
        Self {
            hash_service,
            perceptual_service,
        }
    }

    pub fn fingerprint(&self, file: &MediaFile) -> Fingerprint {
        let digest = self.hash_service.try_content_digest(&file.path);
        let signature = self.perceptual_service.try_signature(&file.path);
        if let (Some(digest), Some(signature)) = (digest, signature) {
            log::debug!("{}: digest {} signature {}", file.path.display(), digest, signature);
        }
        Fingerprint {
            file_id: file.id,
            digest,
            signature,
        }
    }

    /// Fingerprint every file on the current rayon pool. Workers share no
    /// mutable state; the indexed `collect` returns records in scan order.
    pub fn fingerprint_all(&self, files: &[MediaFile], progress: &ProgressBar) -> Vec<Fingerprint> {
        files
            .par_iter()
            .map(|file| {
                let fingerprint = self.fingerprint(file);
                progress.inc(1);
                fingerprint
            })
            .collect()
    }
}
