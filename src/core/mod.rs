// Duplicate detection core plus the collaborators that consume its report:
// - scanning and fingerprinting (content digest, perceptual signature)
// - exact and single-linkage visual grouping
// - CSV report store
// - date heuristics, date-folder moves, cleanup, review planning, history

pub mod analysis;
pub mod cleanup;
pub mod dating;
pub mod duplicate;
pub mod exif;
pub mod fingerprint;
pub mod hash;
pub mod history;
pub mod index;
pub mod organize;
pub mod perceptual;
pub mod quality;
pub mod report;
pub mod scanner;

#[cfg(test)]
pub(crate) mod testing;
