//! Candidate lookup for the visual pass.
//!
//! Both strategies return a superset of the true neighbors of a signature;
//! the grouping engine always confirms with the exact Hamming distance, so
//! the choice of strategy never changes the groups that come out.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::perceptual::PerceptualSignature;

/// Above this many signatures `Auto` switches to the multi-index.
const AUTO_MIN_SIGNATURES: usize = 1024;
/// Beyond this threshold segments get too narrow to prune anything.
const AUTO_MAX_THRESHOLD: u32 = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IndexStrategy {
    /// Pick based on input size and threshold
    #[default]
    Auto,
    /// Compare every pair
    Pairwise,
    /// Bucket signatures by bit segments before comparing
    MultiIndex,
}

impl IndexStrategy {
    fn resolve(self, len: usize, threshold: u32) -> IndexStrategy {
        match self {
            IndexStrategy::Auto => {
                if len > AUTO_MIN_SIGNATURES && threshold <= AUTO_MAX_THRESHOLD {
                    IndexStrategy::MultiIndex
                } else {
                    IndexStrategy::Pairwise
                }
            }
            IndexStrategy::MultiIndex if threshold >= 64 => IndexStrategy::Pairwise,
            other => other,
        }
    }
}

pub enum NeighborIndex {
    Pairwise { len: usize },
    MultiIndex(MultiIndex),
}

impl NeighborIndex {
    pub fn build(signatures: &[PerceptualSignature], threshold: u32, strategy: IndexStrategy) -> Self {
        match strategy.resolve(signatures.len(), threshold) {
            IndexStrategy::MultiIndex => {
                log::debug!(
                    "Using multi-index over {} signatures ({} segments)",
                    signatures.len(),
                    threshold + 1
                );
                NeighborIndex::MultiIndex(MultiIndex::new(signatures, threshold))
            }
            _ => NeighborIndex::Pairwise {
                len: signatures.len(),
            },
        }
    }

    /// Positions that might lie within the threshold of position `i`,
    /// `i` itself possibly included. Appends into `out` after clearing it.
    pub fn candidates(&mut self, i: usize, out: &mut Vec<usize>) {
        out.clear();
        match self {
            NeighborIndex::Pairwise { len } => out.extend(0..*len),
            NeighborIndex::MultiIndex(index) => index.candidates(i, out),
        }
    }
}

/// Splits the 64 bits into `threshold + 1` disjoint segments. Two signatures
/// within the threshold cannot differ in every segment, so they share at
/// least one (segment, value) bucket.
pub struct MultiIndex {
    segments: Vec<(u32, u32)>,
    keys: Vec<Vec<u64>>,
    buckets: HashMap<(usize, u64), Vec<usize>>,
    stamp: Vec<usize>,
    round: usize,
}

impl MultiIndex {
    pub fn new(signatures: &[PerceptualSignature], threshold: u32) -> Self {
        let count = (threshold.min(63) + 1) as usize;
        let segments = segment_bounds(count);

        let mut buckets: HashMap<(usize, u64), Vec<usize>> = HashMap::new();
        let mut keys = Vec::with_capacity(signatures.len());
        for (pos, signature) in signatures.iter().enumerate() {
            let sig_keys: Vec<u64> = segments
                .iter()
                .map(|&(start, width)| segment_value(signature.0, start, width))
                .collect();
            for (seg, &key) in sig_keys.iter().enumerate() {
                buckets.entry((seg, key)).or_default().push(pos);
            }
            keys.push(sig_keys);
        }

        Self {
            segments,
            keys,
            buckets,
            stamp: vec![0; signatures.len()],
            round: 0,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn candidates(&mut self, i: usize, out: &mut Vec<usize>) {
        self.round += 1;
        for (seg, &key) in self.keys[i].iter().enumerate() {
            if let Some(bucket) = self.buckets.get(&(seg, key)) {
                for &pos in bucket {
                    if self.stamp[pos] != self.round {
                        self.stamp[pos] = self.round;
                        out.push(pos);
                    }
                }
            }
        }
    }
}

/// `(start bit, width)` of `count` contiguous segments covering 64 bits.
fn segment_bounds(count: usize) -> Vec<(u32, u32)> {
    let base = 64 / count as u32;
    let extra = 64 % count as u32;
    let mut start = 0;
    (0..count as u32)
        .map(|i| {
            let width = base + u32::from(i < extra);
            let bounds = (start, width);
            start += width;
            bounds
        })
        .collect()
}

fn segment_value(bits: u64, start: u32, width: u32) -> u64 {
    let shifted = bits >> start;
    if width >= 64 {
        shifted
    } else {
        shifted & ((1u64 << width) - 1)
    }
}
