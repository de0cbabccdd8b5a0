// Duplicate grouping.
//
// Exact groups are equivalence classes of content digests. Visual groups are
// connected components of the "within threshold" graph over perceptual
// signatures: single-linkage, so a member only has to be close to *some*
// other member, not to the seed or to everyone. With d(A,B)=3, d(B,C)=3,
// d(A,C)=6 and threshold 5, A, B and C form one group.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use super::fingerprint::Fingerprint;
use super::hash::ContentDigest;
use super::index::{IndexStrategy, NeighborIndex};
use super::perceptual::PerceptualSignature;
use crate::config::DEFAULT_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateType {
    ExactDuplicate,
    VisualDuplicate,
}

impl DuplicateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateType::ExactDuplicate => "exact_duplicate",
            DuplicateType::VisualDuplicate => "visual_duplicate",
        }
    }
}

impl fmt::Display for DuplicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two or more scanned files, by id, in scan order. The first member is the
/// one review and cleanup treat as the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub id: String,
    pub group_type: DuplicateType,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingResult {
    pub exact: Vec<DuplicateGroup>,
    pub visual: Vec<DuplicateGroup>,
}

impl GroupingResult {
    pub fn groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.exact.iter().chain(self.visual.iter())
    }
}

pub struct DuplicateDetector {
    pub threshold: u32,
    pub strategy: IndexStrategy,
    pub collapse_exact: bool,
}

impl DuplicateDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            strategy: IndexStrategy::default(),
            collapse_exact: true,
        }
    }

    pub fn with_strategy(mut self, strategy: IndexStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_collapse_exact(mut self, collapse_exact: bool) -> Self {
        self.collapse_exact = collapse_exact;
        self
    }

    /// Run both passes on the calling thread. Call only once every
    /// fingerprint is in.
    pub fn detect(&self, fingerprints: &[Fingerprint]) -> GroupingResult {
        let mut ordered: Vec<&Fingerprint> = fingerprints.iter().collect();
        ordered.sort_by_key(|f| f.file_id);

        let exact = self.exact_groups(&ordered);

        let shadowed: HashSet<usize> = if self.collapse_exact {
            exact
                .iter()
                .flat_map(|group| group.members.iter().skip(1).copied())
                .collect()
        } else {
            HashSet::new()
        };

        let entries: Vec<(usize, PerceptualSignature)> = ordered
            .iter()
            .filter(|f| !shadowed.contains(&f.file_id))
            .filter_map(|f| f.signature.map(|s| (f.file_id, s)))
            .collect();

        let visual = self.visual_groups(&entries);

        log::info!(
            "Found {} exact and {} visual duplicate group(s)",
            exact.len(),
            visual.len()
        );

        GroupingResult { exact, visual }
    }

    /// Partition by digest. Groups come out in order of their first member.
    fn exact_groups(&self, ordered: &[&Fingerprint]) -> Vec<DuplicateGroup> {
        let mut slots: HashMap<ContentDigest, usize> = HashMap::new();
        let mut classes: Vec<(ContentDigest, Vec<usize>)> = Vec::new();

        for fingerprint in ordered {
            let Some(digest) = fingerprint.digest else {
                continue;
            };
            let slot = *slots.entry(digest).or_insert_with(|| {
                classes.push((digest, Vec::new()));
                classes.len() - 1
            });
            classes[slot].1.push(fingerprint.file_id);
        }

        classes
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(digest, members)| DuplicateGroup {
                id: digest.to_hex(),
                group_type: DuplicateType::ExactDuplicate,
                members,
            })
            .collect()
    }

    /// `entries` must be in scan order; group ids are assigned in the order
    /// seeds are met.
    pub fn visual_groups(&self, entries: &[(usize, PerceptualSignature)]) -> Vec<DuplicateGroup> {
        let signatures: Vec<PerceptualSignature> = entries.iter().map(|(_, s)| *s).collect();

        cluster(&signatures, self.threshold, self.strategy)
            .into_iter()
            .enumerate()
            .map(|(n, positions)| DuplicateGroup {
                id: format!("visual_group_{}", n),
                group_type: DuplicateType::VisualDuplicate,
                members: positions.into_iter().map(|p| entries[p].0).collect(),
            })
            .collect()
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

/// Single-linkage clustering over positions in `signatures`.
///
/// Each unvisited position seeds a component; a breadth-first expansion pulls
/// in every unvisited position within `threshold` of any member. Components
/// of one are dropped. Members are sorted, so the seed is always first.
pub fn cluster(
    signatures: &[PerceptualSignature],
    threshold: u32,
    strategy: IndexStrategy,
) -> Vec<Vec<usize>> {
    let mut index = NeighborIndex::build(signatures, threshold, strategy);
    let mut visited = vec![false; signatures.len()];
    let mut candidates = Vec::new();
    let mut queue = VecDeque::new();
    let mut components = Vec::new();

    for seed in 0..signatures.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut component = vec![seed];
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            index.candidates(current, &mut candidates);
            for &other in &candidates {
                if visited[other] {
                    continue;
                }
                if signatures[current].distance(&signatures[other]) <= threshold {
                    visited[other] = true;
                    component.push(other);
                    queue.push_back(other);
                }
            }
        }

        if component.len() > 1 {
            component.sort_unstable();
            components.push(component);
        }
    }

    components
}
