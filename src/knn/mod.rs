use std::cmp::Ordering;

use dary_heap::OctonaryHeap;

pub mod baseline;
pub mod model;
pub mod similarity;
pub mod trainset;

pub use model::{KnnBaseline, KnnOptions};
pub use trainset::Trainset;

/// Which axis of the rating matrix the similarities are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Similarities between items, computed over the users who rated both.
    ItemBased,
    /// Similarities between users, computed over the items both rated.
    UserBased,
}

impl Orientation {
    /// Maps a (user, item) pair onto (similarity axis, other axis).
    pub fn switch(&self, user: usize, item: usize) -> (usize, usize) {
        match self {
            Orientation::ItemBased => (item, user),
            Orientation::UserBased => (user, item),
        }
    }
}

/// A candidate at position `index` with its score.
///
/// The ordering is reversed: a candidate with a higher score, or the same score and a lower index,
/// compares as smaller. A heap of these therefore keeps its worst candidate on top.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ScoredIndex {
    pub index: usize,
    pub score: f64,
}

impl ScoredIndex {
    pub fn new(index: usize, score: f64) -> Self {
        ScoredIndex { index, score }
    }
}

impl Eq for ScoredIndex {}

impl Ord for ScoredIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.score.partial_cmp(&self.score) {
            Some(Ordering::Equal) | None => self.index.cmp(&other.index),
            Some(ordering) => ordering,
        }
    }
}

impl PartialOrd for ScoredIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns the `k` best candidates, best first. Equal scores keep the lower index first.
pub fn top_k<I>(candidates: I, k: usize) -> Vec<ScoredIndex>
where
    I: IntoIterator<Item = ScoredIndex>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap = OctonaryHeap::<ScoredIndex>::with_capacity(k);
    for candidate in candidates {
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(mut bottom) = heap.peek_mut() {
            if candidate < *bottom {
                *bottom = candidate;
            }
        }
    }
    heap.into_sorted_vec()
}
