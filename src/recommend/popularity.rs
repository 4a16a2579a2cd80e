use std::cmp::Ordering;

use hashbrown::HashMap;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::debug;

use crate::io::{ItemId, Rating};

/// Most popular items by mean rating.
///
/// Only items with more than `count_threshold` ratings qualify. The best `2 * n` candidates
/// leave room for diversification: with `diversity` set, only the first item per attribute value
/// survives, and items without a value share one. Ties on the mean are broken by item id, or
/// randomly but reproducibly when `tie_break_seed` is set.
pub fn popularity(
    ratings: &[Rating],
    diversity: Option<&HashMap<ItemId, Option<String>>>,
    n: usize,
    count_threshold: usize,
    tie_break_seed: Option<u64>,
) -> Vec<ItemId> {
    let mut rating_stats: HashMap<&str, (f64, usize)> = HashMap::new();
    for rating in ratings {
        let (sum, count) = rating_stats.entry(rating.item_id.as_str()).or_insert((0.0, 0));
        *sum += rating.rating;
        *count += 1;
    }

    let mut candidates: Vec<(&str, f64)> = rating_stats
        .into_iter()
        .filter(|(_, (_, count))| *count > count_threshold)
        .map(|(item_id, (sum, count))| (item_id, sum / count as f64))
        .collect();
    debug!(
        "{} items have more than {} ratings",
        candidates.len(),
        count_threshold
    );

    candidates.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
    if let Some(seed) = tie_break_seed {
        candidates.shuffle(&mut Pcg64::seed_from_u64(seed));
    }
    candidates.sort_by(|(_, mean_a), (_, mean_b)| {
        mean_b.partial_cmp(mean_a).unwrap_or(Ordering::Equal)
    });
    candidates.truncate(2 * n);

    let ranked = match diversity {
        Some(attributes) => candidates
            .into_iter()
            .unique_by(|(item_id, _)| attributes.get(*item_id).cloned().flatten())
            .collect_vec(),
        None => candidates,
    };

    ranked
        .into_iter()
        .take(n)
        .map(|(item_id, _)| item_id.to_string())
        .collect()
}
