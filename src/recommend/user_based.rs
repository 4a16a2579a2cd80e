use std::time::{Duration, Instant};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::info;

use crate::error::{Error, Result};
use crate::io::UserId;
use crate::knn::{top_k, KnnBaseline, Orientation, ScoredIndex};
use crate::recommend::progress_bar;
use crate::stopwatch::Stopwatch;
use crate::tables::PredictionRow;

/// The `n` unrated items with the highest predicted rating for each of the given users.
///
/// Users unknown to the model and users without unrated items get no row.
pub fn user_based(
    model: &KnnBaseline,
    users: &[UserId],
    n: usize,
    show_progress: bool,
) -> Result<Vec<PredictionRow>> {
    if model.orientation() != Orientation::UserBased {
        return Err(Error::InvalidSettings(
            "user predictions require a user-based model".to_string(),
        ));
    }
    let trainset = model.trainset();
    let target_users = users.iter().copied().unique().collect_vec();
    let progress = progress_bar(target_users.len(), "user predictions", show_progress);

    let results: Vec<(Option<PredictionRow>, Duration)> = target_users
        .par_iter()
        .map(|user_id| {
            let start_time = Instant::now();
            let row = trainset.to_inner_user(*user_id).and_then(|user| {
                let candidates = trainset.unrated_items(user);
                if candidates.is_empty() {
                    return None;
                }
                let predictions = candidates
                    .iter()
                    .enumerate()
                    .map(|(position, item)| ScoredIndex::new(position, model.predict(user, *item)));
                let ranked = top_k(predictions, n)
                    .into_iter()
                    .map(|scored| trainset.to_raw_item(candidates[scored.index]).clone())
                    .collect();
                Some(PredictionRow {
                    key: *user_id,
                    ranked,
                })
            });
            progress.inc(1);
            (row, start_time.elapsed())
        })
        .collect();
    progress.finish_and_clear();

    let mut stopwatch = Stopwatch::new();
    let mut rows = Vec::with_capacity(results.len());
    for (row, duration) in results {
        stopwatch.record(duration);
        rows.extend(row);
    }

    info!(
        "Predicted for {} of {} target users, latency p50={:.0} p90={:.0} p99={:.0} micros",
        rows.len(),
        target_users.len(),
        stopwatch.get_percentile_in_micros(0.5),
        stopwatch.get_percentile_in_micros(0.9),
        stopwatch.get_percentile_in_micros(0.99),
    );
    Ok(rows)
}
