use rayon::prelude::*;
use tracing::info;

use crate::error::{Error, Result};
use crate::knn::{KnnBaseline, Orientation};
use crate::recommend::progress_bar;
use crate::tables::NeighborRow;

/// The `n` nearest neighbor items of every rated item, in order of first appearance.
pub fn item_based(model: &KnnBaseline, n: usize, show_progress: bool) -> Result<Vec<NeighborRow>> {
    if model.orientation() != Orientation::ItemBased {
        return Err(Error::InvalidSettings(
            "item neighborhoods require an item-based model".to_string(),
        ));
    }
    let trainset = model.trainset();
    let progress = progress_bar(trainset.n_items(), "item neighborhoods", show_progress);

    let rows: Vec<NeighborRow> = trainset
        .raw_items()
        .par_iter()
        .filter_map(|item_id| {
            progress.inc(1);
            let inner_id = trainset.to_inner_item(item_id)?;
            let ranked = model
                .neighbors(inner_id, n)
                .into_iter()
                .map(|neighbor| trainset.to_raw_item(neighbor).clone())
                .collect();
            Some(NeighborRow {
                key: item_id.clone(),
                ranked,
            })
        })
        .collect();
    progress.finish_and_clear();

    info!("Computed neighborhoods for {} items", rows.len());
    Ok(rows)
}
