use hashbrown::HashMap;
use num_format::{Locale, ToFormattedString};
use rayon::prelude::*;
use tdigest::TDigest;
use tracing::info;

use crate::io::Rating;

/// Summary of a loaded rating table.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingStats {
    pub descriptive_name: String,
    pub qty_records: usize,
    pub qty_unique_user_ids: usize,
    pub qty_unique_item_ids: usize,
    pub mean_rating: f64,
    pub ratings_per_item_p50: u64,
    pub ratings_per_item_p90: u64,
    pub ratings_per_item_p99: u64,
}

pub fn determine_rating_statistics(descriptive_name: &str, ratings: &[Rating]) -> RatingStats {
    let qty_records = ratings.len();

    let mut user_ids: Vec<u64> = ratings.par_iter().map(|rating| rating.user_id).collect();
    user_ids.par_sort_unstable();
    user_ids.dedup();

    let mut ratings_per_item: HashMap<&str, usize> = HashMap::new();
    for rating in ratings {
        *ratings_per_item.entry(rating.item_id.as_str()).or_insert(0) += 1;
    }

    let mean_rating = if ratings.is_empty() {
        0.0
    } else {
        ratings.par_iter().map(|rating| rating.rating).sum::<f64>() / qty_records as f64
    };

    let (p50, p90, p99) = if ratings_per_item.is_empty() {
        (0, 0, 0)
    } else {
        let counts = ratings_per_item
            .values()
            .map(|count| *count as f64)
            .collect();
        let digest = TDigest::new_with_size(100).merge_unsorted(counts);
        (
            digest.estimate_quantile(0.50).round() as u64,
            digest.estimate_quantile(0.90).round() as u64,
            digest.estimate_quantile(0.99).round() as u64,
        )
    };

    RatingStats {
        descriptive_name: descriptive_name.to_string(),
        qty_records,
        qty_unique_user_ids: user_ids.len(),
        qty_unique_item_ids: ratings_per_item.len(),
        mean_rating,
        ratings_per_item_p50: p50,
        ratings_per_item_p90: p90,
        ratings_per_item_p99: p99,
    }
}

impl RatingStats {
    pub fn log(&self) {
        info!(
            "Loaded {}: {} ratings by {} users on {} items, mean rating {:.3}",
            self.descriptive_name,
            self.qty_records.to_formatted_string(&Locale::en),
            self.qty_unique_user_ids.to_formatted_string(&Locale::en),
            self.qty_unique_item_ids.to_formatted_string(&Locale::en),
            self.mean_rating,
        );
        info!(
            "Ratings per item percentiles: p50={} p90={} p99={}",
            self.ratings_per_item_p50, self.ratings_per_item_p90, self.ratings_per_item_p99,
        );
    }
}

#[cfg(test)]
mod stats_test {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn should_count_distinct_users_and_items() {
        let ratings = vec![
            Rating::new(1, "a", 5.0),
            Rating::new(1, "b", 3.0),
            Rating::new(2, "a", 4.0),
            Rating::new(3, "a", 2.0),
        ];

        let stats = determine_rating_statistics("books_ratings", &ratings);

        assert_eq!(4, stats.qty_records);
        assert_eq!(3, stats.qty_unique_user_ids);
        assert_eq!(2, stats.qty_unique_item_ids);
        assert!(approx_eq!(f64, 3.5, stats.mean_rating, ulps = 2));
        assert!((1..=3).contains(&stats.ratings_per_item_p99));
    }

    #[test]
    fn should_handle_empty_ratings() {
        let stats = determine_rating_statistics("mangas_ratings", &[]);

        assert_eq!(0, stats.qty_records);
        assert_eq!(0, stats.qty_unique_item_ids);
        assert_eq!(0, stats.ratings_per_item_p50);
        assert!(approx_eq!(f64, 0.0, stats.mean_rating));
    }
}
