use std::time::Instant;

use tracing::debug;

use crate::io::Score;
use crate::knn::baseline::{self, BaselineOptions, Baselines};
use crate::knn::similarity::{self, SimilarityMatrix, SimilarityOptions};
use crate::knn::trainset::Trainset;
use crate::knn::{top_k, Orientation, ScoredIndex};

const DEFAULT_NEIGHBORHOOD_SIZE_K: usize = 40;
const DEFAULT_MIN_NEIGHBORHOOD_SIZE_K: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct KnnOptions {
    /// Maximum number of neighbors taken into account for an estimate.
    pub k: usize,
    /// Below this many positively similar neighbors the estimate is the baseline.
    pub min_k: usize,
    pub similarity: SimilarityOptions,
    pub baseline: BaselineOptions,
}

impl Default for KnnOptions {
    fn default() -> Self {
        KnnOptions {
            k: DEFAULT_NEIGHBORHOOD_SIZE_K,
            min_k: DEFAULT_MIN_NEIGHBORHOOD_SIZE_K,
            similarity: SimilarityOptions::default(),
            baseline: BaselineOptions::default(),
        }
    }
}

/// k-nearest-neighbor model on top of baseline estimates, with baseline-adjusted Pearson
/// similarities between the entities of one axis of the rating matrix.
pub struct KnnBaseline {
    trainset: Trainset,
    orientation: Orientation,
    options: KnnOptions,
    baselines: Baselines,
    similarities: SimilarityMatrix,
}

impl KnnBaseline {
    pub fn fit(trainset: Trainset, orientation: Orientation, options: KnnOptions) -> Self {
        let start_time = Instant::now();
        let baselines = baseline::fit_als(&trainset, &options.baseline);
        debug!(
            "{:?} baselines fitted: {} micros",
            orientation,
            start_time.elapsed().as_micros()
        );

        let start_time = Instant::now();
        let global_mean = trainset.global_mean();
        let similarities = match orientation {
            Orientation::ItemBased => similarity::pearson_baseline(
                trainset.item_ratings(),
                trainset.user_ratings(),
                global_mean,
                &baselines.item,
                &baselines.user,
                &options.similarity,
            ),
            Orientation::UserBased => similarity::pearson_baseline(
                trainset.user_ratings(),
                trainset.item_ratings(),
                global_mean,
                &baselines.user,
                &baselines.item,
                &options.similarity,
            ),
        };
        debug!(
            "{:?} similarities between {} entities: {} micros",
            orientation,
            similarities.len(),
            start_time.elapsed().as_micros()
        );

        KnnBaseline {
            trainset,
            orientation,
            options,
            baselines,
            similarities,
        }
    }

    pub fn trainset(&self) -> &Trainset {
        &self.trainset
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        self.similarities.get(a, b)
    }

    /// The `k` most similar entities to `x` on the similarity axis, most similar first.
    pub fn neighbors(&self, x: usize, k: usize) -> Vec<usize> {
        let candidates = self
            .similarities
            .row(x)
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != x)
            .map(|(other, sim)| ScoredIndex::new(other, *sim));
        top_k(candidates, k).into_iter().map(|scored| scored.index).collect()
    }

    /// Unclipped rating estimate of an inner user for an inner item.
    pub fn estimate(&self, user: usize, item: usize) -> Score {
        let global_mean = self.trainset.global_mean();
        let knows_user = self.trainset.knows_user(user);
        let knows_item = self.trainset.knows_item(item);

        let mut estimate = global_mean;
        if knows_user {
            estimate += self.baselines.user[user];
        }
        if knows_item {
            estimate += self.baselines.item[item];
        }
        if !(knows_user && knows_item) {
            return estimate;
        }

        let (x, y) = self.orientation.switch(user, item);
        let (y_ratings, x_biases, y_bias) = match self.orientation {
            Orientation::ItemBased => (
                &self.trainset.user_ratings()[y],
                &self.baselines.item,
                self.baselines.user[y],
            ),
            Orientation::UserBased => (
                &self.trainset.item_ratings()[y],
                &self.baselines.user,
                self.baselines.item[y],
            ),
        };

        let candidates = y_ratings
            .iter()
            .enumerate()
            .map(|(position, (other, _))| ScoredIndex::new(position, self.similarities.get(x, *other)));

        let mut sum_of_similarities = 0.0;
        let mut sum_of_ratings = 0.0;
        let mut actual_k = 0;
        for scored in top_k(candidates, self.options.k) {
            if scored.score > 0.0 {
                let (neighbor, rating) = y_ratings[scored.index];
                let neighbor_baseline = global_mean + x_biases[neighbor] + y_bias;
                sum_of_similarities += scored.score;
                sum_of_ratings += scored.score * (rating - neighbor_baseline);
                actual_k += 1;
            }
        }

        if actual_k < self.options.min_k {
            sum_of_ratings = 0.0;
        }
        if sum_of_similarities > 0.0 {
            estimate += sum_of_ratings / sum_of_similarities;
        }
        estimate
    }

    /// Rating estimate clipped to the rating scale.
    pub fn predict(&self, user: usize, item: usize) -> Score {
        let (lower, upper) = self.trainset.rating_scale();
        self.estimate(user, item).max(lower).min(upper)
    }
}

#[cfg(test)]
mod model_test {
    use super::*;
    use crate::io::Rating;
    use float_cmp::approx_eq;

    // users 1 and 2 share their taste, user 3 has the opposite taste
    fn ratings() -> Vec<Rating> {
        let mut ratings = Vec::new();
        for (user, items) in [
            (1, vec![("x", 5.0), ("y", 1.0), ("z", 5.0)]),
            (2, vec![("x", 5.0), ("y", 1.0), ("z", 5.0), ("w", 5.0), ("v", 1.0)]),
            (3, vec![("x", 1.0), ("y", 5.0), ("z", 1.0), ("w", 1.0), ("v", 5.0)]),
        ] {
            for (item, rating) in items {
                ratings.push(Rating::new(user, item, rating));
            }
        }
        ratings
    }

    #[test]
    fn should_find_item_with_identical_ratings_first() {
        let model = KnnBaseline::fit(Trainset::new(&ratings()), Orientation::ItemBased, KnnOptions::default());
        let x = model.trainset().to_inner_item("x").unwrap();
        let z = model.trainset().to_inner_item("z").unwrap();

        let neighbors = model.neighbors(x, 40);

        assert_eq!(4, neighbors.len());
        assert_eq!(z, neighbors[0]);
        assert!(!neighbors.contains(&x));
        assert!(model.similarity(x, z) > model.similarity(x, neighbors[1]));
    }

    #[test]
    fn should_limit_neighbors_to_k() {
        let model = KnnBaseline::fit(Trainset::new(&ratings()), Orientation::ItemBased, KnnOptions::default());

        assert_eq!(2, model.neighbors(0, 2).len());
        assert!(model.neighbors(0, 0).is_empty());
    }

    #[test]
    fn should_predict_from_like_minded_users() {
        let model = KnnBaseline::fit(Trainset::new(&ratings()), Orientation::UserBased, KnnOptions::default());
        let trainset = model.trainset();
        let user = trainset.to_inner_user(1).unwrap();
        let w = trainset.to_inner_item("w").unwrap();
        let v = trainset.to_inner_item("v").unwrap();

        assert!(model.similarity(user, trainset.to_inner_user(2).unwrap()) > 0.0);
        assert!(model.similarity(user, trainset.to_inner_user(3).unwrap()) < 0.0);
        assert!(model.predict(user, w) > 4.5);
        assert!(model.predict(user, v) < 1.5);
    }

    #[test]
    fn should_weight_neighbor_residuals_by_similarity() {
        // mu = 3 and no epochs, so every baseline is 3 and residuals are ratings minus 3
        let ratings = vec![
            Rating::new(1, "a", 5.0),
            Rating::new(1, "b", 2.0),
            Rating::new(2, "a", 4.0),
            Rating::new(2, "b", 2.0),
            Rating::new(2, "c", 4.0),
            Rating::new(3, "a", 2.0),
            Rating::new(3, "b", 4.0),
            Rating::new(3, "c", 1.0),
            Rating::new(4, "a", 5.0),
            Rating::new(4, "b", 2.0),
            Rating::new(4, "c", 2.0),
        ];
        let options = KnnOptions {
            similarity: SimilarityOptions {
                shrinkage: 0.0,
                min_support: 1,
            },
            baseline: BaselineOptions {
                n_epochs: 0,
                ..BaselineOptions::default()
            },
            ..KnnOptions::default()
        };
        let model = KnnBaseline::fit(Trainset::new(&ratings), Orientation::UserBased, options);
        let trainset = model.trainset();
        let user = trainset.to_inner_user(1).unwrap();
        let c = trainset.to_inner_item("c").unwrap();

        // residuals on (a, b): user 1 (2, -1), user 2 (1, -1), user 3 (-1, 1), user 4 (2, -1)
        let sim_2 = 3.0 / (5.0_f64 * 2.0).sqrt();
        let sim_to = |raw_user| model.similarity(user, trainset.to_inner_user(raw_user).unwrap());
        assert!(approx_eq!(f64, sim_2, sim_to(2), epsilon = 1e-12));
        assert!(approx_eq!(f64, 1.0, sim_to(4), epsilon = 1e-12));
        assert!(sim_to(3) < 0.0);

        // user 3 is dissimilar and ignored, users 2 and 4 rated c with residuals 1 and -1
        let expected = 3.0 + (sim_2 * 1.0 + 1.0 * -1.0) / (sim_2 + 1.0);
        assert!(approx_eq!(f64, expected, model.estimate(user, c), epsilon = 1e-12));
        assert!(approx_eq!(f64, 2.973_666, model.estimate(user, c), epsilon = 1e-6));
    }

    #[test]
    fn should_clip_predictions_to_rating_scale() {
        let model = KnnBaseline::fit(Trainset::new(&ratings()), Orientation::UserBased, KnnOptions::default());
        let trainset = model.trainset();

        for user in 0..trainset.n_users() {
            for item in trainset.unrated_items(user) {
                let prediction = model.predict(user, item);
                assert!((1.0..=5.0).contains(&prediction));
            }
        }
    }

    #[test]
    fn should_fall_back_to_baseline_without_positive_neighbors() {
        let options = KnnOptions {
            min_k: 10,
            ..KnnOptions::default()
        };
        let model = KnnBaseline::fit(Trainset::new(&ratings()), Orientation::UserBased, options);
        let trainset = model.trainset();
        let user = trainset.to_inner_user(1).unwrap();
        let w = trainset.to_inner_item("w").unwrap();

        let baseline = model.baselines.estimate(trainset.global_mean(), user, w);

        assert!(approx_eq!(f64, baseline, model.estimate(user, w), epsilon = 1e-12));
    }

    #[test]
    fn should_use_global_mean_for_unknown_entities() {
        let model = KnnBaseline::fit(Trainset::new(&ratings()), Orientation::ItemBased, KnnOptions::default());
        let mean = model.trainset().global_mean();

        assert!(approx_eq!(f64, mean, model.estimate(99, 99), epsilon = 1e-12));
    }

    #[test]
    fn should_give_neighbors_to_item_with_single_rating() {
        let mut ratings = ratings();
        ratings.push(Rating::new(1, "lonely", 4.0));
        let model = KnnBaseline::fit(Trainset::new(&ratings), Orientation::ItemBased, KnnOptions::default());
        let lonely = model.trainset().to_inner_item("lonely").unwrap();

        let neighbors = model.neighbors(lonely, 40);

        assert_eq!(5, neighbors.len());
        assert!(!neighbors.contains(&lonely));
    }
}
