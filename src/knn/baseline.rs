use crate::knn::trainset::Trainset;
use crate::io::Score;

const DEFAULT_BASELINE_EPOCHS: usize = 10;
const DEFAULT_REG_USER: f64 = 15.0;
const DEFAULT_REG_ITEM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BaselineOptions {
    pub n_epochs: usize,
    pub reg_user: f64,
    pub reg_item: f64,
}

impl Default for BaselineOptions {
    fn default() -> Self {
        BaselineOptions {
            n_epochs: DEFAULT_BASELINE_EPOCHS,
            reg_user: DEFAULT_REG_USER,
            reg_item: DEFAULT_REG_ITEM,
        }
    }
}

/// Per-user and per-item deviations from the global mean rating.
#[derive(Debug, Clone, PartialEq)]
pub struct Baselines {
    pub user: Vec<Score>,
    pub item: Vec<Score>,
}

impl Baselines {
    /// Baseline estimate `mu + b_u + b_i`.
    pub fn estimate(&self, global_mean: Score, user: usize, item: usize) -> Score {
        global_mean + self.user[user] + self.item[item]
    }
}

/// Fits the biases by alternating least squares, items first in every epoch.
pub fn fit_als(trainset: &Trainset, options: &BaselineOptions) -> Baselines {
    let global_mean = trainset.global_mean();
    let mut user = vec![0.0; trainset.n_users()];
    let mut item = vec![0.0; trainset.n_items()];

    for _epoch in 0..options.n_epochs {
        for (i, ratings) in trainset.item_ratings().iter().enumerate() {
            let deviation: f64 = ratings
                .iter()
                .map(|(u, rating)| rating - global_mean - user[*u])
                .sum();
            item[i] = deviation / (options.reg_item + ratings.len() as f64);
        }
        for (u, ratings) in trainset.user_ratings().iter().enumerate() {
            let deviation: f64 = ratings
                .iter()
                .map(|(i, rating)| rating - global_mean - item[*i])
                .sum();
            user[u] = deviation / (options.reg_user + ratings.len() as f64);
        }
    }

    Baselines { user, item }
}
