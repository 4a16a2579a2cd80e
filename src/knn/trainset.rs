use hashbrown::{HashMap, HashSet};

use crate::io::{ItemId, Rating, Score, UserId};

pub const RATING_SCALE: (Score, Score) = (1.0, 5.0);

/// Sparse rating matrix of one catalog.
///
/// Raw user and item ids are mapped to dense inner indices in order of first appearance.
#[derive(Debug, Clone)]
pub struct Trainset {
    user_to_inner: HashMap<UserId, usize>,
    inner_to_user: Vec<UserId>,
    item_to_inner: HashMap<ItemId, usize>,
    inner_to_item: Vec<ItemId>,
    user_ratings: Vec<Vec<(usize, Score)>>,
    item_ratings: Vec<Vec<(usize, Score)>>,
    global_mean: Score,
    rating_scale: (Score, Score),
}

impl Trainset {
    pub fn new(ratings: &[Rating]) -> Self {
        let mut user_to_inner = HashMap::new();
        let mut inner_to_user = Vec::new();
        let mut item_to_inner = HashMap::new();
        let mut inner_to_item = Vec::new();
        let mut user_ratings: Vec<Vec<(usize, Score)>> = Vec::new();
        let mut item_ratings: Vec<Vec<(usize, Score)>> = Vec::new();
        let mut sum_of_ratings = 0_f64;

        for rating in ratings {
            let user = *user_to_inner.entry(rating.user_id).or_insert_with(|| {
                inner_to_user.push(rating.user_id);
                user_ratings.push(Vec::new());
                inner_to_user.len() - 1
            });
            let item = match item_to_inner.get(&rating.item_id) {
                Some(item) => *item,
                None => {
                    inner_to_item.push(rating.item_id.clone());
                    item_ratings.push(Vec::new());
                    let item = inner_to_item.len() - 1;
                    item_to_inner.insert(rating.item_id.clone(), item);
                    item
                }
            };
            user_ratings[user].push((item, rating.rating));
            item_ratings[item].push((user, rating.rating));
            sum_of_ratings += rating.rating;
        }

        let global_mean = if ratings.is_empty() {
            0.0
        } else {
            sum_of_ratings / ratings.len() as f64
        };

        Trainset {
            user_to_inner,
            inner_to_user,
            item_to_inner,
            inner_to_item,
            user_ratings,
            item_ratings,
            global_mean,
            rating_scale: RATING_SCALE,
        }
    }

    pub fn n_users(&self) -> usize {
        self.inner_to_user.len()
    }

    pub fn n_items(&self) -> usize {
        self.inner_to_item.len()
    }

    pub fn n_ratings(&self) -> usize {
        self.user_ratings.iter().map(|ratings| ratings.len()).sum()
    }

    pub fn global_mean(&self) -> Score {
        self.global_mean
    }

    pub fn rating_scale(&self) -> (Score, Score) {
        self.rating_scale
    }

    pub fn to_inner_user(&self, user_id: UserId) -> Option<usize> {
        self.user_to_inner.get(&user_id).copied()
    }

    pub fn to_inner_item(&self, item_id: &str) -> Option<usize> {
        self.item_to_inner.get(item_id).copied()
    }

    pub fn to_raw_user(&self, user: usize) -> UserId {
        self.inner_to_user[user]
    }

    pub fn to_raw_item(&self, item: usize) -> &ItemId {
        &self.inner_to_item[item]
    }

    /// All item ids in order of first appearance.
    pub fn raw_items(&self) -> &[ItemId] {
        &self.inner_to_item
    }

    pub fn knows_user(&self, user: usize) -> bool {
        user < self.n_users()
    }

    pub fn knows_item(&self, item: usize) -> bool {
        item < self.n_items()
    }

    /// `(item, rating)` pairs of a user.
    pub fn user_ratings(&self) -> &[Vec<(usize, Score)>] {
        &self.user_ratings
    }

    /// `(user, rating)` pairs of an item.
    pub fn item_ratings(&self) -> &[Vec<(usize, Score)>] {
        &self.item_ratings
    }

    /// Items the user has not rated, in inner order.
    pub fn unrated_items(&self, user: usize) -> Vec<usize> {
        let rated: HashSet<usize> = self.user_ratings[user].iter().map(|(item, _)| *item).collect();
        (0..self.n_items()).filter(|item| !rated.contains(item)).collect()
    }
}
