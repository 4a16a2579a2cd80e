use chrono::NaiveDate;
use itertools::Itertools;
use tracing::info;

use crate::error::Result;
use crate::io::UserId;
use crate::store::UserDirectory;

/// The users to compute predictions for: the seed users followed by everyone who signed up on or
/// after `since`, each user once.
pub fn select_target_users<D: UserDirectory + ?Sized>(
    seed_users: &[UserId],
    directory: &D,
    since: Option<NaiveDate>,
) -> Result<Vec<UserId>> {
    let new_users = match since {
        Some(date) => directory.users_since(date)?,
        None => Vec::new(),
    };
    let target_users = seed_users
        .iter()
        .chain(new_users.iter())
        .copied()
        .unique()
        .collect_vec();
    info!(
        "Selected {} target users ({} seed, {} new)",
        target_users.len(),
        seed_users.len(),
        new_users.len()
    );
    Ok(target_users)
}
