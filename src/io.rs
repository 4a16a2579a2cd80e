use std::path::Path;

use chrono::NaiveDate;
use hashbrown::HashMap;
use serde_derive::Deserialize;

use crate::error::{Error, Result};

pub type UserId = u64;
pub type ItemId = String;
pub type Score = f64;

/// One row of a `{catalog}_ratings` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: Score,
}

impl Rating {
    pub fn new(user_id: UserId, item_id: &str, rating: Score) -> Self {
        Rating {
            user_id,
            item_id: item_id.to_string(),
            rating,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    user_id: UserId,
    created_at: String,
}

fn csv_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<std::fs::File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    Ok(reader)
}

pub fn read_ratings<P: AsRef<Path>>(path: P) -> Result<Vec<Rating>> {
    let mut reader = csv_reader(path)?;
    let ratings = reader
        .deserialize()
        .collect::<std::result::Result<Vec<Rating>, csv::Error>>()?;
    Ok(ratings)
}

/// Reads `value_column` of every row keyed by its `item_id`. Empty cells are `None`.
pub fn read_item_attribute<P: AsRef<Path>>(
    path: P,
    value_column: &str,
) -> Result<HashMap<ItemId, Option<String>>> {
    let table = path.as_ref().display().to_string();
    let mut reader = csv_reader(&path)?;
    let headers = reader.headers()?.clone();
    let position = |column: &str| {
        headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| Error::MissingColumn {
                table: table.clone(),
                column: column.to_string(),
            })
    };
    let key_index = position("item_id")?;
    let value_index = position(value_column)?;

    let mut attributes = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let item_id = record.get(key_index).unwrap_or_default().to_string();
        let value = record
            .get(value_index)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        attributes.insert(item_id, value);
    }
    Ok(attributes)
}

/// Reads `user_id,created_at` rows. Only the date part of `created_at` is used.
pub fn read_users<P: AsRef<Path>>(path: P) -> Result<Vec<(UserId, NaiveDate)>> {
    let table = path.as_ref().display().to_string();
    let mut reader = csv_reader(&path)?;
    let mut users = Vec::new();
    for record in reader.deserialize() {
        let record: UserRecord = record?;
        let date_part = record.created_at.get(..10).unwrap_or(record.created_at.as_str());
        let created_at = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|err| {
            Error::InvalidRecord {
                table: table.clone(),
                reason: format!("created_at '{}' of user {}: {}", record.created_at, record.user_id, err),
            }
        })?;
        users.push((record.user_id, created_at));
    }
    Ok(users)
}
