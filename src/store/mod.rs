use chrono::NaiveDate;
use hashbrown::HashMap;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::io::{ItemId, Rating, UserId};
use crate::tables::Table;

pub mod csv_store;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

pub use csv_store::CsvStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::RocksDbSink;

/// Read access to the rating and item tables of each catalog.
pub trait RatingStore {
    /// All ratings of a catalog.
    fn ratings(&self, catalog: Catalog) -> Result<Vec<Rating>>;

    /// One attribute of every item of a catalog, `None` where it is unset.
    fn item_attributes(
        &self,
        catalog: Catalog,
        column: &str,
    ) -> Result<HashMap<ItemId, Option<String>>>;
}

pub trait UserDirectory {
    /// Users created on or after `date`.
    fn users_since(&self, date: NaiveDate) -> Result<Vec<UserId>>;
}

/// Destination of the recommendation tables.
pub trait TableSink {
    /// Replaces every given table as a whole. Either all tables are replaced, or an error is
    /// returned and the previous contents stay readable.
    fn replace_tables(&self, tables: &[Table]) -> Result<()>;
}
