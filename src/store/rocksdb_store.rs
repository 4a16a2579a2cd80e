use std::path::Path;

use rocksdb::{Options, WriteBatch, DB};
use tracing::info;

use crate::error::Result;
use crate::store::TableSink;
use crate::tables::Table;

/// Recommendation tables in one RocksDB database.
///
/// Rows are keyed by `{table}\0r{row key}`, the column names of a table by `{table}\0c`.
pub struct RocksDbSink {
    rocks_db: DB,
}

const COLUMNS_TAG: u8 = b'c';
const ROW_TAG: u8 = b'r';

fn table_key(table: &str, tag: u8, key: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(table.len() + key.len() + 2);
    bytes.extend_from_slice(table.as_bytes());
    bytes.push(0);
    bytes.push(tag);
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

fn table_start(table: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(table.len() + 1);
    bytes.extend_from_slice(table.as_bytes());
    bytes.push(0);
    bytes
}

fn table_end(table: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(table.len() + 1);
    bytes.extend_from_slice(table.as_bytes());
    bytes.push(1);
    bytes
}

impl RocksDbSink {
    pub fn open<P: AsRef<Path>>(database_file: P) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.optimize_for_point_lookup(5000);

        let rocks_db = DB::open(&options, database_file)?;
        Ok(Self { rocks_db })
    }

    pub fn columns(&self, table: &str) -> Result<Option<Vec<String>>> {
        self.read(table_key(table, COLUMNS_TAG, ""))
    }

    /// The cells of the row whose first cell is `key`.
    pub fn row(&self, table: &str, key: &str) -> Result<Option<Vec<String>>> {
        self.read(table_key(table, ROW_TAG, key))
    }

    fn read(&self, key: Vec<u8>) -> Result<Option<Vec<String>>> {
        match self.rocks_db.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl TableSink for RocksDbSink {
    fn replace_tables(&self, tables: &[Table]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for table in tables {
            batch.delete_range(table_start(&table.name), table_end(&table.name));
            batch.put(
                table_key(&table.name, COLUMNS_TAG, ""),
                bincode::serialize(&table.columns)?,
            );
            for row in &table.rows {
                let key = row.first().map(String::as_str).unwrap_or_default();
                batch.put(table_key(&table.name, ROW_TAG, key), bincode::serialize(row)?);
            }
        }
        self.rocks_db.write(batch)?;
        info!("Replaced {} tables in one write batch", tables.len());
        Ok(())
    }
}
