use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::io::{self, ItemId, Rating, UserId};
use crate::store::{RatingStore, TableSink, UserDirectory};
use crate::tables::Table;

/// Tables as CSV files: inputs in `data_dir`, recommendation tables in `output_dir`.
#[derive(Debug, Clone)]
pub struct CsvStore {
    data_dir: PathBuf,
    output_dir: PathBuf,
}

impl CsvStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(data_dir: P, output_dir: Q) -> Self {
        CsvStore {
            data_dir: data_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    fn input_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", table))
    }

    pub fn output_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}.csv", table))
    }

    fn staging_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!(".{}.csv.tmp", table))
    }

    fn stage(&self, table: &Table) -> Result<PathBuf> {
        let path = self.staging_path(&table.name);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(path)
    }
}

impl RatingStore for CsvStore {
    fn ratings(&self, catalog: Catalog) -> Result<Vec<Rating>> {
        io::read_ratings(self.input_path(&catalog.ratings_table()))
    }

    fn item_attributes(
        &self,
        catalog: Catalog,
        column: &str,
    ) -> Result<HashMap<ItemId, Option<String>>> {
        io::read_item_attribute(self.input_path(&catalog.items_table()), column)
    }
}

impl UserDirectory for CsvStore {
    fn users_since(&self, date: NaiveDate) -> Result<Vec<UserId>> {
        let users = io::read_users(self.input_path("users"))?;
        Ok(users
            .into_iter()
            .filter(|(_, created_at)| *created_at >= date)
            .map(|(user_id, _)| user_id)
            .collect())
    }
}

impl TableSink for CsvStore {
    /// Stages every table next to its target, then swaps them in one by one. Each previous table
    /// is moved to a backup first, so a failed swap restores all tables swapped before it.
    fn replace_tables(&self, tables: &[Table]) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;

        for (position, table) in tables.iter().enumerate() {
            if let Err(err) = self.stage(table) {
                warn!("Staging {} failed, keeping previous tables", table.name);
                self.remove_staged(&tables[..=position]);
                return Err(err);
            }
            debug!("Staged {} with {} rows", table.name, table.rows.len());
        }

        let mut swapped: Vec<(&str, bool)> = Vec::with_capacity(tables.len());
        for table in tables {
            match self.swap(&table.name) {
                Ok(backed_up) => swapped.push((table.name.as_str(), backed_up)),
                Err(err) => {
                    warn!("Swapping in {} failed, restoring previous tables", table.name);
                    self.restore(&swapped);
                    self.remove_staged(tables);
                    return Err(err);
                }
            }
        }

        for (table, backed_up) in swapped {
            if backed_up {
                let _ = fs::remove_file(self.backup_path(table));
            }
        }
        info!(
            "Replaced {} tables in {}",
            tables.len(),
            self.output_dir.display()
        );
        Ok(())
    }
}

impl CsvStore {
    fn backup_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!(".{}.csv.bak", table))
    }

    /// Moves the current table to its backup and the staged one into place. Returns whether there
    /// was a current table.
    fn swap(&self, table: &str) -> Result<bool> {
        let target = self.output_path(table);
        let backup = self.backup_path(table);
        let backed_up = target.exists();
        if backed_up {
            fs::rename(&target, &backup)?;
        }
        if let Err(err) = fs::rename(self.staging_path(table), &target) {
            if backed_up {
                let _ = fs::rename(&backup, &target);
            }
            return Err(err.into());
        }
        Ok(backed_up)
    }

    /// Undoes completed swaps, latest first.
    fn restore(&self, swapped: &[(&str, bool)]) {
        for (table, backed_up) in swapped.iter().rev() {
            let target = self.output_path(table);
            let restored = if *backed_up {
                fs::rename(self.backup_path(table), &target)
            } else {
                fs::remove_file(&target)
            };
            if let Err(err) = restored {
                warn!("Could not restore {}: {}", table, err);
            }
        }
    }

    fn remove_staged(&self, tables: &[Table]) {
        for table in tables {
            let _ = fs::remove_file(self.staging_path(&table.name));
        }
    }
}
