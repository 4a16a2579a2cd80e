use crate::catalog::Catalog;
use crate::io::{ItemId, UserId};

/// A key followed by its ranked recommendations, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow<K> {
    pub key: K,
    pub ranked: Vec<ItemId>,
}

pub type NeighborRow = RankedRow<ItemId>;
pub type PredictionRow = RankedRow<UserId>;

/// A fully materialized output table, rows in rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Popularity table with an explicit `id` rank column starting at 0.
    pub fn popular(name: String, items: &[ItemId]) -> Table {
        let rows = items
            .iter()
            .enumerate()
            .map(|(rank, item_id)| vec![rank.to_string(), item_id.clone()])
            .collect();
        Table {
            name,
            columns: vec!["id".to_string(), "item_id".to_string()],
            rows,
        }
    }

    /// Table with the key in the first column and rank `r` in column `r`. Rows shorter than
    /// `width` leave their trailing cells empty.
    pub fn ranked<K: ToString>(
        name: String,
        key_column: &str,
        rows: &[RankedRow<K>],
        width: usize,
    ) -> Table {
        let mut columns = Vec::with_capacity(width + 1);
        columns.push(key_column.to_string());
        columns.extend((0..width).map(|rank| rank.to_string()));

        let rows = rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(width + 1);
                cells.push(row.key.to_string());
                cells.extend(row.ranked.iter().take(width).cloned());
                cells.resize(width + 1, String::new());
                cells
            })
            .collect();

        Table { name, columns, rows }
    }
}

/// The three result sets of one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationTables {
    pub catalog: Catalog,
    pub num_items: usize,
    pub popular: Vec<ItemId>,
    pub item_based: Vec<NeighborRow>,
    pub user_based: Vec<PredictionRow>,
}

impl RecommendationTables {
    pub fn to_tables(&self) -> Vec<Table> {
        vec![
            Table::popular(self.catalog.popular_table(), &self.popular),
            Table::ranked(
                self.catalog.item_based_table(),
                "item_id",
                &self.item_based,
                self.num_items,
            ),
            Table::ranked(
                self.catalog.user_based_table(),
                "user_id",
                &self.user_based,
                self.num_items,
            ),
        ]
    }
}
