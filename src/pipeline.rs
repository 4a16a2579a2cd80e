use tracing::{info, info_span};

use crate::catalog::{Catalog, CatalogSettings};
use crate::error::{Error, Result};
use crate::io::UserId;
use crate::knn::{KnnBaseline, KnnOptions, Orientation, Trainset};
use crate::recommend::{item_based, popularity, user_based};
use crate::stats::determine_rating_statistics;
use crate::stopwatch::Stopwatch;
use crate::store::{RatingStore, TableSink};
use crate::tables::RecommendationTables;

/// Everything a pipeline run needs besides its data.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Length N of every recommendation list.
    pub num_items: usize,
    /// Items need more ratings than this to be popular.
    pub count_threshold: usize,
    pub tie_break_seed: Option<u64>,
    pub knn: KnnOptions,
    pub show_progress: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            num_items: 40,
            count_threshold: 50,
            tie_break_seed: None,
            knn: KnnOptions::default(),
            show_progress: false,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_items == 0 {
            return Err(Error::InvalidSettings(
                "the number of items to recommend must be positive".to_string(),
            ));
        }
        if self.knn.k == 0 {
            return Err(Error::InvalidSettings(
                "the neighborhood size k must be positive".to_string(),
            ));
        }
        let similarity = &self.knn.similarity;
        if similarity.shrinkage.is_nan() || similarity.shrinkage < 0.0 {
            return Err(Error::InvalidSettings(format!(
                "shrinkage must not be negative, got {}",
                similarity.shrinkage
            )));
        }
        let baseline = &self.knn.baseline;
        if [baseline.reg_user, baseline.reg_item]
            .iter()
            .any(|reg| reg.is_nan() || *reg < 0.0)
        {
            return Err(Error::InvalidSettings(format!(
                "regularization must not be negative, got reg_user={} reg_item={}",
                baseline.reg_user, baseline.reg_item
            )));
        }
        Ok(())
    }
}

/// Computes the three recommendation tables of one catalog without writing anything.
pub fn generate<S: RatingStore + ?Sized>(
    catalog_settings: &CatalogSettings,
    store: &S,
    target_users: &[UserId],
    settings: &PipelineSettings,
) -> Result<RecommendationTables> {
    let catalog = catalog_settings.catalog;
    let mut stopwatch = Stopwatch::new();

    let ratings = store.ratings(catalog)?;
    determine_rating_statistics(&catalog.ratings_table(), &ratings).log();
    let diversity = match catalog_settings.diversity_key {
        Some(column) => Some(store.item_attributes(catalog, column)?),
        None => None,
    };
    info!("Data loaded in {} ms", stopwatch.stop().as_millis());

    stopwatch.start();
    let trainset = Trainset::new(&ratings);
    let (popular, item_model) = rayon::join(
        || {
            popularity(
                &ratings,
                diversity.as_ref(),
                settings.num_items,
                settings.count_threshold,
                settings.tie_break_seed,
            )
        },
        || KnnBaseline::fit(trainset.clone(), Orientation::ItemBased, settings.knn.clone()),
    );
    info!(
        "{} popular items and item model in {} ms",
        popular.len(),
        stopwatch.stop().as_millis()
    );

    stopwatch.start();
    let item_neighbors = item_based(&item_model, settings.num_items, settings.show_progress)?;
    drop(item_model);
    info!("Item neighborhoods in {} ms", stopwatch.stop().as_millis());

    stopwatch.start();
    let user_model = KnnBaseline::fit(trainset, Orientation::UserBased, settings.knn.clone());
    let predictions = user_based(
        &user_model,
        target_users,
        settings.num_items,
        settings.show_progress,
    )?;
    info!("User predictions in {} ms", stopwatch.stop().as_millis());

    Ok(RecommendationTables {
        catalog,
        num_items: settings.num_items,
        popular,
        item_based: item_neighbors,
        user_based: predictions,
    })
}

/// Recomputes the recommendation tables of every given catalog from `store` and replaces them in
/// `sink`, one catalog at a time. Settings are validated before any data is read.
pub fn update_database<R, W>(
    store: &R,
    sink: &W,
    catalogs: &[Catalog],
    target_users: &[UserId],
    settings: &PipelineSettings,
) -> Result<()>
where
    R: RatingStore + ?Sized,
    W: TableSink + ?Sized,
{
    settings.validate()?;

    let mut stopwatch = Stopwatch::new();
    for catalog in catalogs {
        let _span = info_span!("catalog", name = catalog.name()).entered();
        stopwatch.start();
        let tables = generate(&catalog.settings(), store, target_users, settings)?;
        sink.replace_tables(&tables.to_tables())?;
        info!(
            "Updated {} recommendations in {} ms",
            catalog,
            stopwatch.stop().as_millis()
        );
    }
    info!(
        "Updated {} catalogs in {} ms",
        stopwatch.get_n(),
        stopwatch.get_total().as_millis()
    );
    Ok(())
}

#[cfg(test)]
mod pipeline_test {
    use super::*;
    use crate::io::{ItemId, Rating};
    use crate::tables::Table;
    use hashbrown::HashMap;
    use std::cell::{Cell, RefCell};

    struct MemoryStore {
        ratings: HashMap<Catalog, Vec<Rating>>,
        authors: HashMap<ItemId, Option<String>>,
        reads: Cell<usize>,
        written: RefCell<Vec<Table>>,
    }

    impl RatingStore for MemoryStore {
        fn ratings(&self, catalog: Catalog) -> Result<Vec<Rating>> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.ratings.get(&catalog).cloned().unwrap_or_default())
        }

        fn item_attributes(
            &self,
            catalog: Catalog,
            column: &str,
        ) -> Result<HashMap<ItemId, Option<String>>> {
            self.reads.set(self.reads.get() + 1);
            match (catalog, column) {
                (Catalog::Books, "author") => Ok(self.authors.clone()),
                _ => Err(Error::MissingColumn {
                    table: catalog.items_table(),
                    column: column.to_string(),
                }),
            }
        }
    }

    impl TableSink for MemoryStore {
        fn replace_tables(&self, tables: &[Table]) -> Result<()> {
            let mut written = self.written.borrow_mut();
            written.retain(|old| !tables.iter().any(|new| new.name == old.name));
            written.extend(tables.iter().cloned());
            Ok(())
        }
    }

    fn ratings() -> Vec<Rating> {
        let mut ratings = Vec::new();
        for (user, items) in [
            (1, vec![("x", 5.0), ("y", 1.0), ("z", 5.0)]),
            (2, vec![("x", 5.0), ("y", 1.0), ("z", 5.0), ("w", 5.0), ("v", 1.0)]),
            (3, vec![("x", 1.0), ("y", 5.0), ("z", 1.0), ("w", 1.0), ("v", 5.0)]),
            (4, vec![("x", 3.0), ("y", 3.0), ("z", 3.0), ("w", 3.0), ("v", 3.0)]),
        ] {
            for (item, rating) in items {
                ratings.push(Rating::new(user, item, rating));
            }
        }
        ratings
    }

    fn store() -> MemoryStore {
        let mut catalogs = HashMap::new();
        catalogs.insert(Catalog::Books, ratings());
        catalogs.insert(Catalog::Mangas, ratings());
        let authors = [("x", Some("Ann")), ("z", Some("Ann")), ("y", Some("Bob"))]
            .iter()
            .map(|(item, author)| (item.to_string(), author.map(str::to_string)))
            .collect();
        MemoryStore {
            ratings: catalogs,
            authors,
            reads: Cell::new(0),
            written: RefCell::new(Vec::new()),
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            num_items: 2,
            count_threshold: 0,
            ..PipelineSettings::default()
        }
    }

    fn written(store: &MemoryStore, name: &str) -> Table {
        store
            .written
            .borrow()
            .iter()
            .find(|table| table.name == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn should_write_all_three_tables_of_a_catalog() {
        let store = store();

        update_database(&store, &store, &[Catalog::Books], &[1, 99], &settings()).unwrap();

        // x and z share an author, v and w both lack one
        assert_eq!(
            vec![vec!["0", "x"], vec!["1", "v"]],
            written(&store, "books_popular").rows
        );
        let item_based = written(&store, "books_item_based");
        assert_eq!(vec!["item_id", "0", "1"], item_based.columns);
        assert_eq!(5, item_based.rows.len());
        assert_eq!(
            vec![vec!["1", "w", "v"]],
            written(&store, "books_user_based").rows
        );
    }

    #[test]
    fn should_not_diversify_mangas() {
        let store = store();

        update_database(&store, &store, &[Catalog::Mangas], &[1], &settings()).unwrap();

        assert_eq!(
            vec![vec!["0", "x"], vec!["1", "z"]],
            written(&store, "mangas_popular").rows
        );
        assert_eq!(3, store.written.borrow().len());
    }

    #[test]
    fn should_write_to_separate_sink() {
        let store = store();
        let sink = MemoryStore {
            ratings: HashMap::new(),
            ..self::store()
        };

        update_database(&store, &sink, &[Catalog::Mangas], &[1], &settings()).unwrap();

        assert!(store.written.borrow().is_empty());
        assert_eq!(3, sink.written.borrow().len());
        assert_eq!(0, sink.reads.get());
    }

    #[test]
    fn should_reject_invalid_settings_before_reading_data() {
        let store = store();
        let invalid = PipelineSettings {
            num_items: 0,
            ..settings()
        };

        let result = update_database(&store, &store, &Catalog::ALL, &[1], &invalid);

        assert!(matches!(result, Err(Error::InvalidSettings(_))));
        assert_eq!(0, store.reads.get());
        assert!(store.written.borrow().is_empty());
    }

    #[test]
    fn should_reject_negative_model_parameters() {
        let mut invalid = settings();
        invalid.knn.similarity.shrinkage = -1.0;
        assert!(invalid.validate().is_err());

        let mut invalid = settings();
        invalid.knn.baseline.reg_item = -0.5;
        assert!(invalid.validate().is_err());

        let mut invalid = settings();
        invalid.knn.k = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn should_reproduce_tables_on_unchanged_ratings() {
        let store = store();
        let seeded = PipelineSettings {
            tie_break_seed: Some(3),
            ..settings()
        };

        let first_run = generate(&Catalog::Books.settings(), &store, &[1, 2], &seeded).unwrap();
        let second_run = generate(&Catalog::Books.settings(), &store, &[1, 2], &seeded).unwrap();

        assert_eq!(first_run, second_run);
    }

    #[test]
    fn should_produce_empty_tables_for_empty_catalog() {
        let store = MemoryStore {
            ratings: HashMap::new(),
            ..store()
        };

        let tables = generate(&Catalog::Books.settings(), &store, &[1], &settings()).unwrap();

        assert!(tables.popular.is_empty());
        assert!(tables.item_based.is_empty());
        assert!(tables.user_based.is_empty());
    }
}
