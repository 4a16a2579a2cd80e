use std::ffi::OsStr;
use std::fs::File;
use std::str::FromStr;

use chrono::NaiveDate;
use justconfig::error::ConfigError;
use justconfig::item::ValueExtractor;
use justconfig::processors::Trim;
use justconfig::sources::env::Env;
use justconfig::sources::text::ConfigText;
use justconfig::ConfPath;
use justconfig::Config;

use crate::catalog::Catalog;
use crate::config_processors::{SplitList, Unquote};
use crate::error::{Error, Result};
use crate::io::UserId;
use crate::knn::baseline::BaselineOptions;
use crate::knn::similarity::SimilarityOptions;
use crate::knn::KnnOptions;
use crate::pipeline::PipelineSettings;

// Set some default values
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUTPUT_DIR: &str = "data/recommendations";
const DEFAULT_ROCKSDB_PATH: &str = "data/recommendations.rocksdb";
const DEFAULT_NUM_ITEMS_TO_RECOMMEND: i64 = 40;
const DEFAULT_COUNT_THRESHOLD: i64 = 50;
const DEFAULT_NEW_USERS_SINCE: &str = "2024-08-01";
const DEFAULT_LOG_LEVEL: &str = "info";
// Manga example users followed by book example users
const DEFAULT_SEED_USERS: [UserId; 6] = [1002, 357, 2507, 114368, 95359, 104636];

pub struct AppConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub recommend: RecommendConfig,
    pub users: UsersConfig,
    pub pipeline: PipelineConfig,
    pub log: LogConfig,
}

pub struct DataConfig {
    pub data_dir: String,
    pub output_dir: String,
    pub sink: SinkKind,
    pub rocksdb_path: String,
}

/// Where the recommendation tables are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// One CSV file per table in `data.output_dir`.
    Csv,
    /// One RocksDB database at `data.rocksdb_path`; needs the `rocksdb` feature.
    RocksDb,
}

impl FromStr for SinkKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Ok(SinkKind::Csv),
            "rocksdb" => Ok(SinkKind::RocksDb),
            other => Err(Error::Config(format!("unknown sink '{}'", other))),
        }
    }
}

pub struct ModelConfig {
    pub neighborhood_size_k: usize,
    pub min_neighborhood_size_k: usize,
    pub shrinkage: f64,
    pub min_support: usize,
    pub baseline_epochs: usize,
    pub reg_user: f64,
    pub reg_item: f64,
}

pub struct RecommendConfig {
    /// Signed so that a negative value is reported instead of failing to parse.
    pub num_items_to_recommend: i64,
    pub count_threshold: i64,
    pub tie_break_seed: Option<u64>,
}

pub struct UsersConfig {
    pub seed_users: Vec<UserId>,
    pub new_users_since: Option<NaiveDate>,
}

pub struct PipelineConfig {
    pub catalogs: Vec<Catalog>,
    pub num_workers: usize,
    pub show_progress: bool,
}

pub struct LogConfig {
    pub level: String,
}

fn config_error(err: ConfigError) -> Error {
    Error::Config(err.to_string())
}

impl AppConfig {
    pub fn new(config_path: &str) -> Result<AppConfig> {
        // Initialize config object
        let mut conf = Config::default();

        // Check if there is a config file
        if let Ok(config_file) = File::open(config_path) {
            let config_text = ConfigText::new(config_file, config_path)
                .map_err(|err| Error::Config(err.to_string()))?;
            conf.add_source(config_text);
        }

        // Define config params from environment variables
        let config_env = Env::new(&[
            (
                ConfPath::from(&["data", "data_dir"]),
                OsStr::new("DATA_DIR"),
            ),
            (
                ConfPath::from(&["data", "output_dir"]),
                OsStr::new("OUTPUT_DIR"),
            ),
            (
                ConfPath::from(&["pipeline", "num_workers"]),
                OsStr::new("NUM_WORKERS"),
            ),
            (ConfPath::from(&["log", "level"]), OsStr::new("LOG_LEVEL")),
        ]);
        conf.add_source(config_env);

        // Parse into custom config struct
        AppConfig::parse(&conf)
    }

    fn parse(conf: &Config) -> Result<AppConfig> {
        Ok(AppConfig {
            data: DataConfig::parse(conf, ConfPath::from(&["data"]))?,
            model: ModelConfig::parse(conf, ConfPath::from(&["model"]))?,
            recommend: RecommendConfig::parse(conf, ConfPath::from(&["recommend"]))?,
            users: UsersConfig::parse(conf, ConfPath::from(&["users"]))?,
            pipeline: PipelineConfig::parse(conf, ConfPath::from(&["pipeline"]))?,
            log: LogConfig::parse(conf, ConfPath::from(&["log"])),
        })
    }

    /// Validated pipeline settings. Fails on a non-positive item count or a negative threshold.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let num_items: usize = self.recommend.num_items_to_recommend.try_into().map_err(|_| {
            Error::InvalidSettings(format!(
                "num_items_to_recommend must be positive, got {}",
                self.recommend.num_items_to_recommend
            ))
        })?;
        let count_threshold: usize = self.recommend.count_threshold.try_into().map_err(|_| {
            Error::InvalidSettings(format!(
                "count_threshold must not be negative, got {}",
                self.recommend.count_threshold
            ))
        })?;

        let settings = PipelineSettings {
            num_items,
            count_threshold,
            tie_break_seed: self.recommend.tie_break_seed,
            knn: KnnOptions {
                k: self.model.neighborhood_size_k,
                min_k: self.model.min_neighborhood_size_k,
                similarity: SimilarityOptions {
                    shrinkage: self.model.shrinkage,
                    min_support: self.model.min_support,
                },
                baseline: BaselineOptions {
                    n_epochs: self.model.baseline_epochs,
                    reg_user: self.model.reg_user,
                    reg_item: self.model.reg_item,
                },
            },
            show_progress: self.pipeline.show_progress,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl DataConfig {
    fn parse(conf: &Config, path: ConfPath) -> Result<DataConfig> {
        let sink: Option<String> = conf.get(path.push("sink")).unquote().value().ok();
        Ok(DataConfig {
            data_dir: conf
                .get(path.push("data_dir"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(DEFAULT_DATA_DIR)),
            output_dir: conf
                .get(path.push("output_dir"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(DEFAULT_OUTPUT_DIR)),
            sink: match sink {
                Some(name) => name.parse()?,
                None => SinkKind::Csv,
            },
            rocksdb_path: conf
                .get(path.push("rocksdb_path"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(DEFAULT_ROCKSDB_PATH)),
        })
    }
}

impl ModelConfig {
    fn parse(conf: &Config, path: ConfPath) -> Result<ModelConfig> {
        let defaults = KnnOptions::default();
        Ok(ModelConfig {
            neighborhood_size_k: optional(conf, &path, "neighborhood_size_k")?.unwrap_or(defaults.k),
            min_neighborhood_size_k: optional(conf, &path, "min_neighborhood_size_k")?
                .unwrap_or(defaults.min_k),
            shrinkage: optional(conf, &path, "shrinkage")?.unwrap_or(defaults.similarity.shrinkage),
            min_support: optional(conf, &path, "min_support")?
                .unwrap_or(defaults.similarity.min_support),
            baseline_epochs: optional(conf, &path, "baseline_epochs")?
                .unwrap_or(defaults.baseline.n_epochs),
            reg_user: optional(conf, &path, "reg_user")?.unwrap_or(defaults.baseline.reg_user),
            reg_item: optional(conf, &path, "reg_item")?.unwrap_or(defaults.baseline.reg_item),
        })
    }
}

impl RecommendConfig {
    fn parse(conf: &Config, path: ConfPath) -> Result<RecommendConfig> {
        Ok(RecommendConfig {
            num_items_to_recommend: optional(conf, &path, "num_items_to_recommend")?
                .unwrap_or(DEFAULT_NUM_ITEMS_TO_RECOMMEND),
            count_threshold: optional(conf, &path, "count_threshold")?
                .unwrap_or(DEFAULT_COUNT_THRESHOLD),
            tie_break_seed: optional(conf, &path, "tie_break_seed")?,
        })
    }
}

impl UsersConfig {
    fn parse(conf: &Config, path: ConfPath) -> Result<UsersConfig> {
        let seed_users = match conf.get(path.push("seed_users")) {
            Ok(_) => conf
                .get(path.push("seed_users"))
                .split_list()
                .values(..)
                .map_err(config_error)?,
            Err(_) => DEFAULT_SEED_USERS.to_vec(),
        };
        let new_users_since = match conf.get(path.push("new_users_since")) {
            Ok(_) => {
                let since: String = conf
                    .get(path.push("new_users_since"))
                    .unquote()
                    .value()
                    .map_err(config_error)?;
                let since = since.trim();
                if since.is_empty() || since == "none" {
                    None
                } else {
                    Some(NaiveDate::parse_from_str(since, "%Y-%m-%d").map_err(|err| {
                        Error::Config(format!("users.new_users_since '{}': {}", since, err))
                    })?)
                }
            }
            Err(_) => NaiveDate::parse_from_str(DEFAULT_NEW_USERS_SINCE, "%Y-%m-%d").ok(),
        };
        Ok(UsersConfig {
            seed_users,
            new_users_since,
        })
    }
}

impl PipelineConfig {
    fn parse(conf: &Config, path: ConfPath) -> Result<PipelineConfig> {
        let catalogs = match conf.get(path.push("catalogs")) {
            Ok(_) => {
                let names: Vec<String> = conf
                    .get(path.push("catalogs"))
                    .split_list()
                    .values(..)
                    .map_err(config_error)?;
                names
                    .iter()
                    .map(|name| name.parse::<Catalog>())
                    .collect::<Result<Vec<Catalog>>>()?
            }
            Err(_) => Catalog::ALL.to_vec(),
        };
        Ok(PipelineConfig {
            catalogs,
            num_workers: optional(conf, &path, "num_workers")?
                // Detect number of CPUs
                .unwrap_or_else(|| sys_info::cpu_num().map(|cpus| cpus as usize).unwrap_or(1)),
            show_progress: optional(conf, &path, "show_progress")?.unwrap_or(true),
        })
    }
}

impl LogConfig {
    fn parse(conf: &Config, path: ConfPath) -> LogConfig {
        LogConfig {
            level: conf
                .get(path.push("level"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from(DEFAULT_LOG_LEVEL)),
        }
    }
}

/// A value that may be absent, but must parse when present.
fn optional<T>(conf: &Config, path: &ConfPath, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + 'static,
{
    let item = conf.get(path.push(key));
    if item.is_err() {
        return Ok(None);
    }
    item.trim().value().map(Some).map_err(config_error)
}

#[cfg(test)]
mod config_test {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn should_fall_back_to_defaults() {
        let config = AppConfig::new("does-not-exist.conf").unwrap();

        assert_eq!(40, config.recommend.num_items_to_recommend);
        assert_eq!(50, config.recommend.count_threshold);
        assert_eq!(None, config.recommend.tie_break_seed);
        assert_eq!(40, config.model.neighborhood_size_k);
        assert_eq!(1, config.model.min_neighborhood_size_k);
        assert_eq!(DEFAULT_SEED_USERS.to_vec(), config.users.seed_users);
        assert_eq!(NaiveDate::from_ymd_opt(2024, 8, 1), config.users.new_users_since);
        assert_eq!(vec![Catalog::Books, Catalog::Mangas], config.pipeline.catalogs);
        assert!(config.pipeline.num_workers >= 1);
        assert_eq!(SinkKind::Csv, config.data.sink);
    }

    #[test]
    fn should_read_values_from_config_file() {
        let file = write_config(
            "[data]\n\
             data_dir = \"fixtures\"\n\
             sink = rocksdb\n\
             rocksdb_path = \"out/db\"\n\
             [recommend]\n\
             num_items_to_recommend = 10\n\
             count_threshold = 5\n\
             tie_break_seed = 7\n\
             [users]\n\
             seed_users = \"1, 2, 3\"\n\
             new_users_since = none\n\
             [pipeline]\n\
             catalogs = mangas\n\
             show_progress = false\n",
        );

        let config = AppConfig::new(file.path().to_str().unwrap()).unwrap();

        assert_eq!("fixtures", config.data.data_dir);
        assert_eq!(SinkKind::RocksDb, config.data.sink);
        assert_eq!("out/db", config.data.rocksdb_path);
        assert_eq!(10, config.recommend.num_items_to_recommend);
        assert_eq!(5, config.recommend.count_threshold);
        assert_eq!(Some(7), config.recommend.tie_break_seed);
        assert_eq!(vec![1, 2, 3], config.users.seed_users);
        assert_eq!(None, config.users.new_users_since);
        assert_eq!(vec![Catalog::Mangas], config.pipeline.catalogs);
        assert!(!config.pipeline.show_progress);

        let settings = config.pipeline_settings().unwrap();
        assert_eq!(10, settings.num_items);
        assert_eq!(5, settings.count_threshold);
    }

    #[test]
    fn should_reject_negative_threshold_and_empty_output() {
        let file = write_config("[recommend]\ncount_threshold = -1\n");
        let config = AppConfig::new(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(config.pipeline_settings(), Err(Error::InvalidSettings(_))));

        let file = write_config("[recommend]\nnum_items_to_recommend = 0\n");
        let config = AppConfig::new(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(config.pipeline_settings(), Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn should_report_unparsable_values() {
        let file = write_config("[model]\nneighborhood_size_k = many\n");

        assert!(matches!(AppConfig::new(file.path().to_str().unwrap()), Err(Error::Config(_))));
    }

    #[test]
    fn should_reject_unknown_sink() {
        let file = write_config("[data]\nsink = postgres\n");

        assert!(matches!(AppConfig::new(file.path().to_str().unwrap()), Err(Error::Config(_))));
    }

    #[test]
    fn should_reject_unknown_catalog() {
        let file = write_config("[pipeline]\ncatalogs = books, comics\n");

        assert!(matches!(
            AppConfig::new(file.path().to_str().unwrap()),
            Err(Error::UnknownCatalog(_))
        ));
    }
}
