extern crate mangoleaf;

use std::env;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use mangoleaf::config::{AppConfig, SinkKind};
use mangoleaf::pipeline::update_database;
use mangoleaf::store::CsvStore;
#[cfg(feature = "rocksdb")]
use mangoleaf::store::RocksDbSink;
use mangoleaf::users::select_target_users;

fn main() -> anyhow::Result<()> {
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("mangoleaf.conf"));
    let config = AppConfig::new(&config_path)
        .with_context(|| format!("reading configuration {}", config_path))?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::new(&config.log.level))
        .init();

    let settings = config.pipeline_settings()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.pipeline.num_workers)
        .build_global()
        .context("configuring worker pool")?;
    info!("Using {} worker threads", config.pipeline.num_workers);

    let store = CsvStore::new(&config.data.data_dir, &config.data.output_dir);
    let target_users = select_target_users(
        &config.users.seed_users,
        &store,
        config.users.new_users_since,
    )?;

    let catalogs = &config.pipeline.catalogs;
    match config.data.sink {
        SinkKind::Csv => update_database(&store, &store, catalogs, &target_users, &settings)?,
        #[cfg(feature = "rocksdb")]
        SinkKind::RocksDb => {
            let sink = RocksDbSink::open(&config.data.rocksdb_path)
                .with_context(|| format!("opening {}", config.data.rocksdb_path))?;
            update_database(&store, &sink, catalogs, &target_users, &settings)?
        }
        #[cfg(not(feature = "rocksdb"))]
        SinkKind::RocksDb => {
            anyhow::bail!("sink 'rocksdb' needs a build with the rocksdb feature")
        }
    }
    info!("Database update finished");
    Ok(())
}
