pub mod catalog;
pub mod config;
pub mod config_processors;
pub mod error;
pub mod io;
pub mod knn;
pub mod pipeline;
pub mod recommend;
pub mod stats;
pub mod stopwatch;
pub mod store;
pub mod tables;
pub mod users;
