//! Lead collection, scoring and publishing for outbound sales.
//!
//! Scrapers under [`scraper`] write timestamped CSV/JSON files into the data
//! directory; [`merge`] folds those into one lead set, [`pipeline`] scores
//! business websites, and [`sheets`] publishes the results.

pub mod brands;
pub mod config;
pub mod export;
pub mod loader;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod scraper;
pub mod sheets;
pub mod storage;
pub mod utils;
