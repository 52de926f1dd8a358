//! Content-state synchronization for an aggregated dashboard.
//!
//! News, movie, and social batches are fetched concurrently and folded into a
//! single [`store::ContentStore`]. Users favorite, reorder, and search that
//! content; a small set of preferences survives restarts in SQLite.

pub mod config;
pub mod content;
pub mod dashboard;
pub mod fetch;
pub mod preferences;
pub mod search;
pub mod storage;
pub mod store;
pub mod util;
