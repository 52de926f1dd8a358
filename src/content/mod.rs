//! Content item model shared by the store, fetchers, and search.

mod item;

pub use item::{ContentItem, ContentType};
