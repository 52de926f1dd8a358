//! Terminal text helpers for the CLI listing.
//!
//! Widths are measured in terminal columns via `unicode-width`, so CJK
//! titles and emoji line up with ASCII ones.

mod text;

pub use text::{display_width, fit_to_width, single_line, truncate_to_width};
