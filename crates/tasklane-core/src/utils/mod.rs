//! Utility functions for terminal-friendly formatting.

pub mod format;

pub use format::{format_due_date, format_remaining, truncate_string};
