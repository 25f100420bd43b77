//! Utility modules for the static site generator.

pub mod date;
pub mod log;
pub mod minify;
pub mod slug;
