//! Configuration module for Seen
//!
//! This module handles loading, parsing, and validating TOML session
//! configuration, and turns declarative parser entries into [`Parser`]s.
//!
//! # Example
//!
//! ```no_run
//! use seen::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Crawling from {:?}", config.spider.roots);
//! ```
//!
//! [`Parser`]: crate::crawler::Parser

mod assemble;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FieldEntry, HttpMethod, ItemEntry, OutputConfig, ParserEntry, SpiderConfig,
};

// Re-export functions
pub use assemble::build_parsers;
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, validate_spider_config};
