//! URL handling module for Seen
//!
//! This module provides host derivation, the allow-list check applied before a
//! URL is fetched, and resolution of discovered links against the page they
//! were found on.
//!
//! URLs are kept as plain strings. Two URLs are the same URL when their
//! resolved string forms are equal; no further canonicalization happens.

mod domain;
mod resolve;

// Re-export main functions
pub use domain::{extract_host, host_allowed, is_http_url, parse_http_url};
pub use resolve::resolve_url;
