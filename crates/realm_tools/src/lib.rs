//! # Realm Development Tools
//!
//! Command-line tools for content authors:
//! - Catalog validation, per file and merged
//! - Scenario checks against a catalog

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
