//! SiteMirror - legacy website mirroring and snapshot serving toolkit.
//!
//! Mirrors a legacy website into an immutable, queryable snapshot store:
//! route discovery, browser capture, document classification, HTML
//! sanitization, content-addressed asset sync and a search index.

pub mod artifacts;
pub mod assets;
pub mod cli;
pub mod config;
pub mod content;
pub mod discovery;
pub mod models;
pub mod paths;
pub mod query;
pub mod routes;
pub mod sanitize;
pub mod search;
pub mod snapshot;
pub mod utils;
pub mod verify;
