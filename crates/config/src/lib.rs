//! Configuration for the batch720 transcoder
//!
//! Directory, encoder and CPU settings from an optional TOML file, with
//! `BATCH720_*` environment variables taking precedence.

pub mod config;

pub use config::*;
