//! Shared types, error model, and configuration for compenrich.
//!
//! This crate is the foundation depended on by all other compenrich crates.
//! It provides:
//! - [`CompenrichError`], the unified error type
//! - Domain types ([`InputRow`], [`EnrichedRecord`], [`FailureRecord`], [`OutputEntry`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, DefaultsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, local_config_path, resolve_api_key,
};
pub use error::{CompenrichError, Result};
pub use types::{
    ContactInformation, EnrichedRecord, FailureRecord, InputRow, ManufacturingTag,
    NO_VALID_DATA, OutputEntry,
};
