//! Shared types, error model, and configuration for the IOD schema extractor.
//!
//! This crate is the foundation depended on by all other `iodschema` crates.
//! It provides:
//! - [`SchemaError`] — the unified error type
//! - Domain types ([`Tag`], [`Attribute`], [`ItemCount`], [`Iod`], [`SchemaOutput`])
//! - Diagnostics ([`Diagnostic`], [`DiagnosticKind`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchConfig, OutputConfig, SourcesConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{Result, SchemaError};
pub use types::{
    Attribute, AttributeKind, Diagnostic, DiagnosticKind, Dictionary, DictionaryEntry, Iod,
    ItemCount, ModuleUsage, ParsedTag, SchemaOutput, Tag, ValueRepresentation,
};
