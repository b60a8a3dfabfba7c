//! Core parsing and pipeline orchestration for iodschema.
//!
//! This crate turns the DocBook tables of PS3.3 into nested attribute trees:
//! the tabular index, row classification, depth-tree reconstruction, macro
//! and module resolution, value-list and item-count extraction, and the
//! end-to-end `generate` pipeline.

pub mod assembler;
pub mod cache;
pub mod cardinality;
pub mod diagnostics;
pub mod index;
pub mod macros;
pub mod output;
pub mod pipeline;
pub mod row;
pub mod tree;
pub mod values;

#[cfg(test)]
mod test_support;

pub use assembler::{SchemaParse, find_iod_tables, parse_iods};
pub use index::TabularIndex;
pub use output::write_output;
pub use pipeline::{
    DictionaryConfig, DictionaryResult, GenerateConfig, GenerateResult, ProgressReporter,
    SilentProgress, build_dictionary, generate,
};
pub use tree::TreeBuilder;
