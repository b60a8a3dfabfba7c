//! End-to-end pipelines: sources → dictionary → IOD parse → `IODs.json`.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use iodschema_dictionary::{DictionaryParse, load_dictionary, parse_dictionary, save_dictionary};
use iodschema_docbook::parse_document;
use iodschema_fetch::{DocumentSource, FetchOptions, fetch_source, fetch_sources};
use iodschema_shared::{Diagnostic, Result};

use crate::assembler::parse_iods;
use crate::output::write_output;

/// Configuration for the `generate` pipeline.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// PS3.3 source (IODs, modules, macros).
    pub part03: DocumentSource,
    /// PS3.6 source (data dictionary), only read when the cache is not used.
    pub part06: DocumentSource,
    /// IOD names to extract; empty means all.
    pub iods: Vec<String>,
    pub output_path: PathBuf,
    /// Dictionary cache location.
    pub dictionary_path: PathBuf,
    /// Rebuild the dictionary even when the cache exists.
    pub refresh_dictionary: bool,
    pub pretty: bool,
    pub fetch: FetchOptions,
}

/// Result of the `generate` pipeline.
#[derive(Debug)]
pub struct GenerateResult {
    pub output_path: PathBuf,
    pub iod_count: usize,
    pub module_count: usize,
    pub dictionary_entries: usize,
    /// The dictionary came from the cache rather than PS3.6.
    pub dictionary_cached: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed: std::time::Duration,
}

/// Configuration for the `dictionary` pipeline.
#[derive(Debug, Clone)]
pub struct DictionaryConfig {
    pub part06: DocumentSource,
    pub output_path: PathBuf,
    pub fetch: FetchOptions,
}

/// Result of the `dictionary` pipeline.
#[derive(Debug)]
pub struct DictionaryResult {
    pub output_path: PathBuf,
    pub entry_count: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self) {}
}

/// Run the full `generate` pipeline.
///
/// 1. Retrieve PS3.3, plus PS3.6 when the dictionary cache is missing or stale
/// 2. Parse and cache the dictionary (if retrieved)
/// 3. Parse the requested IODs
/// 4. Write the output
#[instrument(skip_all, fields(part03 = %config.part03, iods = config.iods.len()))]
pub async fn generate(
    config: &GenerateConfig,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();
    let use_cache = !config.refresh_dictionary && config.dictionary_path.exists();

    // --- Phase 1: Sources and dictionary ---
    progress.phase("Retrieving sources");
    let (part03_text, dictionary, mut diagnostics) = if use_cache {
        let part03_text = fetch_source(&config.part03, &config.fetch).await?;
        let dictionary = load_dictionary(&config.dictionary_path)?;
        info!(
            path = %config.dictionary_path.display(),
            entries = dictionary.len(),
            "using cached dictionary"
        );
        (part03_text, dictionary, Vec::new())
    } else {
        let (part03_text, part06_text) =
            fetch_sources(&config.part03, &config.part06, &config.fetch).await?;

        progress.phase("Parsing data dictionary");
        let parse = parse_part06(&part06_text)?;
        save_dictionary(&config.dictionary_path, &parse.dictionary)?;
        (part03_text, parse.dictionary, parse.diagnostics)
    };

    // --- Phase 2: IODs ---
    progress.phase("Parsing IODs");
    let doc = parse_document(&part03_text)?;
    let parse = parse_iods(&doc, &dictionary, &config.iods)?;
    diagnostics.extend(parse.diagnostics);

    // --- Phase 3: Output ---
    progress.phase("Writing output");
    write_output(&config.output_path, &parse.output, config.pretty)?;

    let result = GenerateResult {
        output_path: config.output_path.clone(),
        iod_count: parse.output.iods.len(),
        module_count: parse.output.modules.len(),
        dictionary_entries: dictionary.len(),
        dictionary_cached: use_cache,
        diagnostics,
        elapsed: start.elapsed(),
    };

    progress.done();

    info!(
        iods = result.iod_count,
        modules = result.module_count,
        diagnostics = result.diagnostics.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "generate pipeline complete"
    );

    Ok(result)
}

/// Retrieve PS3.6, parse it and write the dictionary cache.
#[instrument(skip_all, fields(part06 = %config.part06))]
pub async fn build_dictionary(
    config: &DictionaryConfig,
    progress: &dyn ProgressReporter,
) -> Result<DictionaryResult> {
    let start = Instant::now();

    progress.phase("Retrieving PS3.6");
    let text = fetch_source(&config.part06, &config.fetch).await?;

    progress.phase("Parsing data dictionary");
    let parse = parse_part06(&text)?;

    progress.phase("Writing dictionary");
    save_dictionary(&config.output_path, &parse.dictionary)?;

    let result = DictionaryResult {
        output_path: config.output_path.clone(),
        entry_count: parse.dictionary.len(),
        diagnostics: parse.diagnostics,
        elapsed: start.elapsed(),
    };

    progress.done();
    Ok(result)
}

fn parse_part06(text: &str) -> Result<DictionaryParse> {
    let doc = parse_document(text)?;
    parse_dictionary(&doc)
}
