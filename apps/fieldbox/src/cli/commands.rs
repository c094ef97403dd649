//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command builds its engine from the `Config`, creates a fresh root
//! box anchored under [`ROOT_ANCHOR`] and loads the document onto it.

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use fieldbox_core::{
    Anchors, BoxGraph, BoxId, Diagnostic, Diagnostics, FieldboxError, LoadOutcome,
    PersistenceEngine,
};
use std::path::{Path, PathBuf};

/// Anchor key of the box every document hangs off.
pub const ROOT_ANCHOR: &str = "root";

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for import (100 MB).
///
/// This prevents memory exhaustion from accidental large files.
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FieldboxError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FieldboxError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(FieldboxError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, FieldboxError> {
    let canonical = path.canonicalize().map_err(|e| {
        FieldboxError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(FieldboxError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// OPEN DOCUMENT
// =============================================================================

/// A document loaded onto a fresh anchored root.
#[derive(Debug)]
pub struct OpenDocument {
    pub engine: PersistenceEngine,
    pub graph: BoxGraph,
    pub root: BoxId,
    pub anchors: Anchors,
    pub outcome: LoadOutcome,
}

impl OpenDocument {
    /// Save the graph back to `path`, returning the save's diagnostics.
    pub fn save(&mut self, path: &str) -> Result<fieldbox_core::SaveOutcome, FieldboxError> {
        self.engine
            .save(&mut self.graph, self.root, &self.anchors, path)
    }
}

/// Build the configured engine and load the document at `path`.
pub fn open_document(config: &Config, path: &str) -> Result<OpenDocument, FieldboxError> {
    let mut engine = config.engine()?;
    let mut graph = BoxGraph::new();
    let root = graph.insert_default();
    let anchors = Anchors::with(ROOT_ANCHOR, root);
    let outcome = engine.load(path, &mut graph, &anchors)?;

    Ok(OpenDocument {
        engine,
        graph,
        root,
        anchors,
        outcome,
    })
}

fn diagnostic_strings(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(ToString::to_string).collect()
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("Diagnostics ({}):", diagnostics.len());
    for diagnostic in diagnostics {
        println!("  - {}", diagnostic);
    }
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Show the records of a document and what loading it reported.
pub fn cmd_inspect(
    config: &Config,
    path: &str,
    json_mode: bool,
    verbose: bool,
) -> Result<(), FieldboxError> {
    let open = open_document(config, path)?;
    let outcome = &open.outcome;

    if json_mode {
        let output = serde_json::json!({
            "document": path,
            "workspace": open.engine.workspace().root().to_string_lossy(),
            "was_new": outcome.was_new,
            "records": outcome.document.records,
            "filespecs": outcome.document.filespecs,
            "persisted": outcome.document.persisted,
            "hooks_run": outcome.hooks_run,
            "diagnostics": diagnostic_strings(&outcome.diagnostics),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Fieldbox Document");
    println!("=================");
    println!("Document:  {}", path);
    println!("Workspace: {}", open.engine.workspace().root().display());
    if outcome.was_new {
        println!();
        println!("(no document yet)");
        return Ok(());
    }
    println!("Records:   {}", outcome.document.records.len());
    println!();

    for record in &outcome.document.records {
        let name = outcome
            .by_identity
            .get(&record.id)
            .and_then(|&id| open.graph.get(id))
            .and_then(|node| node.name())
            .unwrap_or("-");
        println!("  {}  {:<12} {}", record.id, record.type_tag, name);

        if verbose {
            for (property, file) in &record.text_files {
                println!("      {:<10} {}", property, file);
            }
            println!("      {:<10} {}", "data", record.data_file);
            println!(
                "      parents: {}  children: {}",
                record.parents.len(),
                record.children.len()
            );
        }
    }

    print_diagnostics(&outcome.diagnostics);
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Add each file as a child of the document root, then save.
///
/// `.box` files are loaded as whole boxes (data plus sidecars); anything else
/// becomes a box whose file-backed property holds the file's text.
pub fn cmd_import(
    config: &Config,
    path: &str,
    files: &[PathBuf],
    json_mode: bool,
) -> Result<(), FieldboxError> {
    let mut open = open_document(config, path)?;
    let mut diagnostics = Diagnostics::new();
    let mut imported = Vec::with_capacity(files.len());

    for file in files {
        let canonical = validate_file_path(file)?;
        validate_file_size(&canonical, MAX_IMPORT_FILE_SIZE)?;

        let id = if open.engine.is_box_file(&canonical) {
            let id = open
                .engine
                .load_single_box(&mut open.graph, &canonical, &mut diagnostics)?;
            open.graph.connect(open.root, id)?;
            id
        } else {
            open.engine
                .import_text_file(&mut open.graph, open.root, &canonical)?
        };
        tracing::debug!("imported {} as box {}", canonical.display(), id);
        imported.push(canonical);
    }

    let saved = open.save(path)?;
    let mut all = diagnostics.into_vec();
    all.extend(saved.diagnostics);

    if json_mode {
        let output = serde_json::json!({
            "document": path,
            "imported": imported.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
            "records": saved.summary.records,
            "files_written": saved.summary.files_written,
            "diagnostics": diagnostic_strings(&all),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Imported {} file(s) into {}", imported.len(), path);
    println!(
        "Saved {} record(s), {} file(s) written",
        saved.summary.records, saved.summary.files_written
    );
    print_diagnostics(&all);
    Ok(())
}

// =============================================================================
// RESAVE COMMAND
// =============================================================================

/// Load a document and save it again.
///
/// Boxes that lost a file slot get a fresh path; fallback boxes keep their
/// recorded type tags.
pub fn cmd_resave(config: &Config, path: &str, json_mode: bool) -> Result<(), FieldboxError> {
    let mut open = open_document(config, path)?;
    let saved = open.save(path)?;

    let mut all = open.outcome.diagnostics.clone();
    all.extend(saved.diagnostics.iter().cloned());

    if json_mode {
        let output = serde_json::json!({
            "document": path,
            "was_new": open.outcome.was_new,
            "records": saved.summary.records,
            "files_written": saved.summary.files_written,
            "diagnostics": diagnostic_strings(&all),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "Resaved {}: {} record(s), {} file(s) written",
        path, saved.summary.records, saved.summary.files_written
    );
    print_diagnostics(&all);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the workspace, write a config file if there is none, and save an
/// empty document.
pub fn cmd_init(
    config: &Config,
    config_path: Option<&Path>,
    force: bool,
) -> Result<(), FieldboxError> {
    let mut engine = config.engine()?;

    let document = engine.workspace().resolve(&config.document);
    if document.exists() && !force {
        return Err(FieldboxError::IoError(format!(
            "Document {} already exists. Use --force to overwrite.",
            document.display()
        )));
    }

    let config_file = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if !config_file.exists() {
        std::fs::write(config_file, config.to_toml()?).map_err(|e| {
            FieldboxError::ConfigError(format!(
                "Cannot write config {}: {}",
                config_file.display(),
                e
            ))
        })?;
        println!("Wrote configuration to {}", config_file.display());
    }

    let mut graph = BoxGraph::new();
    let root = graph.insert_default();
    engine.save(
        &mut graph,
        root,
        &Anchors::with(ROOT_ANCHOR, root),
        &config.document,
    )?;

    println!(
        "Initialized workspace {} with empty document {}",
        engine.workspace().root().display(),
        document.display()
    );
    Ok(())
}

// =============================================================================
// CATALOG COMMAND
// =============================================================================

/// Show the filespecs and persisted properties, optionally merged with the
/// catalog stored in a document.
pub fn cmd_catalog(
    config: &Config,
    document: Option<&str>,
    json_mode: bool,
) -> Result<(), FieldboxError> {
    let engine = match document {
        Some(path) => open_document(config, path)?.engine,
        None => config.engine()?,
    };
    let catalog = engine.catalog();

    if json_mode {
        let output = serde_json::json!({
            "filespecs": catalog.filespecs(),
            "persisted": catalog.persisted(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("File-backed properties:");
    for spec in catalog.filespecs().values() {
        println!(
            "  {:<12} {:<16} {}",
            spec.name,
            String::from(spec.suffix.clone()),
            spec.language
        );
    }
    println!();
    println!("Persisted properties:");
    for name in catalog.persisted() {
        println!("  {}", name);
    }

    Ok(())
}
