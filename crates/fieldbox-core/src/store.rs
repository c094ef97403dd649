//! # Document Store
//!
//! File I/O for documents: sidecar text files, per-box data files and the
//! top-level document file.
//!
//! Writing a sidecar or data file can fail per item (logged, the save carries
//! on); failing to write the document file itself is returned to the caller.
//! Reading a document that does not exist is the "new document" case, not an
//! error.

use crate::anchors::Anchors;
use crate::codec::{CompiledDocument, LoadStage, Reconstruction, Reconstructor};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::formats::{Document, data_to_string, document_from_str, document_to_string};
use crate::graph::BoxGraph;
use crate::registry::BoxTypeRegistry;
use crate::workspace::Workspace;
use crate::FieldboxError;
use std::fs;
use std::io;
use std::path::Path;

/// Counts from one `write`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub records: usize,
    pub files_written: usize,
}

/// Result of reading a document and reconstructing its boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub document: Document,
    pub reconstruction: Reconstruction,
    pub stage: LoadStage,
}

// =============================================================================
// WRITE
// =============================================================================

/// Write every record's files, then the document at `path`.
pub fn write(
    workspace: &Workspace,
    path: &str,
    compiled: &CompiledDocument,
    diagnostics: &mut Diagnostics,
) -> Result<WriteSummary, FieldboxError> {
    let mut summary = WriteSummary {
        records: compiled.document.records.len(),
        files_written: 0,
    };

    for (_, payload) in compiled.iter() {
        for (file, text) in &payload.texts {
            if write_sidecar(workspace, file, text, diagnostics) {
                summary.files_written += 1;
            }
        }

        match data_to_string(&payload.data) {
            Ok(text) => {
                if write_sidecar(workspace, &payload.data_file, &text, diagnostics) {
                    summary.files_written += 1;
                }
            }
            Err(e) => diagnostics.record(Diagnostic::WriteFailed {
                path: workspace.resolve(&payload.data_file),
                reason: e.to_string(),
            }),
        }
    }

    let text = document_to_string(&compiled.document)?;
    let target = workspace.resolve(path);
    write_atomic(&target, text.as_bytes()).map_err(|e| {
        FieldboxError::IoError(format!("Cannot write document {}: {}", target.display(), e))
    })?;
    summary.files_written += 1;

    tracing::info!(
        "wrote {} records ({} files) to {}",
        summary.records,
        summary.files_written,
        target.display()
    );
    Ok(summary)
}

fn write_sidecar(
    workspace: &Workspace,
    file: &str,
    text: &str,
    diagnostics: &mut Diagnostics,
) -> bool {
    let target = workspace.resolve(file);
    match write_atomic(&target, text.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            diagnostics.record(Diagnostic::WriteFailed {
                path: target,
                reason: e.to_string(),
            });
            false
        }
    }
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
///
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path has no file name"))?;
    let tmp = parent.join(format!(
        ".{}.tmp-{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

// =============================================================================
// READ
// =============================================================================

/// Read and decode the document at `path`. `Ok(None)` if there is no file.
pub fn read(workspace: &Workspace, path: &str) -> Result<Option<Document>, FieldboxError> {
    let target = workspace.resolve(path);
    if !target.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&target).map_err(|e| {
        FieldboxError::IoError(format!("Cannot read document {}: {}", target.display(), e))
    })?;
    document_from_str(&text).map(Some)
}

/// Read the document at `path` and rebuild its boxes in `graph`.
///
/// A missing document yields an empty `Loaded` at `LoadStage::Empty`.
pub fn load(
    workspace: &Workspace,
    types: &BoxTypeRegistry,
    path: &str,
    graph: &mut BoxGraph,
    anchors: &Anchors,
    diagnostics: &mut Diagnostics,
) -> Result<Loaded, FieldboxError> {
    let Some(document) = read(workspace, path)? else {
        tracing::info!("no document at {}, starting a new one", path);
        return Ok(Loaded {
            document: Document::new(),
            reconstruction: Reconstruction::default(),
            stage: LoadStage::Empty,
        });
    };

    let reconstruction =
        Reconstructor::new(workspace, types).reconstruct(&document, graph, anchors, diagnostics);

    tracing::info!(
        "loaded {} boxes from {} ({} diagnostics)",
        reconstruction.created.len(),
        path,
        diagnostics.len()
    );
    Ok(Loaded {
        document,
        reconstruction,
        stage: LoadStage::EdgesWired,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RecordPayload;
    use crate::formats::Record;
    use crate::{Properties, PropertyValue};

    fn compiled_one() -> CompiledDocument {
        let mut data = Properties::new();
        data.insert("name".into(), PropertyValue::Text("foo".into()));

        let mut compiled = CompiledDocument::default();
        compiled.document.records.push(Record {
            id: "uid".into(),
            type_tag: "default".into(),
            text_files: [("code".to_string(), "{{workspace}}foo_code.js".to_string())].into(),
            data_file: "{{workspace}}foo_code.js.box".into(),
            parents: Default::default(),
            children: Default::default(),
        });
        compiled.payloads.push(RecordPayload {
            texts: [("{{workspace}}foo_code.js".to_string(), "print(1)".to_string())].into(),
            data_file: "{{workspace}}foo_code.js.box".into(),
            data,
        });
        compiled
    }

    #[test]
    fn write_creates_sidecars_and_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ws = Workspace::new(dir.path());
        let mut diags = Diagnostics::new();

        let summary = write(&ws, "{{workspace}}doc.field2", &compiled_one(), &mut diags)
            .expect("write");

        assert_eq!(summary, WriteSummary { records: 1, files_written: 3 });
        assert_eq!(
            fs::read_to_string(dir.path().join("foo_code.js")).expect("code"),
            "print(1)"
        );
        assert!(dir.path().join("foo_code.js.box").exists());
        assert!(dir.path().join("doc.field2").exists());
        assert!(diags.is_empty());
    }

    #[test]
    fn failed_sidecar_is_reported_and_save_continues() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("blocker"), "file, not a directory").expect("write");
        let ws = Workspace::new(dir.path());
        let mut compiled = compiled_one();
        compiled.payloads[0].texts = [(
            "{{workspace}}blocker/foo_code.js".to_string(),
            "print(1)".to_string(),
        )]
        .into();
        let mut diags = Diagnostics::new();

        let summary = write(&ws, "{{workspace}}doc.field2", &compiled, &mut diags)
            .expect("write");

        assert_eq!(summary, WriteSummary { records: 1, files_written: 2 });
        let blocked = dir.path().join("blocker").join("foo_code.js");
        assert!(matches!(
            diags.entries(),
            [Diagnostic::WriteFailed { path, .. }] if *path == blocked
        ));
        assert!(dir.path().join("foo_code.js.box").is_file());
        assert!(dir.path().join("doc.field2").is_file());
    }

    #[test]
    fn unwritable_document_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").expect("write");
        let ws = Workspace::new(dir.path());

        let target = blocker.join("doc.field2");
        let result = write(
            &ws,
            &target.to_string_lossy(),
            &CompiledDocument::default(),
            &mut Diagnostics::new(),
        );

        assert!(matches!(result, Err(FieldboxError::IoError(_))));
    }

    #[test]
    fn read_of_missing_document_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ws = Workspace::new(dir.path());

        assert!(read(&ws, "{{workspace}}absent.field2").expect("read").is_none());
    }

    #[test]
    fn load_of_missing_document_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ws = Workspace::new(dir.path());
        let mut graph = BoxGraph::new();

        let loaded = load(
            &ws,
            &BoxTypeRegistry::new(),
            "{{workspace}}absent.field2",
            &mut graph,
            &Anchors::new(),
            &mut Diagnostics::new(),
        )
        .expect("load");

        assert_eq!(loaded.stage, LoadStage::Empty);
        assert!(loaded.document.is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("doc.field2"), "not json").expect("write");
        let ws = Workspace::new(dir.path());

        assert!(matches!(
            read(&ws, "{{workspace}}doc.field2"),
            Err(FieldboxError::DeserializationError(_))
        ));
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("sub/out.txt");

        write_atomic(&target, b"hello").expect("write");
        write_atomic(&target, b"again").expect("overwrite");

        assert_eq!(fs::read_to_string(&target).expect("read"), "again");
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("sub"))
            .expect("dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
