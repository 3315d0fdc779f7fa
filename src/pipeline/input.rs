//! Input discovery: find the source PDFs in a directory and name their
//! outputs.
//!
//! A missing input directory is created on the spot so the user has an
//! obvious place to drop documents, and the run stops with
//! [`TranslateError::NoInputFiles`] pointing at it.

use crate::error::TranslateError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// List the `*.pdf` files directly inside `dir`, in lexical order.
///
/// The extension match is case-insensitive. Subdirectories are not searched.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>, TranslateError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            TranslateError::Internal(format!("cannot create input directory '{}': {e}", dir.display()))
        })?;
        info!("Created input directory {}", dir.display());
        return Err(TranslateError::NoInputFiles {
            dir: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => TranslateError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => TranslateError::Internal(format!("cannot read '{}': {e}", dir.display())),
    })?;

    let mut sources: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_pdf_extension(path))
        .collect();
    sources.sort();

    if sources.is_empty() {
        return Err(TranslateError::NoInputFiles {
            dir: dir.to_path_buf(),
        });
    }
    debug!("Found {} PDFs in {}", sources.len(), dir.display());
    Ok(sources)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// `output_dir/{prefix}{stem}.pdf` for a given source file.
pub fn output_path_for(source: &Path, output_dir: &Path, prefix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{prefix}{stem}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dir_is_created_and_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("books");
        let err = discover_sources(&dir).unwrap_err();
        assert!(matches!(err, TranslateError::NoInputFiles { .. }));
        assert!(dir.is_dir());
    }

    #[test]
    fn empty_dir_has_no_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_sources(tmp.path()),
            Err(TranslateError::NoInputFiles { .. })
        ));
    }

    #[test]
    fn pdfs_are_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt", "c.Pdf"] {
            std::fs::write(tmp.path().join(name), b"%PDF-1.4").unwrap();
        }
        std::fs::create_dir(tmp.path().join("nested.pdf")).unwrap();

        let found: Vec<String> = discover_sources(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["A.PDF", "b.pdf", "c.Pdf"]);
    }

    #[test]
    fn output_name_uses_prefix_and_stem() {
        let out = output_path_for(Path::new("books/Report.PDF"), Path::new("out"), "translated_");
        assert_eq!(out, PathBuf::from("out/translated_Report.pdf"));
    }
}
