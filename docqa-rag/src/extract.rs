//! Source discovery and text extraction.
//!
//! Raw text comes from an external extraction step (for PDFs, e.g.
//! `pdftotext`, which separates pages with form feeds). This module finds the
//! extracted files and splits them into [`PageText`]s.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::document::PageText;
use crate::error::{RagError, Result};

/// Page separator written by common PDF-to-text tools.
pub const PAGE_SEPARATOR: char = '\u{000C}';

/// Turns one source file into pages of text.
pub trait TextExtractor: Send + Sync {
    /// Extract the pages of `path`, labelling them with `source_id`.
    ///
    /// Pages without text may be omitted; a file yielding no pages is not an error.
    fn extract(&self, path: &Path, source_id: &str) -> Result<Vec<PageText>>;
}

/// Reads UTF-8 text files, splitting pages on form feeds.
///
/// Pages are numbered from 1 in file order,
/// trimmed, and dropped when blank (the numbering of later pages is kept).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// Split already-loaded text into pages for `source_id`.
    pub fn split_pages(source_id: &str, text: &str) -> Vec<PageText> {
        text.split(PAGE_SEPARATOR)
            .enumerate()
            .filter_map(|(i, page)| {
                let page = page.trim();
                (!page.is_empty()).then(|| PageText::new(source_id, Some(i as u32 + 1), page))
            })
            .collect()
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path, source_id: &str) -> Result<Vec<PageText>> {
        let text = fs::read_to_string(path).map_err(|e| RagError::SourceError {
            path: path.to_path_buf(),
            message: format!("read: {e}"),
        })?;
        Ok(Self::split_pages(source_id, &text))
    }
}

/// The identifier of a document found under `root`: its path relative to
/// `root`, with `/` separators on every platform.
///
/// Paths outside `root` keep their full form.
pub fn source_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// List files under `root` whose extension matches one of `extensions`
/// (case-insensitive, without the dot), sorted by path.
///
/// Symbolic links are followed.
///
/// # Errors
///
/// Returns [`RagError::SourceError`] if `root` does not exist or is not a
/// directory, or if any entry below it cannot be read (permissions, broken
/// links, link cycles). A partial listing is never returned.
pub fn discover_documents(root: impl AsRef<Path>, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(RagError::SourceError {
            path: root.to_path_buf(),
            message: "source directory not found".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| RagError::SourceError {
            path: e.path().unwrap_or(root).to_path_buf(),
            message: format!("walk: {e}"),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry.path().extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
            extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext))
        });
        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_pages_on_form_feed_and_skips_blank_pages() {
        let pages = PlainTextExtractor::split_pages("book.txt", "  one \u{000C}\n \u{000C}three");
        assert_eq!(
            pages,
            vec![
                PageText::new("book.txt", Some(1), "one"),
                PageText::new("book.txt", Some(3), "three"),
            ]
        );
    }

    #[test]
    fn discovers_matching_files_sorted() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("nested/a.TXT"), "a").unwrap();
        fs::write(root.join("notes.pdf"), "binary").unwrap();

        let files = discover_documents(root, &["txt"]).unwrap();
        assert_eq!(files, vec![root.join("b.txt"), root.join("nested/a.TXT")]);
    }

    #[test]
    fn missing_directory_is_a_source_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_documents(temp.path().join("nope"), &["txt"]),
            Err(RagError::SourceError { .. })
        ));
    }

    #[test]
    fn extract_labels_pages_with_the_given_source_id() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();

        let pages = PlainTextExtractor.extract(&path, "physics/notes.txt").unwrap();
        assert_eq!(pages, vec![PageText::new("physics/notes.txt", Some(1), "hello")]);
    }

    #[test]
    fn source_id_is_relative_to_the_root() {
        let root = Path::new("data");
        assert_eq!(source_id(root, &root.join("bio").join("notes.txt")), "bio/notes.txt");
        assert_eq!(source_id(root, &root.join("notes.txt")), "notes.txt");
        assert_ne!(
            source_id(root, &root.join("bio").join("notes.txt")),
            source_id(root, &root.join("physics").join("notes.txt"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn link_cycles_fail_discovery() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(root, root.join("cycle")).unwrap();

        assert!(matches!(discover_documents(root, &["txt"]), Err(RagError::SourceError { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn broken_links_fail_discovery() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(root.join("gone.txt"), root.join("b.txt")).unwrap();

        assert!(matches!(discover_documents(root, &["txt"]), Err(RagError::SourceError { .. })));
    }
}
