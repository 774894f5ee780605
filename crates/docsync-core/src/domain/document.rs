//! Document domain types
//!
//! A [`Document`] is a candidate file on the local disk. Only files whose
//! extension maps to a [`DocumentKind`] are ever considered for sync.
//! [`MetadataHints`] are best-effort attributes guessed from the path and
//! sent along with an upload.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::newtypes::Checksum;

// ============================================================================
// DocumentKind
// ============================================================================

/// Recognized document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Doc,
    PlainText,
    Markdown,
}

impl DocumentKind {
    /// Every recognized kind, in allowlist order
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Pdf,
        DocumentKind::Docx,
        DocumentKind::Doc,
        DocumentKind::PlainText,
        DocumentKind::Markdown,
    ];

    /// Determines the kind from a path's extension (case-insensitive)
    ///
    /// Returns `None` for unrecognized or missing extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "doc" => Some(DocumentKind::Doc),
            "txt" => Some(DocumentKind::PlainText),
            "md" => Some(DocumentKind::Markdown),
            _ => None,
        }
    }

    /// Canonical file extension (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Doc => "doc",
            DocumentKind::PlainText => "txt",
            DocumentKind::Markdown => "md",
        }
    }

    /// MIME type sent with the upload
    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Doc => "application/msword",
            DocumentKind::PlainText => "text/plain",
            DocumentKind::Markdown => "text/markdown",
        }
    }
}

/// Returns true if the path has a recognized document extension
pub fn is_recognized(path: &Path) -> bool {
    DocumentKind::from_path(path).is_some()
}

// ============================================================================
// Document
// ============================================================================

/// A candidate file identified by its absolute path
///
/// Documents are never persisted; only their checksum ends up in the sync
/// state once the content is known to be on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    kind: DocumentKind,
    modified: Option<SystemTime>,
    checksum: Option<Checksum>,
}

impl Document {
    /// Creates a Document for a path with a recognized extension
    ///
    /// Returns `None` if the extension is not in the allowlist.
    pub fn new(path: PathBuf) -> Option<Self> {
        let kind = DocumentKind::from_path(&path)?;
        Some(Self {
            path,
            kind,
            modified: None,
            checksum: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// File name for logs and the upload form; falls back to the full path
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    /// Records the checksum computed for a given modification time
    ///
    /// A later call with a different timestamp replaces both values, which is
    /// how a re-evaluated document picks up new content.
    pub fn set_checksum(&mut self, modified: SystemTime, checksum: Checksum) {
        self.modified = Some(modified);
        self.checksum = Some(checksum);
    }

    /// Best-effort metadata guessed from the path
    pub fn metadata_hints(&self) -> MetadataHints {
        MetadataHints::from_path(&self.path)
    }
}

/// File name of a path as a lossy string, or the whole path if it has none
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// MetadataHints
// ============================================================================

/// Parent folder names that carry no job information
const GENERIC_FOLDERS: &[&str] = &["CVs", "Resumes", "Candidates"];

/// Optional attributes extracted from a document's path
///
/// Extraction is a heuristic: anything that does not match simply leaves
/// the field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataHints {
    /// Name of the enclosing folder, when it looks like a job position
    pub job_hint: Option<String>,
    /// Email address embedded in the file name (`Jane_jane@example.com.pdf`)
    pub email: Option<String>,
}

impl MetadataHints {
    /// Extracts hints from a path
    ///
    /// - `job_hint`: the parent folder name unless it is one of the generic
    ///   collection folders (`CVs`, `Resumes`, `Candidates`)
    /// - `email`: the first `_`-separated token of the file stem that
    ///   contains an `@`
    pub fn from_path(path: &Path) -> Self {
        let job_hint = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .filter(|name| !name.is_empty() && !GENERIC_FOLDERS.contains(name))
            .map(str::to_string);

        let email = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| stem.split('_').find(|part| part.contains('@')))
            .map(str::to_string);

        Self { job_hint, email }
    }

    pub fn is_empty(&self) -> bool {
        self.job_hint.is_none() && self.email.is_none()
    }
}
