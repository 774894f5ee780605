//! Recursive document discovery
//!
//! Walks the sync folder and returns every regular file with a recognized
//! document extension. Symlinks are not followed. Unreadable
//! subdirectories are logged and skipped; only an unreadable root aborts
//! the walk.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use docsync_core::domain::document::is_recognized;
use tracing::{debug, warn};

use crate::SyncError;

/// Lists recognized documents under `root`, sorted by path
///
/// # Errors
/// Returns [`SyncError::PathNotFound`] if `root` is not a directory, or
/// [`SyncError::IoError`] if it cannot be listed
pub async fn discover_documents(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    match tokio::fs::metadata(root).await {
        Ok(m) if m.is_dir() => {}
        Ok(_) => return Err(SyncError::PathNotFound(root.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SyncError::PathNotFound(root.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    }

    let mut found = Vec::new();
    let mut read_dir = tokio::fs::read_dir(root).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        visit(entry, &mut found).await;
    }

    found.sort();
    debug!(root = %root.display(), count = found.len(), "Document discovery complete");
    Ok(found)
}

fn walk_dir<'a>(
    dir: PathBuf,
    found: &'a mut Vec<PathBuf>,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Cannot read directory, skipping");
                return;
            }
        };

        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => visit(entry, found).await,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Directory listing interrupted");
                    break;
                }
            }
        }
    })
}

async fn visit(entry: tokio::fs::DirEntry, found: &mut Vec<PathBuf>) {
    let path = entry.path();
    let file_type = match entry.file_type().await {
        Ok(ft) => ft,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot stat entry, skipping");
            return;
        }
    };

    if file_type.is_symlink() {
        debug!(path = %path.display(), "Skipping symlink");
    } else if file_type.is_dir() {
        walk_dir(path, found).await;
    } else if file_type.is_file() && is_recognized(&path) {
        found.push(path);
    }
}
