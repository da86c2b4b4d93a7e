use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncRead;
use tracing::{debug, instrument};

use crate::error::ExtractionError;

use super::parser::ZipStreamReader;

/// Counters for one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes_written: u64,
}

/// ZIP stream extractor
///
/// Writes every entry of an archive below a destination directory and
/// refuses entries that would land anywhere else. The first failing entry
/// aborts the run; files already written are left in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the archive read from `reader` into `destination`.
    ///
    /// The destination is created if missing and canonicalized once; every
    /// entry path is checked against it before anything is written.
    #[instrument(skip_all, fields(destination = %destination.as_ref().display()))]
    pub async fn extract<R>(
        &self,
        reader: R,
        destination: impl AsRef<Path>,
    ) -> Result<ExtractionSummary, ExtractionError>
    where
        R: AsyncRead + Unpin,
    {
        let destination = destination.as_ref();
        fs::create_dir_all(destination).await?;
        let root = fs::canonicalize(destination).await?;

        let mut archive = ZipStreamReader::new(reader);
        let mut summary = ExtractionSummary::default();

        while let Some(entry) = archive.next_entry().await? {
            let target = resolve_entry_path(&root, &entry.name).await?;
            debug!(
                name = %entry.name,
                is_dir = entry.is_directory,
                declared_size = ?entry.declared_size,
                path = %target.display(),
                "extracting entry"
            );

            if entry.is_directory {
                fs::create_dir_all(&target).await?;
                summary.directories += 1;
                continue;
            }

            // Entries are not guaranteed to come after their parent directory
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }

            let mut file = fs::File::create(&target).await?;
            summary.bytes_written += archive.copy_entry(&mut file).await?;
            summary.files += 1;
        }

        Ok(summary)
    }
}

/// Map an untrusted entry name onto a path below `root`.
///
/// `root` must already be canonical. The name is always treated as relative:
/// a leading `/` or drive prefix is dropped, so `/a/b.txt` lands at
/// `root/a/b.txt`. The joined path is normalized lexically, then its longest
/// existing ancestor is canonicalized so that symlinks already on disk are
/// followed. Fails with [`ExtractionError::PathTraversal`] unless the result
/// is `root` itself or lies below it.
pub async fn resolve_entry_path(root: &Path, name: &str) -> Result<PathBuf, ExtractionError> {
    let candidate = normalize(&root.join(relative(name)));
    let resolved = canonicalize_existing_prefix(&candidate).await?;

    // Path::starts_with compares whole components, so `dest-evil` is not
    // mistaken for a child of `dest`
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(ExtractionError::PathTraversal(name.to_string()))
    }
}

/// Strip root and prefix components so joining never replaces the root.
fn relative(name: &str) -> PathBuf {
    Path::new(name)
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect()
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root leaves the root in place
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest prefix of `path` that exists and append the rest.
async fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();

    loop {
        match fs::canonicalize(&existing).await {
            Ok(canonical) => {
                let mut resolved = canonical;
                for part in rest.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.file_name(), existing.parent()) {
                    (Some(name), Some(parent)) => {
                        rest.push(name.to_os_string());
                        existing = parent.to_path_buf();
                    }
                    _ => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}
