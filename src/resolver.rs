//! Resolution of request targets against the document root.

use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use memmap2::Mmap;
use thiserror::Error;
use tracing::{debug, warn};

/// Capacity of the resolved path, document root included. Longer paths are
/// truncated, which at worst turns them into a miss.
pub const PATH_CAPACITY: usize = 200;

/// Why a target could not be served.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolved path does not name an existing file.
    #[error("no such file")]
    NotFound,
    /// The file exists but lacks the world-read permission bit.
    #[error("file is not world-readable")]
    Forbidden,
    /// The resolved path names a directory.
    #[error("target is a directory")]
    NotFile,
    /// The file vanished or could not be mapped after a successful stat.
    #[error("could not map file: {0}")]
    Map(#[from] io::Error),
}

/// A successfully resolved target.
#[derive(Debug)]
pub enum FileBody {
    /// Read-only private mapping of a non-empty file. Dropping it releases
    /// the region; the backing descriptor is already closed.
    Mapped(Mmap),
    /// The file exists and is servable but holds no bytes.
    Empty,
}

/// Concatenates the document root and the target into a fixed-capacity path,
/// checks that it names a world-readable regular file, and maps it.
pub fn resolve(doc_root: &Path, target: &[u8]) -> Result<FileBody, ResolveError> {
    let mut path = [0u8; PATH_CAPACITY];
    let root = doc_root.as_os_str().as_bytes();
    let mut len = root.len().min(PATH_CAPACITY - 1);
    path[..len].copy_from_slice(&root[..len]);
    let take = target.len().min(PATH_CAPACITY - 1 - len);
    path[len..len + take].copy_from_slice(&target[..take]);
    len += take;
    let path = Path::new(OsStr::from_bytes(&path[..len]));

    let meta = match path.metadata() {
        Ok(meta) => meta,
        Err(err) => {
            debug!(path = %path.display(), %err, "stat failed");
            return Err(ResolveError::NotFound);
        }
    };
    if meta.mode() & 0o004 == 0 {
        return Err(ResolveError::Forbidden);
    }
    if meta.is_dir() {
        return Err(ResolveError::NotFile);
    }
    if meta.len() == 0 {
        return Ok(FileBody::Empty);
    }

    let file = File::open(path).map_err(|err| {
        warn!(path = %path.display(), %err, "open failed after stat");
        ResolveError::Map(err)
    })?;
    // SAFETY: the mapping is private and read-only; concurrent truncation of
    // a served file is outside the server's contract.
    let map = unsafe { Mmap::map(&file)? };
    Ok(FileBody::Mapped(map))
}
