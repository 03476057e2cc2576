//! Zip assembly of a staged mod tree.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use super::PackagingError;

/// Fail with [`PackagingError::OutputExists`] if `path` is taken.
pub fn ensure_absent(path: &Path) -> Result<(), PackagingError> {
    if path.exists() {
        return Err(PackagingError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

/// Write every file under `source` into a new zip at `dest`.
///
/// Entry names are `source`-relative with `/` separators. `dest` is opened
/// with `create_new`, so an existing file is never overwritten; a partially
/// written archive is removed on failure. Returns the number of files written.
pub fn zip_dir(source: &Path, dest: &Path) -> Result<usize, PackagingError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => PackagingError::OutputExists(dest.to_path_buf()),
            _ => PackagingError::io(dest, e),
        })?;

    match write_entries(file, source) {
        Ok(count) => Ok(count),
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(dest) {
                tracing::warn!(
                    archive = %dest.display(),
                    error = %cleanup,
                    "failed to remove partial archive"
                );
            }
            Err(e)
        }
    }
}

fn write_entries(file: fs::File, source: &Path) -> Result<usize, PackagingError> {
    let mut zip = zip::ZipWriter::new(file);
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| PackagingError::walk(source, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| PackagingError::SourceMissing(entry.path().to_path_buf()))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let mut input =
            fs::File::open(entry.path()).map_err(|e| PackagingError::io(entry.path(), e))?;
        zip.start_file(name.as_str(), opts)?;
        io::copy(&mut input, &mut zip).map_err(|e| PackagingError::io(entry.path(), e))?;
        tracing::trace!(entry = %name, "zipped");
        count += 1;
    }

    zip.finish()?;
    Ok(count)
}

/// SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, PackagingError> {
    let mut file = fs::File::open(path).map_err(|e| PackagingError::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| PackagingError::io(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}
