// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output persistence — writes converted artifacts into an output directory
// under collision-free names.

use std::path::{Path, PathBuf};

use tracing::debug;

use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{OutputFile, RequestId, unique_file_name};

/// Write every output file into `dir`, naming each one with the request-id
/// suffix so concurrent requests can never overwrite each other.
///
/// Output names must be plain file names: anything carrying a path
/// separator is rejected before a single byte is written, so a hostile
/// peer cannot steer an artifact outside `dir`.
///
/// Returns the written paths in output order. The directory is created if
/// missing.
pub async fn persist_outputs(
    dir: &Path,
    id: &RequestId,
    files: &[OutputFile],
) -> Result<Vec<PathBuf>> {
    for file in files {
        if file.name.contains(['/', '\\']) {
            return Err(WandlerError::InvalidParameter(format!(
                "output name {:?} contains a path separator",
                file.name
            )));
        }
    }

    tokio::fs::create_dir_all(dir).await?;

    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(unique_file_name(&file.name, id));
        tokio::fs::write(&path, &file.bytes).await?;
        debug!(path = %path.display(), bytes = file.bytes.len(), "output persisted");
        paths.push(path);
    }
    Ok(paths)
}
