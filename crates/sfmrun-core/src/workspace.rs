//! Output directory bookkeeping for the pipelines.

use std::{fs, io, path::Path};

use tracing::debug;

use crate::error::WorkspaceError;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

fn at(path: &Path) -> impl FnOnce(io::Error) -> WorkspaceError + '_ {
    move |source| WorkspaceError {
        path: path.to_path_buf(),
        source,
    }
}

pub fn ensure_dir(path: &Path) -> Result<(), WorkspaceError> {
    fs::create_dir_all(path).map_err(at(path))
}

/// Removes `path` with everything inside it, then recreates it empty.
pub fn reset_dir(path: &Path) -> Result<(), WorkspaceError> {
    if path.exists() {
        debug!(path=%path.display(), "clearing directory");
        fs::remove_dir_all(path).map_err(at(path))?;
    }
    fs::create_dir_all(path).map_err(at(path))
}

pub fn remove_file_if_exists(path: &Path) -> Result<(), WorkspaceError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path=%path.display(), "removed stale file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(at(path)(e)),
    }
}

/// Number of image files directly inside `dir`.
pub fn count_images(dir: &Path) -> Result<u64, WorkspaceError> {
    let mut count = 0;
    for entry in fs::read_dir(dir).map_err(at(dir))? {
        let path = entry.map_err(at(dir))?.path();
        let is_image = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    IMAGE_EXTENSIONS
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(ext))
                });
        if is_image {
            count += 1;
        }
    }
    Ok(count)
}
