//! ASCII PLY export for colored point clouds.
//!
//! The output is vertex-only with `float` positions and `uchar` colors:
//!
//! ```text
//! ply
//! format ascii 1.0
//! element vertex <N>
//! property float x
//! ...
//! end_header
//! <x> <y> <z> <r> <g> <b>
//! ```
//!
//! Writes are not atomic. A failure mid-write leaves a truncated file behind,
//! so callers must not treat the existence of the file as success.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use tracing::{debug, instrument};

use crate::{error::ExportError, pointcloud::PointCloud};

const VERTEX_PROPERTIES: [&str; 6] = [
    "property float x",
    "property float y",
    "property float z",
    "property uchar red",
    "property uchar green",
    "property uchar blue",
];

/// Writes `cloud` as an ASCII PLY document to `writer`.
pub fn write_ply<W: Write>(writer: &mut W, cloud: &PointCloud) -> io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for property in VERTEX_PROPERTIES {
        writeln!(writer, "{}", property)?;
    }
    writeln!(writer, "end_header")?;

    for point in cloud {
        let [x, y, z] = point.position;
        let color = point.color;
        // Debug formatting keeps the shortest round-trip form, including "1.0"
        writeln!(
            writer,
            "{:?} {:?} {:?} {} {} {}",
            x, y, z, color.red, color.green, color.blue
        )?;
    }

    Ok(())
}

/// Creates (or truncates) the file at `path` and writes `cloud` into it.
///
/// The parent directory must already exist.
#[instrument(skip_all, fields(path = %path.display(), points = cloud.len()))]
pub fn export_ply(cloud: &PointCloud, path: &Path) -> Result<(), ExportError> {
    let write_failure = |source| ExportError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_failure)?;
    let mut writer = BufWriter::new(file);
    write_ply(&mut writer, cloud).map_err(write_failure)?;
    writer.flush().map_err(write_failure)?;

    debug!("wrote ply");
    Ok(())
}
