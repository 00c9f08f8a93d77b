//! Reads the 3D points of a COLMAP sparse model (`points3D.bin` or `points3D.txt`).

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    str::FromStr,
};

use sfmrun_core::{
    point::{Color, Point3D},
    pointcloud::PointCloud,
};
use tracing::{debug, instrument};

use crate::error::ModelError;

pub const POINTS_BIN: &str = "points3D.bin";
pub const POINTS_TXT: &str = "points3D.txt";

/// Reads the model in `dir`, preferring the binary file when both exist.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn read_points3d(dir: &Path) -> Result<PointCloud, ModelError> {
    let binary = dir.join(POINTS_BIN);
    if binary.is_file() {
        debug!("reading binary model");
        return parse_points3d_binary(BufReader::new(File::open(binary)?));
    }

    let text = dir.join(POINTS_TXT);
    if text.is_file() {
        debug!("reading text model");
        return parse_points3d_text(BufReader::new(File::open(text)?));
    }

    Err(ModelError::Missing(dir.to_path_buf()))
}

pub fn has_points3d(dir: &Path) -> bool {
    dir.join(POINTS_BIN).is_file() || dir.join(POINTS_TXT).is_file()
}

/// The lowest numbered reconstruction under the mapper output directory.
pub fn first_reconstruction(sparse_dir: &Path) -> Result<Option<PathBuf>, ModelError> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(sparse_dir)? {
        let path = entry?.path();
        let index = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse::<u32>().ok());
        if let Some(index) = index {
            if path.is_dir() && has_points3d(&path) {
                candidates.push((index, path));
            }
        }
    }
    Ok(candidates
        .into_iter()
        .min_by_key(|(index, _)| *index)
        .map(|(_, path)| path))
}

fn field<T: FromStr>(parts: &[&str], index: usize, line: usize) -> Result<T, ModelError> {
    parts[index].parse().map_err(|_| ModelError::Malformed {
        line,
        reason: format!("invalid value '{}' in column {}", parts[index], index + 1),
    })
}

/// `POINT3D_ID X Y Z R G B ERROR TRACK[] as (IMAGE_ID, POINT2D_IDX)`
pub fn parse_points3d_text<R: BufRead>(reader: R) -> Result<PointCloud, ModelError> {
    let mut points: Vec<(i64, Point3D)> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() < 8 {
            return Err(ModelError::Malformed {
                line: number,
                reason: format!("expected at least 8 columns, found {}", parts.len()),
            });
        }
        if (parts.len() - 8) % 2 != 0 {
            return Err(ModelError::Malformed {
                line: number,
                reason: "track has an odd number of entries".to_owned(),
            });
        }

        let id: i64 = field(&parts, 0, number)?;
        let position = [
            field(&parts, 1, number)?,
            field(&parts, 2, number)?,
            field(&parts, 3, number)?,
        ];
        let color = Color::new(
            field(&parts, 4, number)?,
            field(&parts, 5, number)?,
            field(&parts, 6, number)?,
        );
        let _error: f64 = field(&parts, 7, number)?;
        for column in 8..parts.len() {
            let _: i64 = field(&parts, column, number)?;
        }

        points.push((id, Point3D::new(position, color)));
    }

    Ok(sorted(points))
}

fn read_array<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N], ModelError> {
    let mut buffer = [0u8; N];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64, ModelError> {
    Ok(u64::from_le_bytes(read_array(reader)?))
}

fn read_i64<R: Read>(reader: &mut R) -> Result<i64, ModelError> {
    Ok(i64::from_le_bytes(read_array(reader)?))
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64, ModelError> {
    Ok(f64::from_le_bytes(read_array(reader)?))
}

/// Little-endian binary layout written by `colmap mapper`.
pub fn parse_points3d_binary<R: Read>(mut reader: R) -> Result<PointCloud, ModelError> {
    let count = read_u64(&mut reader)?;
    // The count is untrusted, don't let it drive the allocation
    let mut points = Vec::with_capacity(count.min(1 << 20) as usize);

    for _ in 0..count {
        let id = read_i64(&mut reader)?;
        let position = [
            read_f64(&mut reader)?,
            read_f64(&mut reader)?,
            read_f64(&mut reader)?,
        ];
        let color = Color::from(read_array::<3, _>(&mut reader)?);
        let _error = read_f64(&mut reader)?;

        // (image_id: i32, point2d_idx: i32) pairs
        let track_length = read_u64(&mut reader)?;
        for _ in 0..track_length {
            read_array::<8, _>(&mut reader)?;
        }

        points.push((id, Point3D::new(position, color)));
    }

    Ok(sorted(points))
}

fn sorted(mut points: Vec<(i64, Point3D)>) -> PointCloud {
    points.sort_by_key(|(id, _)| *id);
    points.into_iter().map(|(_, point)| point).collect()
}
