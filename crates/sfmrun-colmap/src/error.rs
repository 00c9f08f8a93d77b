use std::{io, path::PathBuf};

use sfmrun_core::error::{ExportError, PipelineError, ProcessError, WorkspaceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unable to read sparse model: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed points3D line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("No points3D file in {}", .0.display())]
    Missing(PathBuf),
}

#[derive(Debug, Error)]
pub enum ColmapError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Mapper produced no reconstruction in {}", .0.display())]
    NoReconstruction(PathBuf),
}

impl From<ProcessError> for ColmapError {
    fn from(value: ProcessError) -> Self {
        Self::Pipeline(value.into())
    }
}

impl From<ExportError> for ColmapError {
    fn from(value: ExportError) -> Self {
        Self::Pipeline(value.into())
    }
}

impl From<WorkspaceError> for ColmapError {
    fn from(value: WorkspaceError) -> Self {
        Self::Pipeline(value.into())
    }
}
