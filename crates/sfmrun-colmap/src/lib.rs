//! COLMAP driver: sparse reconstruction through the `colmap` CLI, PLY export of
//! the first reconstruction, then optional dense fusion and Poisson meshing.

pub mod error;
pub mod mapper;
pub mod model;
pub mod stages;

use std::path::{Path, PathBuf};

use error::ColmapError;
use mapper::MapperProgress;
use sfmrun_core::{
    config::ColmapConfig,
    ply::export_ply,
    process::CommandRunner,
    progress::ProgressSink,
    workspace::{count_images, ensure_dir, remove_file_if_exists, reset_dir},
};
use stages::ColmapLayout;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ColmapReport {
    pub reconstruction: PathBuf,
    pub sparse_points: usize,
    pub sparse_ply: PathBuf,
    pub dense_ply: Option<PathBuf>,
    pub mesh_ply: Option<PathBuf>,
}

pub struct ColmapPipeline<R> {
    runner: R,
    config: ColmapConfig,
    layout: ColmapLayout,
}

impl<R: CommandRunner> ColmapPipeline<R> {
    pub fn new(runner: R, config: ColmapConfig, layout: ColmapLayout) -> Self {
        Self {
            runner,
            config,
            layout,
        }
    }

    /// Runs every stage in order, stopping at the first failure.
    #[instrument(
        skip_all,
        fields(images = %self.layout.images.display(), output = %self.layout.output.display())
    )]
    pub async fn run(&self, progress: &mut dyn ProgressSink) -> Result<ColmapReport, ColmapError> {
        ensure_dir(&self.layout.output)?;
        remove_file_if_exists(&self.layout.database)?;

        self.extract_features().await?;
        self.match_features().await?;
        self.incremental_mapping(progress).await?;
        let (reconstruction, sparse_points) = self.export_sparse()?;

        let mut report = ColmapReport {
            reconstruction,
            sparse_points,
            sparse_ply: self.layout.sparse_ply.clone(),
            dense_ply: None,
            mesh_ply: None,
        };

        if self.config.dense {
            self.dense_reconstruction(&report.reconstruction).await?;
            report.dense_ply = Some(self.layout.dense_ply.clone());

            if self.config.mesh {
                self.poisson_meshing().await?;
                report.mesh_ply = Some(self.layout.mesh_ply.clone());
            }
        } else if self.config.mesh {
            warn!("meshing needs the dense point cloud, skipping");
        }

        info!(report=?report, "colmap pipeline finished");
        Ok(report)
    }

    #[instrument(skip_all)]
    pub async fn extract_features(&self) -> Result<(), ColmapError> {
        info!("extracting features");
        let invocation = stages::feature_extractor(&self.config, &self.layout);
        self.runner.run(&invocation, &mut ()).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn match_features(&self) -> Result<(), ColmapError> {
        info!("matching features");
        let invocation = stages::exhaustive_matcher(&self.config, &self.layout);
        self.runner.run(&invocation, &mut ()).await?;
        Ok(())
    }

    /// Runs the mapper into a fresh `sfm/` directory, reporting registered images.
    #[instrument(skip_all)]
    pub async fn incremental_mapping(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> Result<u64, ColmapError> {
        info!("running incremental mapping");
        reset_dir(&self.layout.sparse)?;
        progress.set_total(count_images(&self.layout.images)?);

        let invocation = stages::mapper(&self.config, &self.layout);
        let mut observer = MapperProgress::new(progress);
        self.runner.run(&invocation, &mut observer).await?;
        let registered = observer.finish();

        info!(registered, "mapping finished");
        Ok(registered)
    }

    /// Exports the first reconstruction's points as `sfm/sparse_model.ply`.
    #[instrument(skip_all)]
    pub fn export_sparse(&self) -> Result<(PathBuf, usize), ColmapError> {
        let reconstruction = model::first_reconstruction(&self.layout.sparse)?
            .ok_or_else(|| ColmapError::NoReconstruction(self.layout.sparse.clone()))?;
        let cloud = model::read_points3d(&reconstruction)?;
        info!(
            reconstruction = %reconstruction.display(),
            points = cloud.len(),
            ply = %self.layout.sparse_ply.display(),
            "saving sparse point cloud"
        );
        export_ply(&cloud, &self.layout.sparse_ply)?;
        Ok((reconstruction, cloud.len()))
    }

    #[instrument(skip_all, fields(reconstruction = %reconstruction.display()))]
    pub async fn dense_reconstruction(&self, reconstruction: &Path) -> Result<(), ColmapError> {
        info!("running dense reconstruction");
        reset_dir(&self.layout.dense)?;

        let invocations = [
            stages::image_undistorter(&self.config, &self.layout, reconstruction),
            stages::patch_match_stereo(&self.config, &self.layout),
            stages::stereo_fusion(&self.config, &self.layout),
        ];
        for invocation in &invocations {
            self.runner.run(invocation, &mut ()).await?;
        }

        info!(ply = %self.layout.dense_ply.display(), "dense reconstruction saved");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn poisson_meshing(&self) -> Result<(), ColmapError> {
        info!("meshing fused point cloud");
        let invocation = stages::poisson_mesher(&self.config, &self.layout);
        self.runner.run(&invocation, &mut ()).await?;
        Ok(())
    }
}
