mod args;

use std::error::Error;

use args::{Args, Command};
use clap::Parser;
use sfmrun_colmap::{model::read_points3d, stages::ColmapLayout, ColmapPipeline};
use sfmrun_core::{
    config::Configuration, logging::enable_tracing, ply::export_ply, process::TokioRunner,
    progress::SpanProgress,
};
use sfmrun_openmvg::{stages::OpenMvgLayout, OpenMvgPipeline};
use tracing::{info, info_span, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if !args.quiet {
        enable_tracing(args.debug, args.tool_output);
    }

    let mut config = Configuration::load(args.config.as_deref())?;

    match args.command {
        Command::Colmap {
            images,
            output,
            no_dense,
            mesh,
            camera_model,
        } => {
            if no_dense {
                config.colmap.dense = false;
            }
            if mesh {
                config.colmap.mesh = true;
            }
            if camera_model.is_some() {
                config.colmap.camera_model = camera_model;
            }

            let layout = ColmapLayout::new(images, output);
            let pipeline = ColmapPipeline::new(TokioRunner, config.colmap, layout);
            let span = info_span!("images_registered");
            let mut progress = SpanProgress::new(span.clone());
            let report = pipeline.run(&mut progress).instrument(span).await?;

            info!(
                ply = %report.sparse_ply.display(),
                points = report.sparse_points,
                "sparse reconstruction saved"
            );
            if let Some(dense) = &report.dense_ply {
                info!(ply = %dense.display(), "dense reconstruction saved");
            }
            if let Some(mesh) = &report.mesh_ply {
                info!(ply = %mesh.display(), "mesh saved");
            }
        }
        Command::Openmvg {
            images,
            output,
            engine,
        } => {
            if let Some(engine) = engine {
                config.openmvg.engine = engine.into();
            }

            let layout = OpenMvgLayout::new(images, output);
            let pipeline = OpenMvgPipeline::new(TokioRunner, config.openmvg, layout);
            let span = info_span!("openmvg_stages");
            let mut progress = SpanProgress::new(span.clone());
            let reports = pipeline.run(&mut progress).instrument(span).await?;

            for report in reports {
                info!(
                    engine = ?report.engine,
                    colorized = %report.colorized_ply.display(),
                    robust = %report.robust_ply.display(),
                    "reconstruction saved"
                );
            }
        }
        Command::Export { model, output } => {
            let cloud = read_points3d(&model)?;
            export_ply(&cloud, &output)?;
            info!(ply = %output.display(), points = cloud.len(), "point cloud exported");
        }
    }

    Ok(())
}
