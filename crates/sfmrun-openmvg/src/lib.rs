//! OpenMVG driver: image listing, features and matches shared across engines,
//! then one reconstruction per selected SfM engine.

pub mod stages;

use std::path::PathBuf;

use sfmrun_core::{
    config::OpenMvgConfig,
    error::PipelineError,
    process::{CommandRunner, Invocation},
    progress::ProgressSink,
    workspace::ensure_dir,
};
use stages::{Engine, OpenMvgLayout};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub engine: Engine,
    pub reconstruction: PathBuf,
    pub colorized_ply: PathBuf,
    pub robust_ply: PathBuf,
}

pub struct OpenMvgPipeline<R> {
    runner: R,
    config: OpenMvgConfig,
    layout: OpenMvgLayout,
}

impl<R: CommandRunner> OpenMvgPipeline<R> {
    pub fn new(runner: R, config: OpenMvgConfig, layout: OpenMvgLayout) -> Self {
        Self {
            runner,
            config,
            layout,
        }
    }

    pub fn engines(&self) -> Vec<Engine> {
        Engine::selected(self.config.engine)
    }

    /// Every invocation in execution order.
    pub fn plan(&self) -> Vec<Invocation> {
        let mut plan = vec![
            stages::image_listing(&self.config, &self.layout),
            stages::compute_features(&self.config, &self.layout),
            stages::compute_matches(&self.config, &self.layout),
        ];
        for engine in self.engines() {
            let reconstruction = self.layout.reconstruction(engine);
            plan.push(stages::geometric_filter(&self.config, &self.layout, engine));
            plan.push(stages::reconstruct(&self.config, &self.layout, engine));
            plan.push(stages::colorize(&self.config, &reconstruction));
            plan.push(stages::robust_triangulation(
                &self.config,
                &self.layout,
                &reconstruction,
            ));
        }
        plan
    }

    /// Runs the plan, one progress unit per completed stage.
    #[instrument(
        skip_all,
        fields(images = %self.layout.images.display(), output = %self.layout.output.display())
    )]
    pub async fn run(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<EngineReport>, PipelineError> {
        info!(
            input = %self.layout.images.display(),
            output = %self.layout.output.display(),
            "using directories"
        );
        ensure_dir(&self.layout.output)?;
        ensure_dir(&self.layout.matches)?;

        let plan = self.plan();
        progress.set_total(plan.len() as u64);
        for (step, invocation) in plan.iter().enumerate() {
            info!(step = step + 1, of = plan.len(), stage = %invocation.name(), "running stage");
            self.runner.run(invocation, &mut ()).await?;
            progress.on_progress(1);
        }

        let reports: Vec<EngineReport> = self
            .engines()
            .into_iter()
            .map(|engine| {
                let reconstruction = self.layout.reconstruction(engine);
                EngineReport {
                    engine,
                    colorized_ply: reconstruction.join("colorized.ply"),
                    robust_ply: reconstruction.join("robust.ply"),
                    reconstruction,
                }
            })
            .collect();
        info!(reports=?reports, "openMVG pipeline finished");
        Ok(reports)
    }
}
