use std::path::{Path, PathBuf};

use sfmrun_core::{
    config::{EngineSelection, OpenMvgConfig},
    process::Invocation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Incremental,
    Global,
}

impl Engine {
    pub fn selected(selection: EngineSelection) -> Vec<Engine> {
        match selection {
            EngineSelection::Incremental => vec![Engine::Incremental],
            EngineSelection::Global => vec![Engine::Global],
            EngineSelection::Both => vec![Engine::Incremental, Engine::Global],
        }
    }

    pub fn sfm_engine(&self) -> &'static str {
        match self {
            Engine::Incremental => "INCREMENTAL",
            Engine::Global => "GLOBAL",
        }
    }

    /// Geometric model used to filter putative matches: fundamental or essential.
    pub fn geometric_model(&self) -> &'static str {
        match self {
            Engine::Incremental => "f",
            Engine::Global => "e",
        }
    }

    fn reconstruction_dir_name(&self) -> &'static str {
        match self {
            Engine::Incremental => "reconstruction_sequential",
            Engine::Global => "reconstruction_global",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMvgLayout {
    pub images: PathBuf,
    pub output: PathBuf,
    pub matches: PathBuf,
    pub sfm_data: PathBuf,
    pub putative_matches: PathBuf,
}

impl OpenMvgLayout {
    pub fn new(images: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let matches = output.join("matches");
        Self {
            images: images.into(),
            sfm_data: matches.join("sfm_data.json"),
            putative_matches: matches.join("matches.putative.bin"),
            matches,
            output,
        }
    }

    pub fn filtered_matches(&self, engine: Engine) -> PathBuf {
        self.matches
            .join(format!("matches.{}.bin", engine.geometric_model()))
    }

    pub fn reconstruction(&self, engine: Engine) -> PathBuf {
        self.output.join(engine.reconstruction_dir_name())
    }
}

fn binary(config: &OpenMvgConfig, name: &str) -> Invocation {
    match &config.bin_dir {
        Some(dir) => Invocation::new(dir.join(name)),
        None => Invocation::new(name),
    }
}

pub fn image_listing(config: &OpenMvgConfig, layout: &OpenMvgLayout) -> Invocation {
    let invocation = binary(config, "openMVG_main_SfMInit_ImageListing")
        .opt("-i", &layout.images)
        .opt("-o", &layout.matches);
    let invocation = match &config.sensor_database {
        Some(database) => invocation.opt("-d", database),
        None => invocation,
    };
    invocation.opt("-c", config.camera_model.to_string())
}

pub fn compute_features(config: &OpenMvgConfig, layout: &OpenMvgLayout) -> Invocation {
    binary(config, "openMVG_main_ComputeFeatures")
        .opt("-i", &layout.sfm_data)
        .opt("-o", &layout.matches)
        .opt("-m", &config.describer)
        .opt("-f", "1")
}

pub fn compute_matches(config: &OpenMvgConfig, layout: &OpenMvgLayout) -> Invocation {
    binary(config, "openMVG_main_ComputeMatches")
        .opt("-i", &layout.sfm_data)
        .opt("-o", &layout.putative_matches)
        .opt("-f", "1")
        .opt("-n", &config.nearest_matching)
}

pub fn geometric_filter(
    config: &OpenMvgConfig,
    layout: &OpenMvgLayout,
    engine: Engine,
) -> Invocation {
    binary(config, "openMVG_main_GeometricFilter")
        .opt("-i", &layout.sfm_data)
        .opt("-m", &layout.putative_matches)
        .opt("-g", engine.geometric_model())
        .opt("-o", layout.filtered_matches(engine))
}

pub fn reconstruct(config: &OpenMvgConfig, layout: &OpenMvgLayout, engine: Engine) -> Invocation {
    let invocation = binary(config, "openMVG_main_SfM")
        .opt("--sfm_engine", engine.sfm_engine())
        .opt("--input_file", &layout.sfm_data);
    // The incremental engine finds matches.f.bin in the match directory on its own
    let invocation = match engine {
        Engine::Incremental => invocation.opt("--match_dir", &layout.matches),
        Engine::Global => invocation.opt("--match_file", layout.filtered_matches(engine)),
    };
    invocation.opt("--output_dir", layout.reconstruction(engine))
}

fn sfm_data_bin(reconstruction: &Path) -> PathBuf {
    reconstruction.join("sfm_data.bin")
}

pub fn colorize(config: &OpenMvgConfig, reconstruction: &Path) -> Invocation {
    binary(config, "openMVG_main_ComputeSfM_DataColor")
        .opt("-i", sfm_data_bin(reconstruction))
        .opt("-o", reconstruction.join("colorized.ply"))
}

pub fn robust_triangulation(
    config: &OpenMvgConfig,
    layout: &OpenMvgLayout,
    reconstruction: &Path,
) -> Invocation {
    binary(config, "openMVG_main_ComputeStructureFromKnownPoses")
        .opt("-i", sfm_data_bin(reconstruction))
        .opt("-m", &layout.matches)
        .opt("-o", reconstruction.join("robust.ply"))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use sfmrun_core::config::{EngineSelection, OpenMvgConfig};

    use super::{
        compute_features, compute_matches, geometric_filter, image_listing, reconstruct,
        robust_triangulation, Engine, OpenMvgLayout,
    };

    fn layout() -> OpenMvgLayout {
        OpenMvgLayout::new("images", "output")
    }

    #[test]
    fn binaries_resolve_against_bin_dir() {
        let mut config = OpenMvgConfig::default();
        assert_eq!(
            compute_features(&config, &layout()).program(),
            Path::new("openMVG_main_ComputeFeatures")
        );

        config.bin_dir = Some(PathBuf::from("/opt/openmvg/bin"));
        assert_eq!(
            compute_features(&config, &layout()).program(),
            Path::new("/opt/openmvg/bin/openMVG_main_ComputeFeatures")
        );
    }

    #[test]
    fn image_listing_includes_sensor_database_when_known() {
        let mut config = OpenMvgConfig::default();
        assert_eq!(
            image_listing(&config, &layout()).args_lossy(),
            vec!["-i", "images", "-o", "output/matches", "-c", "3"]
        );

        config.sensor_database = Some(PathBuf::from("db/sensor_width_camera_database.txt"));
        assert_eq!(
            image_listing(&config, &layout()).args_lossy(),
            vec![
                "-i",
                "images",
                "-o",
                "output/matches",
                "-d",
                "db/sensor_width_camera_database.txt",
                "-c",
                "3",
            ]
        );
    }

    #[test]
    fn matching_stages() {
        let config = OpenMvgConfig::default();
        assert_eq!(
            compute_features(&config, &layout()).args_lossy(),
            vec![
                "-i",
                "output/matches/sfm_data.json",
                "-o",
                "output/matches",
                "-m",
                "SIFT",
                "-f",
                "1"
            ]
        );
        assert_eq!(
            compute_matches(&config, &layout()).args_lossy(),
            vec![
                "-i",
                "output/matches/sfm_data.json",
                "-o",
                "output/matches/matches.putative.bin",
                "-f",
                "1",
                "-n",
                "ANNL2",
            ]
        );
        assert_eq!(
            geometric_filter(&config, &layout(), Engine::Global).args_lossy(),
            vec![
                "-i",
                "output/matches/sfm_data.json",
                "-m",
                "output/matches/matches.putative.bin",
                "-g",
                "e",
                "-o",
                "output/matches/matches.e.bin",
            ]
        );
    }

    #[test]
    fn engines_read_matches_differently() {
        let config = OpenMvgConfig::default();
        assert_eq!(
            reconstruct(&config, &layout(), Engine::Incremental).args_lossy(),
            vec![
                "--sfm_engine",
                "INCREMENTAL",
                "--input_file",
                "output/matches/sfm_data.json",
                "--match_dir",
                "output/matches",
                "--output_dir",
                "output/reconstruction_sequential",
            ]
        );
        assert_eq!(
            reconstruct(&config, &layout(), Engine::Global).args_lossy(),
            vec![
                "--sfm_engine",
                "GLOBAL",
                "--input_file",
                "output/matches/sfm_data.json",
                "--match_file",
                "output/matches/matches.e.bin",
                "--output_dir",
                "output/reconstruction_global",
            ]
        );
    }

    #[test]
    fn robust_triangulation_writes_next_to_sfm_data() {
        let layout = layout();
        let reconstruction = layout.reconstruction(Engine::Global);
        assert_eq!(
            robust_triangulation(&OpenMvgConfig::default(), &layout, &reconstruction).args_lossy(),
            vec![
                "-i",
                "output/reconstruction_global/sfm_data.bin",
                "-m",
                "output/matches",
                "-o",
                "output/reconstruction_global/robust.ply",
            ]
        );
    }

    #[test]
    fn both_runs_incremental_first() {
        assert_eq!(
            Engine::selected(EngineSelection::Both),
            vec![Engine::Incremental, Engine::Global]
        );
        assert_eq!(Engine::selected(EngineSelection::Global), vec![Engine::Global]);
    }
}
