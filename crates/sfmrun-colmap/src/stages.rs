//! Command lines for the COLMAP stages the pipeline runs.

use std::path::{Path, PathBuf};

use sfmrun_core::{config::ColmapConfig, process::Invocation};

/// Where every COLMAP stage reads and writes, rooted at the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColmapLayout {
    pub images: PathBuf,
    pub output: PathBuf,
    pub database: PathBuf,
    pub sparse: PathBuf,
    pub sparse_ply: PathBuf,
    pub dense: PathBuf,
    pub dense_ply: PathBuf,
    pub mesh_ply: PathBuf,
}

impl ColmapLayout {
    pub fn new(images: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let sparse = output.join("sfm");
        let dense = output.join("dense");
        Self {
            images: images.into(),
            database: output.join("database.db"),
            sparse_ply: sparse.join("sparse_model.ply"),
            dense_ply: dense.join("fused.ply"),
            mesh_ply: dense.join("meshed-poisson.ply"),
            sparse,
            dense,
            output,
        }
    }
}

fn colmap(config: &ColmapConfig, command: &str) -> Invocation {
    Invocation::new(&config.binary).arg(command)
}

pub fn feature_extractor(config: &ColmapConfig, layout: &ColmapLayout) -> Invocation {
    let invocation = colmap(config, "feature_extractor")
        .opt("--database_path", &layout.database)
        .opt("--image_path", &layout.images);
    match &config.camera_model {
        Some(model) => invocation.opt("--ImageReader.camera_model", model),
        None => invocation,
    }
}

pub fn exhaustive_matcher(config: &ColmapConfig, layout: &ColmapLayout) -> Invocation {
    colmap(config, "exhaustive_matcher").opt("--database_path", &layout.database)
}

pub fn mapper(config: &ColmapConfig, layout: &ColmapLayout) -> Invocation {
    colmap(config, "mapper")
        .opt("--database_path", &layout.database)
        .opt("--image_path", &layout.images)
        .opt("--output_path", &layout.sparse)
}

pub fn image_undistorter(
    config: &ColmapConfig,
    layout: &ColmapLayout,
    reconstruction: &Path,
) -> Invocation {
    colmap(config, "image_undistorter")
        .opt("--image_path", &layout.images)
        .opt("--input_path", reconstruction)
        .opt("--output_path", &layout.dense)
        .opt("--output_type", "COLMAP")
}

pub fn patch_match_stereo(config: &ColmapConfig, layout: &ColmapLayout) -> Invocation {
    colmap(config, "patch_match_stereo")
        .opt("--workspace_path", &layout.dense)
        .opt("--workspace_format", "COLMAP")
        .opt(
            "--PatchMatchStereo.geom_consistency",
            if config.geom_consistency { "true" } else { "false" },
        )
}

pub fn stereo_fusion(config: &ColmapConfig, layout: &ColmapLayout) -> Invocation {
    // Geometric depth maps only exist when patch match ran with geom_consistency
    let input_type = if config.geom_consistency {
        "geometric"
    } else {
        "photometric"
    };
    colmap(config, "stereo_fusion")
        .opt("--workspace_path", &layout.dense)
        .opt("--workspace_format", "COLMAP")
        .opt("--input_type", input_type)
        .opt("--output_path", &layout.dense_ply)
}

pub fn poisson_mesher(config: &ColmapConfig, layout: &ColmapLayout) -> Invocation {
    colmap(config, "poisson_mesher")
        .opt("--input_path", &layout.dense_ply)
        .opt("--output_path", &layout.mesh_ply)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use sfmrun_core::config::ColmapConfig;

    use super::{
        exhaustive_matcher, feature_extractor, image_undistorter, mapper, patch_match_stereo,
        poisson_mesher, stereo_fusion, ColmapLayout,
    };

    fn layout() -> ColmapLayout {
        ColmapLayout::new("images", "output")
    }

    #[test]
    fn layout_matches_output_tree() {
        let layout = layout();
        assert_eq!(layout.database, PathBuf::from("output/database.db"));
        assert_eq!(layout.sparse_ply, PathBuf::from("output/sfm/sparse_model.ply"));
        assert_eq!(layout.dense_ply, PathBuf::from("output/dense/fused.ply"));
        assert_eq!(layout.mesh_ply, PathBuf::from("output/dense/meshed-poisson.ply"));
    }

    #[test]
    fn feature_extractor_passes_camera_model_when_set() {
        let mut config = ColmapConfig::default();
        assert_eq!(
            feature_extractor(&config, &layout()).args_lossy(),
            vec![
                "feature_extractor",
                "--database_path",
                "output/database.db",
                "--image_path",
                "images",
            ]
        );

        config.camera_model = Some("OPENCV".to_owned());
        let args = feature_extractor(&config, &layout()).args_lossy();
        assert_eq!(&args[5..], ["--ImageReader.camera_model", "OPENCV"]);
    }

    #[test]
    fn sparse_stages() {
        let config = ColmapConfig {
            binary: PathBuf::from("/opt/colmap/bin/colmap"),
            ..Default::default()
        };

        let matcher = exhaustive_matcher(&config, &layout());
        assert_eq!(matcher.program(), Path::new("/opt/colmap/bin/colmap"));
        assert_eq!(
            matcher.args_lossy(),
            vec!["exhaustive_matcher", "--database_path", "output/database.db"]
        );

        assert_eq!(
            mapper(&config, &layout()).args_lossy(),
            vec![
                "mapper",
                "--database_path",
                "output/database.db",
                "--image_path",
                "images",
                "--output_path",
                "output/sfm",
            ]
        );
    }

    #[test]
    fn dense_stages_follow_geom_consistency() {
        let mut config = ColmapConfig::default();
        let layout = layout();

        assert_eq!(
            image_undistorter(&config, &layout, Path::new("output/sfm/0")).args_lossy(),
            vec![
                "image_undistorter",
                "--image_path",
                "images",
                "--input_path",
                "output/sfm/0",
                "--output_path",
                "output/dense",
                "--output_type",
                "COLMAP",
            ]
        );
        assert_eq!(
            patch_match_stereo(&config, &layout).args_lossy().last().unwrap(),
            "true"
        );
        assert_eq!(
            stereo_fusion(&config, &layout).args_lossy(),
            vec![
                "stereo_fusion",
                "--workspace_path",
                "output/dense",
                "--workspace_format",
                "COLMAP",
                "--input_type",
                "geometric",
                "--output_path",
                "output/dense/fused.ply",
            ]
        );

        config.geom_consistency = false;
        assert_eq!(
            patch_match_stereo(&config, &layout).args_lossy().last().unwrap(),
            "false"
        );
        assert!(stereo_fusion(&config, &layout)
            .args_lossy()
            .contains(&"photometric".to_owned()));
    }

    #[test]
    fn mesher_reads_fused_cloud() {
        assert_eq!(
            poisson_mesher(&ColmapConfig::default(), &layout()).args_lossy(),
            vec![
                "poisson_mesher",
                "--input_path",
                "output/dense/fused.ply",
                "--output_path",
                "output/dense/meshed-poisson.ply",
            ]
        );
    }
}
