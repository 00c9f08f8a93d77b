use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sfmrun_core::config::EngineSelection;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Drive COLMAP and OpenMVG reconstructions", long_about = None)]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long, default_value_t = false, global = true)]
    pub debug: bool,

    /// Disable tracing output and progress bars
    #[arg(short, long, default_value_t = false, global = true)]
    pub quiet: bool,

    /// Log every output line of the external tools
    #[arg(short, long, default_value_t = false, global = true)]
    pub tool_output: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sparse reconstruction with COLMAP, followed by dense fusion and meshing
    Colmap {
        /// Folder containing the input images
        #[arg(short, long)]
        images: PathBuf,

        /// Output directory, created if missing
        #[arg(short, long)]
        output: PathBuf,

        /// Stop after the sparse point cloud
        #[arg(long, default_value_t = false)]
        no_dense: bool,

        /// Poisson mesh the fused point cloud
        #[arg(long, default_value_t = false)]
        mesh: bool,

        /// COLMAP camera model, e.g. OPENCV
        #[arg(long)]
        camera_model: Option<String>,
    },
    /// Incremental and/or global reconstruction with OpenMVG
    Openmvg {
        /// Folder containing the input images
        #[arg(short, long)]
        images: PathBuf,

        /// Output directory, created if missing
        #[arg(short, long)]
        output: PathBuf,

        /// SfM engine(s) to run
        #[arg(short, long, value_enum)]
        engine: Option<EngineArg>,
    },
    /// Export the points of an existing COLMAP sparse model as PLY
    Export {
        /// Directory holding points3D.bin or points3D.txt
        #[arg(short, long)]
        model: PathBuf,

        /// Destination .ply file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    Incremental,
    Global,
    Both,
}

impl From<EngineArg> for EngineSelection {
    fn from(value: EngineArg) -> Self {
        match value {
            EngineArg::Incremental => EngineSelection::Incremental,
            EngineArg::Global => EngineSelection::Global,
            EngineArg::Both => EngineSelection::Both,
        }
    }
}
