pub mod config;
pub mod error;
pub mod logging;
pub mod ply;
pub mod point;
pub mod pointcloud;
pub mod process;
pub mod progress;
pub mod workspace;
