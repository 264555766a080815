//! PGM3D 体数据 → 按标签分组的边界网格（OBJ）
//!
//! 流水线: 读取 ([`parsers`]) → 灰度重采样 ([`quantize()`]) → 边界抽取 ([`extract`]) → 写出 ([`obj`])，
//! 由 [`pipeline`] 串起来；[`handlers`] / [`routes`] 提供 HTTP 任务接口。

pub mod app_state;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mesh;
pub mod obj;
pub mod parsers;
pub mod performance;
pub mod pipeline;
pub mod quantize;
pub mod routes;
pub mod task;
pub mod utils;

pub use config::{OutputLayout, PipelineConfig, ServerConfig};
pub use error::{MesherError, MesherResult, PipelineError, Stage};
pub use extract::extract_boundaries;
pub use mesh::{LabelMesh, LabeledMesh};
pub use pipeline::{PipelineReport, run_pipeline};
pub use quantize::quantize;
pub use utils::voxel_grid::VoxelGrid;
