use std::path::Path;

use crate::error::MesherResult;
use crate::utils::voxel_grid::VoxelGrid;

/// 解析结果：体素网格 + 文件头声明的最大灰度
#[derive(Debug, Clone)]
pub struct Volume {
    pub grid: VoxelGrid,
    pub max_intensity: u32,
}

/// 文件头信息（只读取元数据时返回）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeHeader {
    pub shape: [usize; 3],
    pub max_intensity: u32,
}

/// 体数据解析器 trait
/// 不同文件格式需要实现这个 trait
pub trait VolumeParser: Send + Sync {
    /// 获取支持的文件扩展名（不含点号），例如: "pgm3d"
    fn supported_extensions(&self) -> Vec<&'static str>;

    /// 检查文件扩展名是否被支持
    fn supports(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// 从文件路径解析体数据
    fn parse_from_file(&self, file_path: &Path) -> MesherResult<Volume>;

    /// 快速获取文件头（只读取元数据，不解析完整数据）
    /// 用于提交任务时快速校验文件
    fn get_header_from_file(&self, file_path: &Path) -> MesherResult<VolumeHeader>;

    /// 获取解析器名称（用于日志和错误信息）
    fn name(&self) -> &'static str;
}
