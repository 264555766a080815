//! 灰度重采样：把原始灰度压缩成少量标签值
//!
//! `border = max_intensity / (labels + 1)`，第 i 个区间 `[border*i, border*(i+1))`
//! 映射到 `border*i`，`>= border*labels` 的值统一映射到 `max_intensity`。
//! 最亮的材质始终保留真实的最大灰度，而不是落到某个量化台阶上。

use log::{debug, info};

use crate::error::{MesherError, MesherResult};
use crate::utils::voxel_grid::VoxelGrid;

/// 量化参数，构造时校验
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    max_intensity: u32,
    labels: u32,
    border: u32,
}

impl Quantizer {
    /// labels == 0 表示不量化，返回 Ok(None)
    /// labels >= max_intensity 时量化没有意义，返回 InvalidParameter
    pub fn new(max_intensity: u32, labels: u32) -> MesherResult<Option<Self>> {
        if labels == 0 {
            return Ok(None);
        }
        if labels >= max_intensity {
            return Err(MesherError::invalid_parameter(format!(
                "标签数 {} 必须小于最大灰度 {}",
                labels, max_intensity
            )));
        }

        Ok(Some(Self {
            max_intensity,
            labels,
            border: max_intensity / (labels + 1),
        }))
    }

    /// 相邻量化台阶的间距
    pub fn border(&self) -> u32 {
        self.border
    }

    /// 单个灰度值的映射结果
    #[inline]
    pub fn map(&self, value: u32) -> u32 {
        if value >= self.border * self.labels {
            self.max_intensity
        } else {
            (value / self.border) * self.border
        }
    }

    /// 所有可能的输出值，升序
    pub fn levels(&self) -> Vec<u32> {
        let mut levels: Vec<u32> = (0..self.labels).map(|i| self.border * i).collect();
        levels.push(self.max_intensity);
        levels.dedup();
        levels
    }
}

/// 对整个网格做量化，等价于 quantize_with_progress 不带进度回调
pub fn quantize(grid: VoxelGrid, max_intensity: u32, labels: u32) -> MesherResult<VoxelGrid> {
    quantize_with_progress(grid, max_intensity, labels, |_, _| {})
}

/// 对整个网格做量化
/// progress 按 x 切片回调 (已完成切片数, 总切片数)，库内部不做任何打印
pub fn quantize_with_progress<F>(
    mut grid: VoxelGrid,
    max_intensity: u32,
    labels: u32,
    mut progress: F,
) -> MesherResult<VoxelGrid>
where
    F: FnMut(usize, usize),
{
    let Some(quantizer) = Quantizer::new(max_intensity, labels)? else {
        debug!("labels = 0，跳过量化");
        return Ok(grid);
    };

    info!(
        "灰度重采样: max = {}, labels = {}, border = {}",
        max_intensity,
        labels,
        quantizer.border()
    );

    let [nx, ny, nz] = grid.shape;
    let slab = ny * nz;
    if slab > 0 {
        for (i, chunk) in grid.data.chunks_mut(slab).enumerate() {
            for value in chunk.iter_mut() {
                *value = quantizer.map(*value);
            }
            progress(i + 1, nx);
        }
    }

    Ok(grid)
}
