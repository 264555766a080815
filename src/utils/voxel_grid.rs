use crate::error::{MesherError, MesherResult};

/// 体素网格数据结构
/// 表示三维规则网格上的整数灰度/标签数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    /// 网格维度 [nx, ny, nz]，与 PGM3D 文件头顺序一致
    pub shape: [usize; 3],
    /// 数据数组，按行优先顺序存储（z 变化最快，y 其次，x 最慢）
    /// 索引计算: index = (x * ny + y) * nz + z
    pub data: Vec<u32>,
}

impl VoxelGrid {
    /// 创建新的体素网格，数据量必须与 shape 匹配
    pub fn new(shape: [usize; 3], data: Vec<u32>) -> MesherResult<Self> {
        let total_elements = shape[0] * shape[1] * shape[2];

        if data.len() != total_elements {
            return Err(MesherError::invalid_parameter(format!(
                "数据量不匹配: shape {:?} 需要 {} 个元素，但提供了 {} 个",
                shape,
                total_elements,
                data.len()
            )));
        }

        Ok(VoxelGrid { shape, data })
    }

    /// 创建所有体素都为 value 的网格
    pub fn filled(shape: [usize; 3], value: u32) -> Self {
        VoxelGrid {
            shape,
            data: vec![value; shape[0] * shape[1] * shape[2]],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 任一维度为 0 时网格为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        let [_, ny, nz] = self.shape;
        (x * ny + y) * nz + z
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u32 {
        self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u32) {
        let index = self.index(x, y, z);
        self.data[index] = value;
    }

    /// 网格中出现的所有不同取值，升序排列
    /// 第一个元素即背景标签
    pub fn labels(&self) -> Vec<u32> {
        let mut labels = self.data.clone();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// 网格中实际出现的最大值
    pub fn max_value(&self) -> Option<u32> {
        self.data.iter().copied().max()
    }

    /// 在每个方向外扩一层体素，边界填充 fill，原网格放在 (1,1,1) 偏移处
    /// 返回新网格，不修改自身
    pub fn padded(&self, fill: u32) -> VoxelGrid {
        let [nx, ny, nz] = self.shape;
        let mut padded = VoxelGrid::filled([nx + 2, ny + 2, nz + 2], fill);

        for x in 0..nx {
            for y in 0..ny {
                // z 方向在两边都是连续存储，整行拷贝
                let src = self.index(x, y, 0);
                let dst = padded.index(x + 1, y + 1, 1);
                padded.data[dst..dst + nz].copy_from_slice(&self.data[src..src + nz]);
            }
        }

        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        assert!(VoxelGrid::new([2, 2, 2], vec![0; 7]).is_err());
        assert!(VoxelGrid::new([2, 2, 2], vec![0; 8]).is_ok());
    }

    #[test]
    fn z_is_fastest_axis() {
        let grid = VoxelGrid::new([2, 2, 2], (0..8).collect()).unwrap();
        assert_eq!(grid.get(0, 0, 1), 1);
        assert_eq!(grid.get(0, 1, 0), 2);
        assert_eq!(grid.get(1, 0, 0), 4);
        assert_eq!(grid.get(1, 1, 1), 7);
    }

    #[test]
    fn set_writes_single_voxel() {
        let mut grid = VoxelGrid::filled([2, 3, 4], 0);
        grid.set(1, 2, 3, 9);
        assert_eq!(grid.data[23], 9);
        assert_eq!(grid.labels(), vec![0, 9]);
    }

    #[test]
    fn labels_are_sorted_and_distinct() {
        let grid = VoxelGrid::new([1, 2, 3], vec![9, 3, 3, 0, 9, 5]).unwrap();
        assert_eq!(grid.labels(), vec![0, 3, 5, 9]);
        assert_eq!(grid.max_value(), Some(9));
    }

    #[test]
    fn padded_embeds_grid_in_border() {
        let grid = VoxelGrid::new([1, 2, 1], vec![4, 5]).unwrap();
        let padded = grid.padded(0);

        assert_eq!(padded.shape, [3, 4, 3]);
        assert_eq!(padded.get(1, 1, 1), 4);
        assert_eq!(padded.get(1, 2, 1), 5);
        assert_eq!(padded.data.iter().filter(|&&v| v != 0).count(), 2);
        // 原网格不变
        assert_eq!(grid.shape, [1, 2, 1]);
    }

    #[test]
    fn empty_grid() {
        let grid = VoxelGrid::new([0, 3, 3], Vec::new()).unwrap();
        assert!(grid.is_empty());
        assert!(grid.labels().is_empty());
    }
}
