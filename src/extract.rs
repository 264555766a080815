//! 标签边界面抽取
//!
//! 遍历每个体素及其三个正向邻居 (x+1,y,z)、(x,y+1,z)、(x,y,z+1)。
//! 两个体素标签不同且都不是背景时，在它们的公共面上生成一个四边形（两个三角形），
//! 归入近端体素的标签分组。法线从近端体素指向远端体素。
//!
//! 背景与任意标签之间不生成几何：只输出物体之间的分隔面。
//!
//! 遍历顺序固定为 x 最外层、y 中间、z 最内层，每个体素依次检查 +x、+y、+z，
//! 同样的输入总是得到同样的顶点和面片顺序。

use log::{debug, info};

use crate::error::{MesherError, MesherResult};
use crate::mesh::LabeledMesh;
use crate::utils::voxel_grid::VoxelGrid;

/// 正向邻居方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    fn step(self) -> [usize; 3] {
        match self {
            Axis::X => [1, 0, 0],
            Axis::Y => [0, 1, 0],
            Axis::Z => [0, 0, 1],
        }
    }

    /// 体素 (x,y,z) 与其正向邻居之间公共面的 4 个角点
    /// 逆时针顺序（从远端体素一侧看），法线为 +axis
    pub fn face_corners(self, [x, y, z]: [u32; 3]) -> [[u32; 3]; 4] {
        match self {
            Axis::X => [
                [x + 1, y, z],
                [x + 1, y + 1, z],
                [x + 1, y + 1, z + 1],
                [x + 1, y, z + 1],
            ],
            Axis::Y => [
                [x, y + 1, z],
                [x, y + 1, z + 1],
                [x + 1, y + 1, z + 1],
                [x + 1, y + 1, z],
            ],
            Axis::Z => [
                [x, y, z + 1],
                [x + 1, y, z + 1],
                [x + 1, y + 1, z + 1],
                [x, y + 1, z + 1],
            ],
        }
    }
}

/// 从量化后的网格抽取按标签分组的边界网格
///
/// 背景取网格中的最小值。原点体素不是背景时，先在网格外包一层背景再遍历；
/// 输出坐标始终以未外扩的输入网格为参照。
pub fn extract_boundaries(grid: &VoxelGrid) -> MesherResult<LabeledMesh> {
    if grid.shape.contains(&0) {
        return Err(MesherError::invalid_parameter(format!(
            "网格维度不能为 0: {:?}",
            grid.shape
        )));
    }

    let labels = grid.labels();
    let background = labels[0];
    let mut mesh = LabeledMesh::new(background, labels.iter().copied());

    let padded;
    let (work, offset) = if grid.get(0, 0, 0) != background {
        debug!("原点体素不是背景，外扩一层背景体素");
        padded = grid.padded(background);
        mesh.padded = true;
        (&padded, 1u32)
    } else {
        (grid, 0u32)
    };

    let [nx, ny, nz] = work.shape;
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                let near = work.get(x, y, z);
                if near == background {
                    continue;
                }

                for axis in Axis::ALL {
                    let [dx, dy, dz] = axis.step();
                    let (fx, fy, fz) = (x + dx, y + dy, z + dz);
                    if fx >= nx || fy >= ny || fz >= nz {
                        continue;
                    }

                    let far = work.get(fx, fy, fz);
                    if far == near || far == background {
                        continue;
                    }

                    // 非背景体素不会落在外扩的边界层上，减去偏移不会下溢
                    let origin = [
                        x as u32 - offset,
                        y as u32 - offset,
                        z as u32 - offset,
                    ];
                    mesh.bucket_mut(near).push_quad(axis.face_corners(origin));
                }
            }
        }
    }

    mesh.finish();

    info!(
        "边界抽取完成: {} 个标签, {} 个顶点, {} 个三角面 (背景 = {})",
        mesh.len(),
        mesh.total_vertices(),
        mesh.total_faces(),
        background
    );

    Ok(mesh)
}
