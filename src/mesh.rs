use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// 单个标签的三角网格
///
/// 顶点是体素角点的整数坐标（体素 (x,y,z) 占据 [x,x+1]×[y,y+1]×[z,z+1]），
/// 面片索引从 0 开始，写出 OBJ 时再转成从 1 开始。
#[derive(Debug, Clone, Default)]
pub struct LabelMesh {
    pub vertices: Vec<[u32; 3]>,
    pub faces: Vec<[u32; 3]>,
    /// 构建期间的 角点坐标 -> 顶点索引，用于去重；finish 后清空
    lookup: HashMap<[u32; 3], u32>,
}

impl LabelMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// 返回角点对应的顶点索引，不存在时追加新顶点
    pub fn vertex_index(&mut self, corner: [u32; 3]) -> u32 {
        if let Some(&index) = self.lookup.get(&corner) {
            return index;
        }
        let index = self.vertices.len() as u32;
        self.vertices.push(corner);
        self.lookup.insert(corner, index);
        index
    }

    /// 追加一个四边形（按顺序给出 4 个角点），拆成 (0,1,2) 和 (0,2,3) 两个三角形
    pub fn push_quad(&mut self, corners: [[u32; 3]; 4]) {
        let [a, b, c, d] = corners.map(|corner| self.vertex_index(corner));
        self.faces.push([a, b, c]);
        self.faces.push([a, c, d]);
    }

    /// 释放去重表，网格此后只读
    pub fn finish(&mut self) {
        self.lookup = HashMap::new();
    }

    /// 顶点坐标，供 OBJ 写出
    pub fn vertex_rows(&self) -> Vec<[f64; 3]> {
        self.vertices
            .iter()
            .map(|v| v.map(f64::from))
            .collect()
    }

    /// 面片索引（从 1 开始），供 OBJ 写出
    pub fn face_rows(&self) -> Vec<[u32; 3]> {
        self.faces.iter().map(|f| f.map(|i| i + 1)).collect()
    }
}

/// 单个标签的统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelStats {
    pub label: u32,
    pub vertices: usize,
    pub faces: usize,
}

/// 按标签分组的边界网格，标签按数值升序排列
#[derive(Debug, Clone, Default)]
pub struct LabeledMesh {
    /// 背景标签（量化后网格中的最小值）
    pub background: u32,
    /// 抽取前是否做过外扩
    pub padded: bool,
    buckets: BTreeMap<u32, LabelMesh>,
}

impl LabeledMesh {
    /// 为每个非背景标签预先建立空的分组
    pub fn new(background: u32, labels: impl IntoIterator<Item = u32>) -> Self {
        let buckets = labels
            .into_iter()
            .filter(|&label| label != background)
            .map(|label| (label, LabelMesh::new()))
            .collect();

        Self {
            background,
            padded: false,
            buckets,
        }
    }

    pub fn bucket_mut(&mut self, label: u32) -> &mut LabelMesh {
        self.buckets.entry(label).or_default()
    }

    pub fn get(&self, label: u32) -> Option<&LabelMesh> {
        self.buckets.get(&label)
    }

    /// 取出某个标签的网格
    pub fn take(&mut self, label: u32) -> Option<LabelMesh> {
        self.buckets.remove(&label)
    }

    /// 非背景标签列表，升序
    pub fn labels(&self) -> Vec<u32> {
        self.buckets.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &LabelMesh)> {
        self.buckets.iter().map(|(&label, mesh)| (label, mesh))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_faces(&self) -> usize {
        self.buckets.values().map(LabelMesh::face_count).sum()
    }

    pub fn total_vertices(&self) -> usize {
        self.buckets.values().map(LabelMesh::vertex_count).sum()
    }

    pub fn stats(&self) -> Vec<LabelStats> {
        self.iter()
            .map(|(label, mesh)| LabelStats {
                label,
                vertices: mesh.vertex_count(),
                faces: mesh.face_count(),
            })
            .collect()
    }

    pub fn finish(&mut self) {
        for mesh in self.buckets.values_mut() {
            mesh.finish();
        }
    }

    /// 按标签顺序拼接成一个网格，面片索引加上前面各分组的顶点偏移
    /// 不同标签之间的重合顶点不合并
    pub fn merged(&self) -> LabelMesh {
        let mut merged = LabelMesh::new();
        merged.vertices.reserve(self.total_vertices());
        merged.faces.reserve(self.total_faces());

        for mesh in self.buckets.values() {
            let offset = merged.vertices.len() as u32;
            merged.vertices.extend_from_slice(&mesh.vertices);
            merged
                .faces
                .extend(mesh.faces.iter().map(|f| f.map(|i| i + offset)));
        }

        merged
    }
}
