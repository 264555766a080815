//! OBJ 文本网格的读写
//!
//! 只支持最简单的子集：
//! ```text
//! v x y z      <- 每个顶点一行
//! f i j k      <- 每个三角面一行，索引从 1 开始，引用前面的顶点
//! ```
//! 没有法线、纹理坐标和材质分组。

use std::fmt::{Display, Write as _};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{MesherError, MesherResult};
use crate::mesh::LabelMesh;

/// 写出前校验记录：顶点必须 3 个坐标，面必须 3 个索引且索引落在 [1, 顶点数] 内
pub fn validate_records<V, F>(vertices: &[V], faces: &[F]) -> MesherResult<()>
where
    V: AsRef<[f64]>,
    F: AsRef<[u32]>,
{
    for (i, vertex) in vertices.iter().enumerate() {
        let len = vertex.as_ref().len();
        if len != 3 {
            return Err(MesherError::shape(format!(
                "第 {} 个顶点有 {} 个坐标，应为 3 个",
                i + 1,
                len
            )));
        }
    }

    for (i, face) in faces.iter().enumerate() {
        let face = face.as_ref();
        if face.len() != 3 {
            return Err(MesherError::shape(format!(
                "第 {} 个面有 {} 个索引，应为 3 个",
                i + 1,
                face.len()
            )));
        }
        if let Some(&bad) = face
            .iter()
            .find(|&&index| index == 0 || index as usize > vertices.len())
        {
            return Err(MesherError::shape(format!(
                "第 {} 个面引用了不存在的顶点 {}（共 {} 个顶点，索引从 1 开始）",
                i + 1,
                bad,
                vertices.len()
            )));
        }
    }

    Ok(())
}

/// 把顶点和面渲染成 OBJ 文本
/// 面索引按调用方给出的值原样写出（应当已经从 1 开始）
pub fn render_obj<V, F>(vertices: &[V], faces: &[F]) -> MesherResult<String>
where
    V: AsRef<[f64]>,
    F: AsRef<[u32]>,
{
    validate_records(vertices, faces)?;

    let mut out = String::with_capacity((vertices.len() + faces.len()) * 16);
    for vertex in vertices {
        push_record(&mut out, 'v', vertex.as_ref());
    }
    for face in faces {
        push_record(&mut out, 'f', face.as_ref());
    }
    Ok(out)
}

fn push_record<T: Display>(out: &mut String, tag: char, values: &[T]) {
    out.push(tag);
    for value in values {
        // 写入 String 不会失败
        let _ = write!(out, " {}", value);
    }
    out.push('\n');
}

/// 把 OBJ 文本写到文件，文件无法创建时返回 Io 错误
pub fn save_text(path: &Path, text: &str) -> MesherResult<()> {
    let file = File::create(path).map_err(|e| MesherError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| MesherError::io(path, e))
}

/// 校验、渲染并保存一组顶点/面记录
/// 记录不合法时不会创建文件
pub fn save_obj<V, F>(path: &Path, vertices: &[V], faces: &[F]) -> MesherResult<()>
where
    V: AsRef<[f64]>,
    F: AsRef<[u32]>,
{
    let text = render_obj(vertices, faces)?;
    save_text(path, &text)
}

/// 保存单个标签的网格
pub fn save_label_mesh(path: &Path, mesh: &LabelMesh) -> MesherResult<()> {
    save_obj(path, &mesh.vertex_rows(), &mesh.face_rows())
}

/// 读回的 OBJ 数据：顶点坐标和从 1 开始的面索引，保持文件中的顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjData {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
}

/// 解析 OBJ 文本中的 v / f 行，其余行忽略
pub fn parse_obj<R: BufRead>(reader: R, path: &Path) -> MesherResult<ObjData> {
    let mut data = ObjData::default();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| MesherError::io(path, e))?;
        let line_no = i + 1;
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let values = parse_tokens::<f64>(tokens, path, line_no)?;
                let vertex: [f64; 3] = values.try_into().map_err(|v: Vec<f64>| {
                    format_error(path, line_no, format!("顶点应有 3 个坐标，得到 {} 个", v.len()))
                })?;
                data.vertices.push(vertex);
            }
            Some("f") => {
                let values = parse_tokens::<u32>(tokens, path, line_no)?;
                let face: [u32; 3] = values.try_into().map_err(|v: Vec<u32>| {
                    format_error(path, line_no, format!("面应有 3 个索引，得到 {} 个", v.len()))
                })?;
                data.faces.push(face);
            }
            _ => {}
        }
    }

    Ok(data)
}

/// 从文件读回 OBJ 数据
pub fn load_obj(path: &Path) -> MesherResult<ObjData> {
    let file = File::open(path).map_err(|e| MesherError::io(path, e))?;
    parse_obj(BufReader::new(file), path)
}

fn parse_tokens<'a, T>(
    tokens: impl Iterator<Item = &'a str>,
    path: &Path,
    line_no: usize,
) -> MesherResult<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: Display,
{
    tokens
        .map(|token| {
            token
                .parse::<T>()
                .map_err(|e| format_error(path, line_no, format!("无法解析 '{}': {}", token, e)))
        })
        .collect()
}

fn format_error(path: &Path, line: usize, message: String) -> MesherError {
    MesherError::Format {
        path: path.to_path_buf(),
        line,
        message,
    }
}
