//! 读取 → 量化 → 边界抽取 → 写出 OBJ
//!
//! 每个阶段的错误原样包进 PipelineError 并标明阶段，不做重试。
//! OBJ 文本先全部在内存中生成，再写入临时文件，全部成功后才改名为最终文件；
//! 运行失败时不会留下任何输出，也不会覆盖之前运行的结果。

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{OutputLayout, PipelineConfig};
use crate::error::{MesherError, PipelineError, Stage};
use crate::extract::extract_boundaries;
use crate::mesh::{LabelStats, LabeledMesh};
use crate::obj::{render_obj, save_text};
use crate::parsers::Pgm3dParser;
use crate::performance::{PerformanceRecord, StageTimer};
use crate::quantize::quantize_with_progress;
use crate::utils::parser::VolumeParser;

/// 写出的一个 OBJ 文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub path: PathBuf,
    /// 按标签输出时为该标签，合并输出时为 None
    pub label: Option<u32>,
    pub vertices: usize,
    pub faces: usize,
}

/// 一次运行的结果汇总
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub shape: [usize; 3],
    pub max_intensity: u32,
    pub labels_requested: u32,
    pub background: u32,
    pub padded: bool,
    pub labels: Vec<LabelStats>,
    pub outputs: Vec<OutputFile>,
    pub timings: Vec<PerformanceRecord>,
}

/// 抽取阶段的结果，还未写出
#[derive(Debug)]
pub struct Extraction {
    pub mesh: LabeledMesh,
    pub report: PipelineReport,
}

/// 用 PGM3D 解析器跑完整条流水线
pub fn run_pipeline(input: &Path, config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    let extraction = extract_file(&Pgm3dParser::new(), input, config.labels)?;
    write_outputs(extraction, config).map(|(report, _)| report)
}

/// 前三个阶段：读取、量化、边界抽取
pub fn extract_file(
    parser: &dyn VolumeParser,
    input: &Path,
    labels: u32,
) -> Result<Extraction, PipelineError> {
    let fail = |stage| move |source: MesherError| PipelineError::new(stage, input, source);
    let mut timings = Vec::with_capacity(4);

    // ==================== 读取 ====================
    let timer = StageTimer::start(Stage::Read);
    let volume = parser.parse_from_file(input).map_err(fail(Stage::Read))?;
    let shape = volume.grid.shape;
    info!(
        "[{}] {} 读取完成: shape {:?}, 最大灰度 {}",
        parser.name(),
        input.display(),
        shape,
        volume.max_intensity
    );
    timings.push(timer.finish(format!("shape {:?}", shape)));

    // ==================== 量化 ====================
    let timer = StageTimer::start(Stage::Quantize);
    let max_intensity = volume.max_intensity;
    let grid = quantize_with_progress(volume.grid, max_intensity, labels, |done, total| {
        debug!("重采样进度 {}/{}", done, total);
    })
    .map_err(fail(Stage::Quantize))?;
    timings.push(timer.finish(format!("labels = {}", labels)));

    // ==================== 边界抽取 ====================
    let timer = StageTimer::start(Stage::Extract);
    let mesh = extract_boundaries(&grid).map_err(fail(Stage::Extract))?;
    timings.push(timer.finish(format!(
        "{} 个顶点, {} 个三角面",
        mesh.total_vertices(),
        mesh.total_faces()
    )));

    let report = PipelineReport {
        input: input.to_path_buf(),
        shape,
        max_intensity,
        labels_requested: labels,
        background: mesh.background,
        padded: mesh.padded,
        labels: mesh.stats(),
        outputs: Vec::new(),
        timings,
    };

    Ok(Extraction { mesh, report })
}

/// 最后一个阶段：按 config.layout 写出 OBJ，返回补全后的报告和网格
pub fn write_outputs(
    extraction: Extraction,
    config: &PipelineConfig,
) -> Result<(PipelineReport, LabeledMesh), PipelineError> {
    let Extraction { mesh, mut report } = extraction;
    let input = report.input.clone();
    let fail = |source: MesherError| PipelineError::new(Stage::Write, &input, source);

    let timer = StageTimer::start(Stage::Write);
    let output_dir = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| fail(MesherError::invalid_parameter("输入路径没有文件名")))?;

    // 先在内存中生成所有文本，记录不合法时直接失败，不创建任何文件
    // 按标签输出但没有任何非背景标签时，同样写一个空的合并文件，保证至少有一个输出
    let layout = match config.layout {
        OutputLayout::PerLabel if mesh.is_empty() => {
            debug!("{} 只有背景标签，改为写出一个空文件", input.display());
            OutputLayout::Merged
        }
        layout => layout,
    };

    let mut rendered = Vec::new();
    match layout {
        OutputLayout::Merged => {
            let merged = mesh.merged();
            let text = render_obj(&merged.vertex_rows(), &merged.face_rows()).map_err(fail)?;
            let output = OutputFile {
                path: output_dir.join(format!("{}.obj", file_name)),
                label: None,
                vertices: merged.vertex_count(),
                faces: merged.face_count(),
            };
            rendered.push((output, text));
        }
        OutputLayout::PerLabel => {
            for (label, bucket) in mesh.iter() {
                let text = render_obj(&bucket.vertex_rows(), &bucket.face_rows()).map_err(fail)?;
                let output = OutputFile {
                    path: output_dir.join(format!("{}.label-{}.obj", file_name, label)),
                    label: Some(label),
                    vertices: bucket.vertex_count(),
                    faces: bucket.face_count(),
                };
                rendered.push((output, text));
            }
        }
    }

    if !output_dir.as_os_str().is_empty() {
        fs::create_dir_all(&output_dir).map_err(|e| fail(MesherError::io(&output_dir, e)))?;
    }
    commit(&rendered).map_err(fail)?;

    let outputs: Vec<OutputFile> = rendered.into_iter().map(|(output, _)| output).collect();
    for output in &outputs {
        info!(
            "写出 {} ({} 个顶点, {} 个三角面)",
            output.path.display(),
            output.vertices,
            output.faces
        );
    }

    report
        .timings
        .push(timer.finish(format!("{} 个文件", outputs.len())));
    report.outputs = outputs;

    Ok((report, mesh))
}

/// 先写临时文件，全部成功后再改名；中途失败时清理本次写出的临时文件
/// 临时文件名带本次运行的 id，同一输入的并发运行互不干扰
fn commit(rendered: &[(OutputFile, String)]) -> Result<(), MesherError> {
    let run_id = Uuid::new_v4().simple().to_string();
    let staged: Vec<PathBuf> = rendered
        .iter()
        .map(|(output, _)| temp_path(&output.path, &run_id))
        .collect();

    let result = rendered
        .iter()
        .zip(&staged)
        .try_for_each(|((_, text), tmp)| save_text(tmp, text))
        .and_then(|()| {
            rendered
                .iter()
                .zip(&staged)
                .try_for_each(|((output, _), tmp)| {
                    fs::rename(tmp, &output.path).map_err(|e| MesherError::io(&output.path, e))
                })
        });

    if result.is_err() {
        for tmp in staged.iter().filter(|tmp| tmp.exists()) {
            if let Err(e) = fs::remove_file(tmp) {
                warn!("无法清理临时文件 {}: {}", tmp.display(), e);
            }
        }
    }

    result
}

fn temp_path(path: &Path, run_id: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", run_id));
    path.with_file_name(name)
}
