use std::path::{Component, Path, PathBuf};

use actix_web::{HttpResponse, Responder, post, web};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::config::{DEFAULT_LABELS, OutputLayout, PipelineConfig};
use crate::pipeline::{extract_file, write_outputs};
use crate::task::TaskData;

#[derive(Deserialize)]
pub struct ExtractRequest {
    /// 资源目录下的文件名，例如 "shepplogan.pgm3d"
    pub file: String,
    pub labels: Option<u32>,
    pub layout: Option<OutputLayout>,
}

#[derive(Serialize, Clone)]
pub struct ExtractResponse {
    pub task_id: String,
    pub file: String,
    pub file_size: u64,
    pub shape: [usize; 3],
    pub max_intensity: u32,
    pub labels: u32,
    pub layout: OutputLayout,
    /// 本任务的 OBJ 输出目录
    pub output_dir: PathBuf,
}

#[post("/mesh/extract")]
pub async fn extract_mesh(
    data: web::Data<AppState>,
    payload: web::Json<ExtractRequest>,
) -> impl Responder {
    match run_submit(data.get_ref(), payload.into_inner()) {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(err) => err,
    }
}

/// 提交网格抽取任务：快速校验文件并创建任务，抽取在后台进行
///
/// ## 步骤
/// 1. 校验文件名并查找解析器
/// 2. 获取文件大小
/// 3. 只读取文件头，检查 labels 参数
/// 4. 创建任务（task_id）
/// 5. 在阻塞线程池中跑完整条流水线，结果写回任务
///
/// ## 返回
/// - `Ok(ExtractResponse)`: 任务已创建，立即返回，不等待抽取完成
/// - `Err(HttpResponse)`: 校验失败，返回相应的 HTTP 错误响应
pub fn run_submit(app_state: &AppState, request: ExtractRequest) -> Result<ExtractResponse, HttpResponse> {
    let ExtractRequest { file, labels, layout } = request;
    let labels = labels.unwrap_or(DEFAULT_LABELS);
    let layout = layout.unwrap_or_default();

    // ==================== 步骤 1: 文件名校验与解析器查找 ====================
    // 只允许资源目录内的相对路径
    if !is_plain_relative(&file) {
        return Err(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "文件名无效",
            "file": file,
        })));
    }
    let file_path = app_state.resource_dir.join(&file);

    let parser = match app_state.parser_registry.find_parser_for_file(&file_path) {
        Some((p, _)) => p,
        None => {
            let supported = app_state.parser_registry.supported_extensions();
            return Err(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "不支持的文件格式",
                "file": file,
                "supported_extensions": supported,
            })));
        }
    };

    // ==================== 步骤 2: 获取文件大小 ====================
    let file_size = match std::fs::metadata(&file_path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            return Err(HttpResponse::NotFound().json(serde_json::json!({
                "error": "文件不存在或无法访问",
                "file": file,
                "details": e.to_string(),
            })));
        }
    };

    // ==================== 步骤 3: 读取文件头 ====================
    // 只读取前 3 行，不解析完整的体素数据
    let header = match parser.get_header_from_file(&file_path) {
        Ok(h) => h,
        Err(e) => {
            return Err(HttpResponse::UnprocessableEntity().json(serde_json::json!({
                "error": "文件头解析失败",
                "file": file,
                "parser": parser.name(),
                "details": e.to_string(),
            })));
        }
    };

    if labels > 0 && labels >= header.max_intensity {
        return Err(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "labels 必须小于文件的最大灰度",
            "labels": labels,
            "max_intensity": header.max_intensity,
        })));
    }

    // ==================== 步骤 4: 创建任务 ====================
    // 每个任务写到 output_dir/<task_id>/，同一文件的多次提交互不覆盖
    let (task_id, task) = app_state.task_store.insert_with(|task_id| {
        let config = PipelineConfig::default()
            .with_labels(labels)
            .with_layout(layout)
            .with_output_dir(app_state.output_dir.join(task_id));
        TaskData::new(file.clone(), header.shape, config)
    });
    let config = task.config.clone();
    let output_dir = config.output_dir.clone().unwrap_or_default();

    // ==================== 步骤 5: 后台运行流水线 ====================
    // CPU 密集的抽取放到阻塞线程池，不占用 actix 工作线程
    let parser_registry = app_state.parser_registry.clone();
    let task_id_clone = task_id.clone();
    actix_web::rt::spawn(async move {
        let result = web::block(move || {
            let Some((parser, _)) = parser_registry.find_parser_for_file(&file_path) else {
                return Err("找不到解析器".to_string());
            };
            extract_file(parser, &file_path, config.labels)
                .and_then(|extraction| write_outputs(extraction, &config))
                .map_err(|e| e.to_string())
        })
        .await;

        match result {
            Ok(Ok((report, mesh))) => {
                info!(
                    "[后台抽取] 任务 {} 完成，共 {} 个三角面",
                    task_id_clone,
                    mesh.total_faces()
                );
                task.complete(report, mesh);
            }
            Ok(Err(e)) => {
                error!("[后台抽取] 任务 {} 失败: {}", task_id_clone, e);
                task.fail(e);
            }
            Err(e) => {
                error!("[后台抽取] 任务 {} 执行异常: {}", task_id_clone, e);
                task.fail(e.to_string());
            }
        }
    });

    Ok(ExtractResponse {
        task_id,
        file,
        file_size,
        shape: header.shape,
        max_intensity: header.max_intensity,
        labels,
        layout,
        output_dir,
    })
}

/// 只由普通路径分量组成（没有 ".."、根目录或盘符）
fn is_plain_relative(file: &str) -> bool {
    let path = Path::new(file);
    !file.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_relative_names() {
        assert!(is_plain_relative("scan.pgm3d"));
        assert!(is_plain_relative("sub/scan.pgm3d"));
        assert!(!is_plain_relative("../scan.pgm3d"));
        assert!(!is_plain_relative("/etc/scan.pgm3d"));
        assert!(!is_plain_relative(""));
    }
}
