use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// 各处理阶段共用的 Result 类型
pub type MesherResult<T> = Result<T, MesherError>;

/// 流水线各阶段可能产生的错误
#[derive(Debug, Error)]
pub enum MesherError {
    /// 文件无法打开、读取或创建
    #[error("文件 {} 读写失败: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 文件头（或某个体素值）格式错误
    /// line 为出错文本所在行号（从 1 开始）
    #[error("文件 {} 第 {line} 行格式错误: {message}", .path.display())]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// 体素值数量少于文件头声明的 size_x * size_y * size_z
    #[error("文件 {} 数据不完整: 需要 {expected} 个体素值，只读到 {found} 个", .path.display())]
    TruncatedData {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// 量化参数非法，或网格维度退化
    #[error("参数无效: {message}")]
    InvalidParameter { message: String },

    /// 顶点/面记录不是恰好 3 个分量
    #[error("网格记录格式错误: {message}")]
    Shape { message: String },
}

impl MesherError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    /// 把 io::Error 和出错的文件路径绑在一起
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// 流水线阶段，用于标记错误来源和耗时记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Read,
    Quantize,
    Extract,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Quantize => "quantize",
            Self::Extract => "extract",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// run_pipeline 返回的错误：失败的阶段 + 输入文件 + 该阶段的原始错误（不做改写）
#[derive(Debug, Error)]
#[error("[{stage}] 处理 {} 失败: {source}", .input.display())]
pub struct PipelineError {
    pub stage: Stage,
    pub input: PathBuf,
    #[source]
    pub source: MesherError,
}

impl PipelineError {
    pub(crate) fn new(stage: Stage, input: impl Into<PathBuf>, source: MesherError) -> Self {
        Self {
            stage,
            input: input.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_names_file_and_line() {
        let err = MesherError::Format {
            path: PathBuf::from("vol.pgm3d"),
            line: 2,
            message: "size 行应包含 3 个数".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("vol.pgm3d"));
        assert!(text.contains("第 2 行"));
    }

    #[test]
    fn pipeline_error_keeps_stage_and_source() {
        let err = PipelineError::new(
            Stage::Quantize,
            "scan.pgm3d",
            MesherError::invalid_parameter("labels 必须小于最大灰度"),
        );
        assert!(err.to_string().starts_with("[quantize] 处理 scan.pgm3d 失败"));
        assert!(matches!(err.source, MesherError::InvalidParameter { .. }));
    }
}
