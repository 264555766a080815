use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 默认标签数
pub const DEFAULT_LABELS: u32 = 5;

/// 输出文件的组织方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// 所有标签合并到一个 OBJ 文件
    #[default]
    Merged,
    /// 每个非背景标签一个 OBJ 文件
    /// 网格只有背景标签时退回写出一个空的合并文件
    PerLabel,
}

/// 单次流水线运行的参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 量化标签数，0 表示不量化
    pub labels: u32,
    pub layout: OutputLayout,
    /// 输出目录，None 时写到输入文件所在目录
    pub output_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS,
            layout: OutputLayout::Merged,
            output_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_labels(mut self, labels: u32) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    /// 体数据文件所在目录，请求中的文件名相对于它
    pub resource_dir: PathBuf,
    /// 生成的 OBJ 文件目录
    pub output_dir: PathBuf,
    /// 任务过期时间
    pub task_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            resource_dir: PathBuf::from("test/resource"),
            output_dir: PathBuf::from("out"),
            task_ttl: Duration::from_secs(30 * 60), // 30 分钟
        }
    }
}

impl ServerConfig {
    /// 默认值 + 环境变量覆盖
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 按 MESHER_* 变量覆盖默认值，无法解析的 TTL 保持默认
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(bind) = lookup("MESHER_BIND") {
            config.bind = bind;
        }
        if let Some(dir) = lookup("MESHER_RESOURCE_DIR") {
            config.resource_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MESHER_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        match lookup("MESHER_TASK_TTL_SECS").map(|s| s.parse::<u64>()) {
            Some(Ok(secs)) => config.task_ttl = Duration::from_secs(secs),
            Some(Err(e)) => log::warn!("MESHER_TASK_TTL_SECS 无法解析，使用默认值: {}", e),
            None => {}
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn pipeline_config_defaults_and_builders() {
        let config = PipelineConfig::default();
        assert_eq!(config.labels, 5);
        assert_eq!(config.layout, OutputLayout::Merged);

        let config = config
            .with_labels(3)
            .with_layout(OutputLayout::PerLabel)
            .with_output_dir("/tmp/out");
        assert_eq!(config.labels, 3);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn pipeline_config_from_partial_json() {
        let config: PipelineConfig = serde_json::from_str(r#"{"layout": "per-label"}"#).unwrap();
        assert_eq!(config.labels, DEFAULT_LABELS);
        assert_eq!(config.layout, OutputLayout::PerLabel);
    }

    #[test]
    fn server_config_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MESHER_BIND", "0.0.0.0:9000"),
            ("MESHER_RESOURCE_DIR", "/data"),
            ("MESHER_TASK_TTL_SECS", "60"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.resource_dir, PathBuf::from("/data"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.task_ttl, Duration::from_secs(60));
    }

    #[test]
    fn bad_ttl_keeps_default() {
        let config = ServerConfig::from_lookup(|key| {
            (key == "MESHER_TASK_TTL_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.task_ttl, Duration::from_secs(30 * 60));
    }
}
