use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::mesh::{LabelMesh, LabeledMesh};
use crate::pipeline::PipelineReport;

/// 任务状态
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    /// 后台正在解析/抽取
    Pending,
    Done { report: PipelineReport },
    Failed { error: String },
}

/// 一次网格抽取任务
/// 抽取完成后每个标签的网格单独存放，被请求一次后即释放
pub struct TaskData {
    /// 请求中的文件名（相对资源目录）
    pub file: String,
    /// 网格维度 [nx, ny, nz]，提交时从文件头读取
    pub shape: [usize; 3],
    pub config: PipelineConfig,
    state: RwLock<TaskState>,
    /// 标签 -> 网格，取走后移除以释放内存
    buffers: RwLock<HashMap<u32, LabelMesh>>,
    /// 任务创建时间，用于 TTL 过期检查
    pub created_at: Instant,
}

impl TaskData {
    /// 创建新的 TaskData（后台任务尚未完成）
    pub fn new(file: String, shape: [usize; 3], config: PipelineConfig) -> Self {
        Self {
            file,
            shape,
            config,
            state: RwLock::new(TaskState::Pending),
            buffers: RwLock::new(HashMap::new()),
            created_at: Instant::now(),
        }
    }

    /// 后台抽取成功后调用
    pub fn complete(&self, report: PipelineReport, mut mesh: LabeledMesh) {
        let buffers = mesh
            .labels()
            .into_iter()
            .filter_map(|label| mesh.take(label).map(|bucket| (label, bucket)))
            .collect();
        *self.buffers.write() = buffers;
        *self.state.write() = TaskState::Done { report };
    }

    /// 后台抽取失败后调用
    pub fn fail(&self, error: String) {
        *self.state.write() = TaskState::Failed { error };
    }

    pub fn state(&self) -> TaskState {
        self.state.read().clone()
    }

    pub fn is_finished(&self) -> bool {
        !matches!(*self.state.read(), TaskState::Pending)
    }

    /// 获取并移除指定标签的网格（用于请求后释放内存）
    /// 返回 None 如果：
    /// - 任务尚未完成
    /// - 标签不存在
    /// - 该标签已被请求
    pub fn take_buffer(&self, label: u32) -> Option<LabelMesh> {
        self.buffers.write().remove(&label)
    }

    /// 获取剩余未被请求的标签
    pub fn remaining_labels(&self) -> Vec<u32> {
        let mut labels: Vec<u32> = self.buffers.read().keys().copied().collect();
        labels.sort_unstable();
        labels
    }
}

pub struct TaskStore {
    tasks: RwLock<HashMap<String, Arc<TaskData>>>,
    /// TTL（Time-To-Live）过期时间
    default_ttl: Duration,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(30 * 60)) // 30 分钟
    }

    /// 创建带自定义 TTL 的 TaskStore
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            default_ttl: ttl,
        }
    }

    pub fn insert(&self, data: TaskData) -> (String, Arc<TaskData>) {
        self.insert_with(|_| data)
    }

    /// 先分配 task_id 再构造任务，任务内容（例如输出目录）可以依赖 task_id
    pub fn insert_with<F>(&self, build: F) -> (String, Arc<TaskData>)
    where
        F: FnOnce(&str) -> TaskData,
    {
        let task_id = Uuid::new_v4().to_string();
        let task = Arc::new(build(&task_id));
        self.tasks.write().insert(task_id.clone(), task.clone());
        (task_id, task)
    }

    pub fn get(&self, task_id: &str) -> Option<Arc<TaskData>> {
        self.tasks.read().get(task_id).cloned()
    }

    /// 清理过期的任务
    /// 返回清理的任务数量
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut tasks = self.tasks.write();
        let before_count = tasks.len();

        tasks.retain(|_, task| now.duration_since(task.created_at) < self.default_ttl);

        before_count - tasks.len()
    }

    /// 获取当前任务数量
    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }

    /// 获取默认 TTL
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
