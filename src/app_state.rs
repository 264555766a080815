use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::task::TaskStore;
use crate::utils::parser_registry::ParserRegistry;

/// 全局应用状态，负责在各个 handler 之间共享解析器、目录与任务存储
pub struct AppState {
    pub parser_registry: Arc<ParserRegistry>,
    pub resource_dir: PathBuf,
    pub output_dir: PathBuf,
    pub task_store: Arc<TaskStore>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            parser_registry: Arc::new(ParserRegistry::new()),
            resource_dir: config.resource_dir.clone(),
            output_dir: config.output_dir.clone(),
            task_store: Arc::new(TaskStore::with_ttl(config.task_ttl)),
        }
    }
}
