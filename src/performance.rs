use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::Stage;

/// 单个阶段的耗时记录
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRecord {
    pub stage: Stage,
    /// 开始时间 (Unix 时间戳，毫秒)
    pub start_time: u64,
    /// 结束时间 (Unix 时间戳，毫秒)
    pub end_time: u64,
    /// 阶段耗时（毫秒，单调时钟）
    pub elapsed_ms: f64,
    /// 附加信息，例如网格尺寸、面片数
    pub msg: String,
}

/// 阶段计时器，finish 时生成 PerformanceRecord
pub struct StageTimer {
    stage: Stage,
    start_time: u64,
    started: Instant,
}

impl StageTimer {
    pub fn start(stage: Stage) -> Self {
        Self {
            stage,
            start_time: get_unix_timestamp_ms(),
            started: Instant::now(),
        }
    }

    pub fn finish(self, msg: impl Into<String>) -> PerformanceRecord {
        PerformanceRecord {
            stage: self.stage,
            start_time: self.start_time,
            end_time: get_unix_timestamp_ms(),
            elapsed_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            msg: msg.into(),
        }
    }
}

/// 获取 Unix 时间戳（毫秒），系统时钟早于 1970 时返回 0
pub fn get_unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
