//! 运行遥测与失败护栏
//!
//! 追加写 JSONL 事件、输出运行汇总，并在失败数达到上限时通知调用方提前结束。
//! 这里的任何 I/O 失败都只记 debug 日志，绝不向批处理主流程传播。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

/// 批处理运行记录器
#[derive(Debug)]
pub struct RunRecorder {
    log_path: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    max_failures: Option<usize>,
    run_id: String,
    started_at: f64,
    successes: usize,
    failures: usize,
}

impl RunRecorder {
    /// 任一功能被请求时才创建记录器
    pub fn create(
        log_path: Option<PathBuf>,
        summary_path: Option<PathBuf>,
        max_failures: Option<usize>,
    ) -> Option<Self> {
        if log_path.is_none() && summary_path.is_none() && max_failures.is_none() {
            return None;
        }
        Some(Self::new(log_path, summary_path, max_failures))
    }

    pub fn new(
        log_path: Option<PathBuf>,
        summary_path: Option<PathBuf>,
        max_failures: Option<usize>,
    ) -> Self {
        for path in log_path.iter().chain(summary_path.iter()) {
            ensure_parent(path);
        }
        Self {
            log_path,
            summary_path,
            max_failures,
            run_id: Uuid::new_v4().simple().to_string(),
            started_at: unix_now(),
            successes: 0,
            failures: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn on_run_start<C: Serialize>(&self, total_items: Option<usize>, config: &C) {
        let snapshot = serde_json::to_value(config)
            .unwrap_or_else(|e| json!({ "unserializable": e.to_string() }));
        self.append(json!({
            "event": "run_start",
            "run_id": self.run_id,
            "total_items": total_items,
            "config": snapshot,
            "timestamp": unix_now(),
        }));
    }

    pub fn on_item_success(
        &mut self,
        index: usize,
        filename: &str,
        duration: Duration,
        content_length: usize,
    ) {
        self.successes += 1;
        self.append(json!({
            "event": "item_success",
            "run_id": self.run_id,
            "index": index,
            "filename": filename,
            "duration_sec": round4(duration.as_secs_f64()),
            "content_length": content_length,
            "timestamp": unix_now(),
        }));
    }

    pub fn on_item_failure(&mut self, index: usize, error: &str, attempts: u32) {
        self.failures += 1;
        self.append(json!({
            "event": "item_failure",
            "run_id": self.run_id,
            "index": index,
            "attempt": attempts,
            "error": error,
            "timestamp": unix_now(),
        }));
    }

    /// 失败数达到上限时返回 true
    pub fn should_abort(&self) -> bool {
        self.max_failures
            .is_some_and(|limit| self.failures >= limit)
    }

    pub fn finalize(&self, successes: usize, failures: usize, wall_time: Duration) {
        let summary = json!({
            "event": "run_complete",
            "run_id": self.run_id,
            "successes": successes,
            "failures": failures,
            "wall_time_sec": round4(wall_time.as_secs_f64()),
            "started_at": self.started_at,
            "ended_at": unix_now(),
        });
        self.append(summary.clone());

        if let Some(path) = &self.summary_path {
            let written = serde_json::to_string_pretty(&summary)
                .map_err(|e| e.to_string())
                .and_then(|body| fs::write(path, body).map_err(|e| e.to_string()));
            if let Err(e) = written {
                debug!("写入运行汇总失败 ({}): {}", path.display(), e);
            }
        }
    }

    fn append(&self, payload: Value) {
        let Some(path) = &self.log_path else {
            return;
        };
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", payload));
        if let Err(e) = written {
            debug!("写入遥测日志失败 ({}): {}", path.display(), e);
        }
    }
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            debug!("创建目录失败 ({}): {}", parent.display(), e);
        }
    }
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
