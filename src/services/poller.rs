//! 任务状态轮询 - 业务能力层
//!
//! 上游查询接口没有明确的状态约定（"completed"、"done"、数字 2 都出现过），
//! 因此完成条件由 `CompletionMatcher` 配置，未识别的状态一律视为"尚未完成"。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::AppResult;

/// 状态查询能力
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn query_status(&self, task_code: &str) -> AppResult<Value>;
}

/// 完成状态匹配器
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionMatcher {
    field: String,
    accepted: Vec<Value>,
}

impl Default for CompletionMatcher {
    fn default() -> Self {
        Self {
            field: "status".to_string(),
            accepted: vec![Value::from("completed"), Value::from("done"), Value::from(2)],
        }
    }
}

impl CompletionMatcher {
    pub fn new(field: impl Into<String>, accepted: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            accepted,
        }
    }

    /// 从命令行参数构造：能解析为 JSON 的值按 JSON 处理（`2` 为数字），其余按字符串处理
    pub fn from_cli(field: &str, values: &[String]) -> Self {
        let accepted = values
            .iter()
            .map(|v| serde_json::from_str::<Value>(v).unwrap_or_else(|_| Value::String(v.clone())))
            .collect();
        Self::new(field, accepted)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// 判断状态 JSON 是否表示已完成
    pub fn matches(&self, payload: &Value) -> bool {
        let Some(status) = lookup(payload, &self.field) else {
            return false;
        };
        self.accepted.iter().any(|expected| same_value(expected, status))
    }
}

fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(payload, |current, segment| current.get(segment))
}

fn same_value(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => expected == actual,
    }
}

/// 截止时间无法表示时使用的轮询窗口
const MAX_POLL_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// 轮询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Completed,
    TimedOut,
}

impl PollOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollOutcome::Completed => "completed",
            PollOutcome::TimedOut => "timed_out",
        }
    }
}

/// 轮询直到完成或超时
///
/// # 参数
/// - `source`: 状态查询能力
/// - `task_code`: 任务编码
/// - `matcher`: 完成条件
/// - `interval`: 查询间隔
/// - `timeout`: 最长轮询时间
///
/// # 返回
/// 匹配到完成状态立即返回 `Completed`；耗时达到 `timeout` 返回 `TimedOut`
pub async fn poll_until_complete<S>(
    source: &S,
    task_code: &str,
    matcher: &CompletionMatcher,
    interval: Duration,
    timeout: Duration,
) -> PollOutcome
where
    S: StatusSource + ?Sized,
{
    let started = Instant::now();
    let deadline = started.checked_add(timeout).unwrap_or(started + MAX_POLL_WINDOW);

    while Instant::now() < deadline {
        match source.query_status(task_code).await {
            Ok(payload) if matcher.matches(&payload) => {
                info!("✓ 任务 {} 已完成", task_code);
                return PollOutcome::Completed;
            }
            Ok(payload) => debug!("任务 {} 尚未完成: {}", task_code, payload),
            Err(e) => warn!("查询任务 {} 失败: {}", task_code, e),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        sleep(interval.min(remaining)).await;
    }

    warn!("⚠️ 任务 {} 轮询超时 ({:?})", task_code, timeout);
    PollOutcome::TimedOut
}
