//! 任务与结果记录

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::services::poller::PollOutcome;

/// 单条记录的处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// 调用成功
    Succeeded,
    /// 重试耗尽或输入无效
    Failed,
    /// 续跑模式下产物已存在
    Skipped,
    /// 演练模式，未发起调用
    DryRun,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Succeeded => "succeeded",
            RecordStatus::Failed => "failed",
            RecordStatus::Skipped => "skipped",
            RecordStatus::DryRun => "dry_run",
        }
    }
}

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// 从 1 开始的序号
    pub index: usize,
    pub identifier: String,
    pub status: RecordStatus,
    /// 产物引用（文件名或任务编码）
    pub output: Option<String>,
    pub error: Option<String>,
    pub attempts: u32,
    pub duration_secs: f64,
    /// 仅在执行了轮询时存在
    pub poll: Option<PollOutcome>,
}

impl ResultRecord {
    pub fn new(index: usize, identifier: impl Into<String>, status: RecordStatus) -> Self {
        Self {
            index,
            identifier: identifier.into(),
            status,
            output: None,
            error: None,
            attempts: 0,
            duration_secs: 0.0,
            poll: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration_secs = duration.as_secs_f64();
        self
    }

    pub fn with_poll(mut self, poll: PollOutcome) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == RecordStatus::Failed
    }
}

/// 一次视频合成任务
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTask {
    pub index: usize,
    /// 同时作为提交时的任务编码
    pub speaker_id: String,
    pub audio_url: String,
    pub video_url: String,
    pub metadata_path: PathBuf,
}

impl VideoTask {
    /// 提交接口的请求体
    pub fn submit_payload(&self) -> Value {
        json!({
            "audio_url": self.audio_url,
            "video_url": self.video_url,
            "code": self.speaker_id,
            "chaofen": 0,
            "watermark_switch": 0,
            "pn": 1,
        })
    }
}

/// 一次语音合成任务
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechTask {
    pub index: usize,
    /// 不含扩展名的输出文件名
    pub filename: String,
    pub out_wav: PathBuf,
    pub metadata_path: PathBuf,
}

/// 一次 LLM 调用的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub reasoning_content: Option<String>,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionRecord {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
