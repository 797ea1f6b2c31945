//! 视频任务处理流程 - 流程层
//!
//! 流程顺序：
//! 1. 续跑检查（sidecar 已存在则跳过）
//! 2. 提交（有界重试；演练模式只记录）
//! 3. 写 sidecar 元数据（可选，演练模式同样写入）
//! 4. 轮询进度（可选，演练模式不轮询）

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::clients::VideoClient;
use crate::config::VideoConfig;
use crate::error::AppResult;
use crate::models::record::{RecordStatus, ResultRecord, VideoTask};
use crate::services::poller::{poll_until_complete, CompletionMatcher};
use crate::services::retry::RetryPolicy;
use crate::services::sidecar::{should_skip, write_metadata_sidecar};
use crate::workflow::record_ctx::RecordCtx;

/// 视频任务处理流程
///
/// - 只处理单个 `VideoTask`
/// - 不关心条目之间的间隔与失败上限
pub struct VideoFlow {
    client: VideoClient,
    retry: RetryPolicy,
    matcher: CompletionMatcher,
    poll_interval: Duration,
    poll_timeout: Duration,
    submit_url: String,
    dry_run: bool,
    resume: bool,
    write_metadata: bool,
    poll_progress: bool,
}

impl VideoFlow {
    /// 创建新的视频处理流程
    pub fn new(config: &VideoConfig) -> AppResult<Self> {
        Ok(Self {
            client: VideoClient::new(&config.submit_url, &config.query_url_base, config.http_timeout())?,
            retry: config.retry_policy(),
            matcher: config.completion_matcher(),
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            submit_url: config.submit_url.clone(),
            dry_run: config.dry_run,
            resume: config.resume,
            write_metadata: config.write_metadata,
            poll_progress: config.poll_progress,
        })
    }

    /// 替换重试策略（测试中用于去掉退避等待）
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn run(&self, task: &VideoTask, ctx: &RecordCtx) -> ResultRecord {
        let started = Instant::now();

        if should_skip(&task.metadata_path, self.resume) {
            info!("{} ⏭️ 已存在 {}，续跑跳过", ctx, task.metadata_path.display());
            return ResultRecord::new(task.index, &task.speaker_id, RecordStatus::Skipped);
        }

        if self.dry_run {
            info!(
                "{} 🧪 演练提交: audio={} video={} code={}",
                ctx, task.audio_url, task.video_url, task.speaker_id
            );
            if self.write_metadata {
                self.write_sidecar(task, ctx);
            }
            return ResultRecord::new(task.index, &task.speaker_id, RecordStatus::DryRun)
                .with_output(&task.speaker_id);
        }

        info!("{} 📤 提交视频合成任务", ctx);
        let label = format!("提交任务 {}", task.speaker_id);
        let submitted = self
            .retry
            .run(&label, |_| self.client.submit(task))
            .await;

        let attempts = match submitted {
            Ok(done) => done.attempts,
            Err(exhausted) => {
                error!(
                    "{} ❌ 提交失败 (共尝试 {} 次): {}",
                    ctx, exhausted.attempts, exhausted.last_error
                );
                return ResultRecord::new(task.index, &task.speaker_id, RecordStatus::Failed)
                    .with_error(exhausted.last_error.to_string())
                    .with_attempts(exhausted.attempts)
                    .with_duration(started.elapsed());
            }
        };
        let task_code = task.speaker_id.as_str();
        info!("{} ✓ 已提交，任务编码 {}", ctx, task_code);

        if self.write_metadata {
            self.write_sidecar(task, ctx);
        }

        let mut record = ResultRecord::new(task.index, &task.speaker_id, RecordStatus::Succeeded)
            .with_output(task_code)
            .with_attempts(attempts);

        if self.poll_progress {
            info!("{} ⏳ 轮询任务进度", ctx);
            let outcome = poll_until_complete(
                &self.client,
                task_code,
                &self.matcher,
                self.poll_interval,
                self.poll_timeout,
            )
            .await;
            record = record.with_poll(outcome);
        }

        record.with_duration(started.elapsed())
    }

    fn write_sidecar(&self, task: &VideoTask, ctx: &RecordCtx) {
        let meta = json!({
            "speaker_id": task.speaker_id,
            "audio": task.audio_url,
            "video": task.video_url,
            "submit_url": self.submit_url,
            "timestamp": chrono::Local::now().to_rfc3339(),
        });
        if let Err(e) = write_metadata_sidecar(&task.metadata_path, &meta) {
            warn!("{} ⚠️ 写入 sidecar 失败: {}", ctx, e);
        }
    }
}
