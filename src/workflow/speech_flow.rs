//! 语音合成处理流程 - 流程层
//!
//! 流程顺序：
//! 1. 推导输出文件名，续跑检查（wav 已存在则跳过，不读取内容）
//! 2. 校验 `content` 字段并规范化文本
//! 3. 合成（有界重试；演练模式只记录）
//! 4. 写 sidecar 元数据（可选，演练模式同样写入）

use std::path::PathBuf;

use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::TtsConfig;
use crate::models::record::{RecordStatus, ResultRecord, SpeechTask};
use crate::services::naming::{derive_filename, sequence_id};
use crate::services::retry::RetryPolicy;
use crate::services::sidecar::{should_skip, write_metadata_sidecar};
use crate::services::speech::{SpeechEngine, SpeechRequest};
use crate::text::TextNormalizer;
use crate::utils::logging::truncate_text;
use crate::workflow::record_ctx::{ItemOutcome, RecordCtx};

/// 内容缺失时记录的错误
pub const MISSING_CONTENT: &str = "missing_or_empty_content";

/// 语音合成处理流程
///
/// - 持有已完成初始化的引擎
/// - 只处理单条记录
pub struct SpeechFlow {
    engine: Box<dyn SpeechEngine>,
    normalizer: TextNormalizer,
    retry: RetryPolicy,
    output_dir: PathBuf,
    filename_field: Option<String>,
    model_name: String,
    language: String,
    speaker_wav: PathBuf,
    dry_run: bool,
    resume: bool,
    write_metadata: bool,
}

impl SpeechFlow {
    /// 创建新的语音合成流程
    pub fn new(config: &TtsConfig, engine: Box<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            normalizer: TextNormalizer::new(config.expand_acronyms(), config.strip_newlines),
            retry: config.retry_policy(),
            output_dir: config.output_dir.clone(),
            filename_field: config.filename_field.clone(),
            model_name: config.model_name.clone(),
            language: config.language.clone(),
            speaker_wav: config.speaker_wav.clone(),
            dry_run: config.dry_run,
            resume: config.resume,
            write_metadata: config.write_metadata,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 由记录推导输出任务
    pub fn build_task(&self, index: usize, item: &Value) -> SpeechTask {
        let filename = match &self.filename_field {
            Some(field) => derive_filename(index, item, field),
            None => sequence_id(index),
        };
        SpeechTask {
            index,
            out_wav: self.output_dir.join(format!("{}.wav", filename)),
            metadata_path: self.output_dir.join(format!("{}.json", filename)),
            filename,
        }
    }

    pub async fn run(&self, task: &SpeechTask, item: &Value, ctx: &RecordCtx) -> ItemOutcome {
        let started = Instant::now();
        let wav_name = format!("{}.wav", task.filename);

        if should_skip(&task.out_wav, self.resume) {
            info!("{} ⏭️ 已存在 {}，续跑跳过", ctx, task.out_wav.display());
            return ResultRecord::new(task.index, &task.filename, RecordStatus::Skipped).into();
        }

        let content = match item.get("content").and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                warn!("{} ⚠️ 缺少或为空的 content 字段，跳过", ctx);
                return ResultRecord::new(task.index, &task.filename, RecordStatus::Failed)
                    .with_error(MISSING_CONTENT)
                    .into();
            }
        };

        let cleaned = self.normalizer.normalize(content);
        let content_length = cleaned.chars().count();
        info!("{} 📝 {}", ctx, truncate_text(&cleaned, 60));

        if self.dry_run {
            info!("{} 🧪 演练: 将合成到 {}", ctx, task.out_wav.display());
            if self.write_metadata {
                self.write_sidecar(task, content, &cleaned, ctx);
            }
            let record = ResultRecord::new(task.index, &task.filename, RecordStatus::DryRun)
                .with_output(wav_name);
            return ItemOutcome::new(record, content_length);
        }

        let request = SpeechRequest {
            text: &cleaned,
            out_path: &task.out_wav,
            speaker: &task.filename,
        };
        let label = format!("合成 {}", task.out_wav.display());
        let synthesized = self
            .retry
            .run(&label, |_| self.engine.synthesize(&request))
            .await;

        let attempts = match synthesized {
            Ok(done) => done.attempts,
            Err(exhausted) => {
                error!(
                    "{} ❌ 放弃 {} (共尝试 {} 次): {}",
                    ctx,
                    task.out_wav.display(),
                    exhausted.attempts,
                    exhausted.last_error
                );
                let record = ResultRecord::new(task.index, &task.filename, RecordStatus::Failed)
                    .with_error(exhausted.last_error.to_string())
                    .with_attempts(exhausted.attempts)
                    .with_duration(started.elapsed());
                return ItemOutcome::new(record, content_length);
            }
        };
        info!("{} ✓ 已生成 {}", ctx, task.out_wav.display());

        if self.write_metadata {
            self.write_sidecar(task, content, &cleaned, ctx);
        }

        let record = ResultRecord::new(task.index, &task.filename, RecordStatus::Succeeded)
            .with_output(wav_name)
            .with_attempts(attempts)
            .with_duration(started.elapsed());
        ItemOutcome::new(record, content_length)
    }

    fn write_sidecar(&self, task: &SpeechTask, content: &str, cleaned: &str, ctx: &RecordCtx) {
        let meta = json!({
            "index": task.index,
            "filename": format!("{}.wav", task.filename),
            "timestamp": chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            "engine": self.engine.name(),
            "model_name": self.model_name,
            "language": self.language,
            "speaker_wav": self.speaker_wav.display().to_string(),
            "original_content": content,
            "cleaned_content": cleaned,
        });
        if let Err(e) = write_metadata_sidecar(&task.metadata_path, &meta) {
            warn!("{} ⚠️ 写入 sidecar 失败: {}", ctx, e);
        }
    }
}
