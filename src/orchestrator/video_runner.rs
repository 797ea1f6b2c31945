//! 视频批处理器 - 编排层
//!
//! 读取输入、逐条构建任务并委托 `VideoFlow`，负责间隔、遥测和失败上限

use tokio::time::{sleep, Instant};
use tracing::warn;

use crate::config::VideoConfig;
use crate::error::AppResult;
use crate::models::loaders::load_json_records;
use crate::models::record::{RecordStatus, VideoTask};
use crate::orchestrator::run_report::RunReport;
use crate::services::naming::{derive_audio_url, sequence_id};
use crate::services::retry::RetryPolicy;
use crate::services::telemetry::RunRecorder;
use crate::utils::logging::{log_item_start, log_startup};
use crate::workflow::{RecordCtx, VideoFlow};

/// 视频批处理器
pub struct VideoRunner {
    config: VideoConfig,
    flow: VideoFlow,
}

impl VideoRunner {
    pub fn new(config: VideoConfig) -> AppResult<Self> {
        let flow = VideoFlow::new(&config)?;
        Ok(Self { config, flow })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.flow = self.flow.with_retry(retry);
        self
    }

    /// 为第 `index` 条记录构建任务
    pub fn build_task(&self, index: usize) -> VideoTask {
        let speaker_id = sequence_id(index);
        let audio_url = derive_audio_url(&format!("{}.wav", speaker_id), self.config.audio_base_url.as_deref());
        VideoTask {
            index,
            audio_url,
            video_url: self.config.ref_video_path.clone(),
            metadata_path: self.config.metadata_dir.join(format!("{}.json", speaker_id)),
            speaker_id,
        }
    }

    pub async fn run(&self) -> AppResult<RunReport> {
        // 输入只决定任务数量与顺序
        let records = load_json_records(&self.config.text_file, None).await?;
        let total = records.len();
        log_startup("gen_video", total);

        let mut recorder = RunRecorder::create(
            self.config.hooks_log.clone(),
            self.config.run_summary.clone(),
            self.config.max_failures,
        );
        if let Some(recorder) = &recorder {
            recorder.on_run_start(Some(total), &self.config);
        }

        let started = Instant::now();
        let mut report = RunReport::new();

        for index in 1..=total {
            let task = self.build_task(index);
            let ctx = RecordCtx::new(index, total, &task.speaker_id);
            log_item_start(index, total, &task.speaker_id);

            let record = self.flow.run(&task, &ctx).await;
            let paced = !matches!(record.status, RecordStatus::Skipped | RecordStatus::Failed);
            report.record(record.into(), recorder.as_mut());

            if recorder.as_ref().is_some_and(RunRecorder::should_abort) {
                warn!("⛔ 失败数达到上限 {:?}，终止运行", self.config.max_failures);
                report.aborted = true;
                break;
            }

            let pacing = self.config.pacing();
            if paced && !pacing.is_zero() && index < total {
                sleep(pacing).await;
            }
        }

        report.elapsed = started.elapsed();
        if let Some(recorder) = &recorder {
            recorder.finalize(report.successes, report.failures, report.elapsed);
        }
        report.persist(
            self.config.results_json.as_deref(),
            self.config.results_csv.as_deref(),
        )?;
        report.log_summary();
        Ok(report)
    }
}
