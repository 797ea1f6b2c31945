//! 语音批处理器 - 编排层
//!
//! 持有语音引擎：启动前校验参考音频并初始化引擎（失败即终止），
//! 然后逐条委托 `SpeechFlow`

use std::fs;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::clients::VoiceClient;
use crate::config::{EngineKind, TtsConfig};
use crate::error::{AppError, AppResult, SpeechError};
use crate::models::loaders::load_json_records;
use crate::models::record::RecordStatus;
use crate::orchestrator::run_report::RunReport;
use crate::services::retry::RetryPolicy;
use crate::services::speech::{CommandEngine, HttpVoiceEngine, SpeechEngine};
use crate::services::telemetry::RunRecorder;
use crate::utils::logging::{log_item_start, log_startup};
use crate::workflow::{RecordCtx, SpeechFlow};

/// 按配置构建语音引擎
pub fn build_engine(config: &TtsConfig) -> AppResult<Box<dyn SpeechEngine>> {
    let engine: Box<dyn SpeechEngine> = match config.engine {
        EngineKind::Command => Box::new(CommandEngine::new(
            &config.tts_command,
            &config.model_name,
            config.speaker_wav.clone(),
            &config.language,
            config.gpu(),
        )),
        EngineKind::Http => Box::new(HttpVoiceEngine::new(
            VoiceClient::new(&config.voice_base_url, config.http_timeout())?,
            config.speaker_wav.display().to_string(),
            &config.language,
        )),
    };
    Ok(engine)
}

/// 语音批处理器
pub struct TtsRunner {
    config: TtsConfig,
    engine: Option<Box<dyn SpeechEngine>>,
    retry: Option<RetryPolicy>,
}

impl TtsRunner {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            config,
            engine: None,
            retry: None,
        }
    }

    /// 使用外部提供的引擎代替按配置构建的引擎
    pub fn with_engine(mut self, engine: Box<dyn SpeechEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub async fn run(self) -> AppResult<RunReport> {
        let config = self.config;
        fs::create_dir_all(&config.output_dir)
            .map_err(|e| AppError::file_write_failed(config.output_dir.display().to_string(), e))?;

        if !config.speaker_wav.exists() {
            return Err(SpeechError::SpeakerWavMissing {
                path: config.speaker_wav.display().to_string(),
            }
            .into());
        }

        let mut engine = match self.engine {
            Some(engine) => engine,
            None => build_engine(&config)?,
        };
        if config.dry_run {
            info!("🧪 演练模式，不初始化 {} 引擎", engine.name());
        } else {
            engine.prepare().await?;
            info!("✓ {} 引擎已就绪", engine.name());
        }

        let items = load_json_records(&config.input_json, config.limit).await?;
        let total = items.len();
        log_startup("tts_batch", total);

        let mut recorder = RunRecorder::create(
            config.hooks_log.clone(),
            config.run_summary.clone(),
            config.max_failures,
        );
        if let Some(recorder) = &recorder {
            recorder.on_run_start(Some(total), &config);
        }

        let mut flow = SpeechFlow::new(&config, engine);
        if let Some(retry) = self.retry {
            flow = flow.with_retry(retry);
        }

        let started = Instant::now();
        let mut report = RunReport::new();

        for (i, item) in items.iter().enumerate() {
            let index = i + 1;
            let task = flow.build_task(index, item);
            let ctx = RecordCtx::new(index, total, &task.filename);
            log_item_start(index, total, &task.filename);

            let outcome = flow.run(&task, item, &ctx).await;
            let paced = !matches!(outcome.record.status, RecordStatus::Skipped | RecordStatus::Failed);
            report.record(outcome, recorder.as_mut());

            if recorder.as_ref().is_some_and(RunRecorder::should_abort) {
                warn!("⛔ 失败数达到上限 {:?}，终止运行", config.max_failures);
                report.aborted = true;
                break;
            }

            let pacing = config.pacing();
            if paced && !pacing.is_zero() && index < total {
                sleep(pacing).await;
            }
        }

        report.elapsed = started.elapsed();
        if let Some(recorder) = &recorder {
            recorder.finalize(report.successes, report.failures, report.elapsed);
        }
        report.persist(config.results_json.as_deref(), config.results_csv.as_deref())?;
        report.log_summary();
        Ok(report)
    }
}
