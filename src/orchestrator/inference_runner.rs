//! 病例推理批处理器 - 编排层
//!
//! 读取 Excel 病例，逐行委托 `InferenceFlow`，最后写出患者/医生两组结果

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::clients::LlmClient;
use crate::config::InferenceConfig;
use crate::error::{AppError, AppResult};
use crate::guideline::GuidelineRepository;
use crate::models::loaders::load_patient_cases;
use crate::models::record::CompletionRecord;
use crate::models::writers::{write_completions_csv, write_completions_xlsx, write_json};
use crate::services::prompt::{PromptGenerator, PromptPair};
use crate::services::retry::RetryPolicy;
use crate::utils::logging::{log_item_start, log_startup, print_final_stats};
use crate::workflow::{InferenceFlow, RecordCtx};

/// prompts.json 中的一项
#[derive(Debug, Clone, Serialize)]
pub struct PromptEntry {
    pub row: usize,
    #[serde(flatten)]
    pub prompts: PromptPair,
}

/// 一次推理批处理的结果，两组结果与输入行一一对应
#[derive(Debug, Default)]
pub struct InferenceReport {
    pub patient_results: Vec<CompletionRecord>,
    pub doctor_results: Vec<CompletionRecord>,
    pub prompts: Vec<PromptEntry>,
    /// 数据无效而未调用 LLM 的行数
    pub invalid_rows: usize,
    pub elapsed: Duration,
}

impl InferenceReport {
    /// 任一结果带错误的行数
    pub fn failed_rows(&self) -> usize {
        self.patient_results
            .iter()
            .zip(&self.doctor_results)
            .filter(|(p, d)| p.error.is_some() || d.error.is_some())
            .count()
    }
}

/// 病例推理批处理器
pub struct InferenceRunner {
    config: InferenceConfig,
    retry: RetryPolicy,
}

impl InferenceRunner {
    pub fn new(config: InferenceConfig) -> Self {
        let retry = config.retry_policy();
        Self { config, retry }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn run(&self) -> AppResult<InferenceReport> {
        let repo = GuidelineRepository::load(self.config.guidelines.as_deref())?;
        let cases = load_patient_cases(
            &self.config.data_path,
            self.config.sheet_index,
            self.config.limit_rows,
        )?;
        let total = cases.len();
        log_startup("infer_prompts", total);

        let flow = InferenceFlow::new(
            LlmClient::new(&self.config)?,
            PromptGenerator::new(&repo, self.config.prompt_language),
            self.retry,
            self.config.dry_run,
        );

        let started = Instant::now();
        let mut report = InferenceReport::default();

        for (i, case) in cases.iter().enumerate() {
            let index = i + 1;
            let ctx = RecordCtx::new(index, total, format!("row {}", index));
            log_item_start(index, total, &ctx.identifier);

            match case {
                Ok(case) => {
                    let outcome = flow.run(case, &ctx).await;
                    report.prompts.push(PromptEntry {
                        row: case.row,
                        prompts: outcome.prompts,
                    });
                    report.patient_results.push(outcome.patient);
                    report.doctor_results.push(outcome.doctor);
                }
                Err(e) => {
                    warn!("{} ⚠️ 数据无效，跳过: {}", ctx, e);
                    report.invalid_rows += 1;
                    report.patient_results.push(CompletionRecord::failed(e.to_string()));
                    report.doctor_results.push(CompletionRecord::failed(e.to_string()));
                }
            }
        }

        report.elapsed = started.elapsed();
        self.persist(&report)?;

        let failed = report.failed_rows();
        print_final_stats(total - failed, failed, 0, total);
        Ok(report)
    }

    fn persist(&self, report: &InferenceReport) -> AppResult<()> {
        let dir = self.config.output_dir.as_path();
        fs::create_dir_all(dir).map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))?;

        write_group(dir, "patient_results", &report.patient_results)?;
        write_group(dir, "doctor_results", &report.doctor_results)?;

        if self.config.save_prompts || self.config.dry_run {
            write_json(&dir.join("prompts.json"), &report.prompts)?;
        }
        info!("✓ 结果已保存至 {}", dir.display());
        Ok(())
    }
}

fn write_group(dir: &Path, stem: &str, records: &[CompletionRecord]) -> AppResult<()> {
    write_json(&dir.join(format!("{}.json", stem)), records)?;
    write_completions_csv(&dir.join(format!("{}.csv", stem)), records)?;
    write_completions_xlsx(&dir.join(format!("{}.xlsx", stem)), records)?;
    Ok(())
}
