//! 批处理运行结果汇总

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::AppResult;
use crate::models::record::{RecordStatus, ResultRecord};
use crate::models::writers::{write_json, write_results_csv};
use crate::services::telemetry::RunRecorder;
use crate::utils::logging::print_final_stats;
use crate::workflow::record_ctx::ItemOutcome;

/// 一次批处理的结果
#[derive(Debug, Default)]
pub struct RunReport {
    pub records: Vec<ResultRecord>,
    /// 成功数（含演练）
    pub successes: usize,
    pub failures: usize,
    pub skipped: usize,
    /// 是否因失败数达到上限而提前结束
    pub aborted: bool,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个条目的结果，并同步到遥测
    pub fn record(&mut self, outcome: ItemOutcome, recorder: Option<&mut RunRecorder>) {
        let ItemOutcome {
            record,
            content_length,
        } = outcome;

        match record.status {
            RecordStatus::Succeeded | RecordStatus::DryRun => {
                self.successes += 1;
                if let Some(recorder) = recorder {
                    let name = record.output.as_deref().unwrap_or(&record.identifier);
                    recorder.on_item_success(
                        record.index,
                        name,
                        Duration::from_secs_f64(record.duration_secs),
                        content_length,
                    );
                }
            }
            RecordStatus::Failed => {
                self.failures += 1;
                if let Some(recorder) = recorder {
                    recorder.on_item_failure(
                        record.index,
                        record.error.as_deref().unwrap_or_default(),
                        record.attempts,
                    );
                }
            }
            RecordStatus::Skipped => self.skipped += 1,
        }

        self.records.push(record);
    }

    /// 写出结果文件（路径未配置则跳过）
    pub fn persist(&self, json_path: Option<&Path>, csv_path: Option<&Path>) -> AppResult<()> {
        if let Some(path) = json_path {
            write_json(path, &self.records)?;
        }
        if let Some(path) = csv_path {
            write_results_csv(path, &self.records)?;
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        if self.aborted {
            info!("⛔ 失败数达到上限，运行提前结束");
        }
        print_final_stats(self.successes, self.failures, self.skipped, self.records.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_status() {
        let mut report = RunReport::new();
        let mut recorder = RunRecorder::new(None, None, Some(1));

        report.record(
            ResultRecord::new(1, "001", RecordStatus::DryRun).into(),
            Some(&mut recorder),
        );
        report.record(ResultRecord::new(2, "002", RecordStatus::Skipped).into(), Some(&mut recorder));
        assert!(!recorder.should_abort());
        report.record(
            ResultRecord::new(3, "003", RecordStatus::Failed).with_error("boom").into(),
            Some(&mut recorder),
        );

        assert_eq!((report.successes, report.failures, report.skipped), (1, 1, 1));
        assert_eq!(report.records.len(), 3);
        assert!(recorder.should_abort());
    }
}
