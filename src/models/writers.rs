//! 结果输出：JSON / CSV / Excel

use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult, FileError};
use crate::models::record::{CompletionRecord, ResultRecord};

/// Excel 单元格最多容纳的字符数
const XLSX_CELL_LIMIT: usize = 32_767;

fn ensure_parent(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }
    Ok(())
}

/// 以 4 空格缩进写出 JSON（保留非 ASCII 字符）
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> AppResult<()> {
    ensure_parent(path)?;
    let display_path = path.display().to_string();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)
        .map_err(|e| AppError::json_failed(&display_path, e))?;

    fs::write(path, buf).map_err(|e| AppError::file_write_failed(&display_path, e))?;
    info!("💾 已写入 {}", display_path);
    Ok(())
}

fn csv_error(path: &Path, source: csv::Error) -> AppError {
    FileError::CsvWriteFailed {
        path: path.display().to_string(),
        source,
    }
    .into()
}

/// 写出批处理结果表
pub fn write_results_csv(path: &Path, records: &[ResultRecord]) -> AppResult<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    writer
        .write_record([
            "index",
            "identifier",
            "status",
            "output",
            "error",
            "attempts",
            "duration_secs",
            "poll",
        ])
        .map_err(|e| csv_error(path, e))?;

    for record in records {
        writer
            .write_record([
                record.index.to_string(),
                record.identifier.clone(),
                record.status.as_str().to_string(),
                record.output.clone().unwrap_or_default(),
                record.error.clone().unwrap_or_default(),
                record.attempts.to_string(),
                format!("{:.4}", record.duration_secs),
                record.poll.map(|p| p.as_str().to_string()).unwrap_or_default(),
            ])
            .map_err(|e| csv_error(path, e))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    info!("💾 已写入 {}", path.display());
    Ok(())
}

/// 写出 LLM 结果表（CSV）
pub fn write_completions_csv(path: &Path, records: &[CompletionRecord]) -> AppResult<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    writer
        .write_record(["reasoning_content", "content", "error"])
        .map_err(|e| csv_error(path, e))?;
    for record in records {
        writer
            .write_record([
                record.reasoning_content.as_deref().unwrap_or_default(),
                record.content.as_deref().unwrap_or_default(),
                record.error.as_deref().unwrap_or_default(),
            ])
            .map_err(|e| csv_error(path, e))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    info!("💾 已写入 {}", path.display());
    Ok(())
}

/// 写出 LLM 结果表（Excel），超长内容按单元格上限截断
pub fn write_completions_xlsx(path: &Path, records: &[CompletionRecord]) -> AppResult<()> {
    ensure_parent(path)?;
    let xlsx_error = |source| -> AppError {
        FileError::ExcelWriteFailed {
            path: path.display().to_string(),
            source,
        }
        .into()
    };

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in ["reasoning_content", "content", "error"].iter().enumerate() {
        sheet.write_string(0, col as u16, *name).map_err(xlsx_error)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        let cells = [&record.reasoning_content, &record.content, &record.error];
        for (col, cell) in cells.iter().enumerate() {
            if let Some(text) = cell {
                sheet
                    .write_string(row, col as u16, &fit_cell(text))
                    .map_err(xlsx_error)?;
            }
        }
    }

    workbook.save(path).map_err(xlsx_error)?;
    info!("💾 已写入 {}", path.display());
    Ok(())
}

fn fit_cell(text: &str) -> String {
    if text.chars().count() > XLSX_CELL_LIMIT {
        text.chars().take(XLSX_CELL_LIMIT).collect()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::RecordStatus;
    use crate::services::poller::PollOutcome;
    use calamine::{open_workbook_auto, Reader};

    #[test]
    fn json_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("r.json");
        write_json(&path, &vec![CompletionRecord::failed("超时")]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    {"));
        assert!(text.contains("超时"));
    }

    #[test]
    fn results_csv_has_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let records = vec![
            ResultRecord::new(1, "001", RecordStatus::Succeeded).with_poll(PollOutcome::Completed),
            ResultRecord::new(2, "002", RecordStatus::Failed).with_error("timeout, retry"),
        ];
        write_results_csv(&path, &records).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][7], "completed");
        assert_eq!(&rows[1][2], "failed");
        assert_eq!(&rows[1][4], "timeout, retry");
    }

    #[test]
    fn completions_round_trip_through_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patient_results.xlsx");
        let records = vec![
            CompletionRecord {
                reasoning_content: Some("think".into()),
                content: Some("answer".into()),
                error: None,
            },
            CompletionRecord::failed("boom"),
        ];
        write_completions_xlsx(&path, &records).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.get_value((1, 1)).unwrap().to_string(), "answer");
        assert_eq!(range.get_value((2, 2)).unwrap().to_string(), "boom");
    }
}
