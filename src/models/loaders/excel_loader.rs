use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{info, warn};

use crate::error::{AppResult, FileError, InputError};
use crate::models::patient::{PatientCase, COLUMN_OPTIONS};

/// 逻辑字段到列索引的映射，顺序与 `COLUMN_OPTIONS` 一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [usize; 7],
}

impl ColumnMap {
    /// 按候选列名解析表头，缺少任一字段即报错
    pub fn resolve(headers: &[String]) -> Result<Self, InputError> {
        let mut indices = [0usize; 7];
        for (slot, (logical, options)) in COLUMN_OPTIONS.iter().enumerate() {
            let found = options
                .iter()
                .find_map(|option| headers.iter().position(|h| h == option));
            match found {
                Some(index) => indices[slot] = index,
                None => {
                    return Err(InputError::MissingColumn {
                        logical: logical.to_string(),
                        expected: options.iter().map(|o| o.to_string()).collect(),
                        available: headers.join(", "),
                    })
                }
            }
        }
        Ok(Self { indices })
    }

    fn cell<'a>(&self, row: &'a [Data], slot: usize) -> &'a Data {
        row.get(self.indices[slot]).unwrap_or(&Data::Empty)
    }

    /// 把一行数据转换为病例
    pub fn build_case(&self, row_number: usize, row: &[Data]) -> Result<PatientCase, InputError> {
        let volume = |slot: usize| {
            cell_volume(self.cell(row, slot)).ok_or_else(|| InputError::InvalidVolume {
                row: row_number,
                column: COLUMN_OPTIONS[slot].1[0].to_string(),
                value: cell_text(self.cell(row, slot)),
            })
        };

        Ok(PatientCase {
            row: row_number,
            inspection: cell_text(self.cell(row, 0)),
            diagnosis: cell_text(self.cell(row, 1)),
            case_history: cell_text(self.cell(row, 2)),
            examination: cell_text(self.cell(row, 3)),
            vol1: volume(4)?,
            vol2: volume(5)?,
            vol3: volume(6)?,
        })
    }
}

/// 从 Excel 工作表加载病例
///
/// # 参数
/// - `path`: Excel 文件路径
/// - `sheet_index`: 工作表索引（从 0 开始）
/// - `limit`: 可选的最大行数
///
/// # 返回
/// 表头缺列时整体失败；单行数据无效时该行为 `Err`，由调用方跳过
pub fn load_patient_cases(
    path: &Path,
    sheet_index: usize,
    limit: Option<usize>,
) -> AppResult<Vec<Result<PatientCase, InputError>>> {
    let display_path = path.display().to_string();
    if !path.exists() {
        return Err(FileError::NotFound { path: display_path }.into());
    }

    let mut workbook = open_workbook_auto(path).map_err(|source| FileError::ExcelReadFailed {
        path: display_path.clone(),
        source,
    })?;
    let range = workbook
        .worksheet_range_at(sheet_index)
        .ok_or_else(|| InputError::SheetNotFound {
            path: display_path.clone(),
            index: sheet_index,
        })?
        .map_err(|source| FileError::ExcelReadFailed {
            path: display_path.clone(),
            source,
        })?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|c| cell_text(c).trim().to_string()).collect())
        .unwrap_or_default();
    let columns = ColumnMap::resolve(&headers)?;

    let cases: Vec<_> = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, row)| columns.build_case(i + 1, row))
        .collect();

    let invalid = cases.iter().filter(|c| c.is_err()).count();
    if invalid > 0 {
        warn!("⚠️ {} 中有 {} 行数据无效", display_path, invalid);
    }
    info!("✓ 从 {} 加载 {} 行病例", display_path, cases.len());

    Ok(cases)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_volume(cell: &Data) -> Option<f64> {
    match cell {
        Data::Empty => Some(0.0),
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) if s.trim().is_empty() => Some(0.0),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
