use std::path::Path;

use serde_json::Value;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult, FileError, InputError};

/// 从 JSON 文件加载记录数组
///
/// # 参数
/// - `path`: JSON 文件路径，顶层必须是数组
/// - `limit`: 可选的最大条数
///
/// # 返回
/// 返回记录列表（保持原顺序）
pub async fn load_json_records(path: &Path, limit: Option<usize>) -> AppResult<Vec<Value>> {
    let display_path = path.display().to_string();
    if !path.exists() {
        return Err(FileError::NotFound { path: display_path }.into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&display_path, e))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| AppError::json_failed(&display_path, e))?;

    let Value::Array(mut records) = value else {
        return Err(InputError::NotAnArray { path: display_path }.into());
    };

    if let Some(limit) = limit {
        records.truncate(limit);
    }

    info!("✓ 从 {} 加载 {} 条记录", display_path, records.len());
    Ok(records)
}
