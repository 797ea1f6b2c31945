//! 元数据 sidecar 与断点续跑 - 业务能力层
//!
//! 只负责"写 sidecar"和"判断产物是否已存在"，不关心流程

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// 续跑模式下，产物已存在则跳过
pub fn should_skip(artifact: &Path, resume: bool) -> bool {
    resume && artifact.exists()
}

/// 写入 sidecar 元数据（格式化 JSON，必要时创建父目录）
pub fn write_metadata_sidecar<T: Serialize>(path: &Path, data: &T) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }

    let body = serde_json::to_string_pretty(data)
        .map_err(|e| AppError::json_failed(path.display().to_string(), e))?;
    fs::write(path, body).map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    debug!("已写入 sidecar: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skip_requires_resume_and_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("001.json");

        assert!(!should_skip(&artifact, true));
        fs::write(&artifact, "{}").unwrap();
        assert!(should_skip(&artifact, true));
        assert!(!should_skip(&artifact, false));
    }

    #[test]
    fn sidecar_creates_parent_and_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("002.json");

        write_metadata_sidecar(&path, &json!({"speaker_id": "002", "note": "脑出血"})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("脑出血"));
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["speaker_id"], "002");
    }
}
