//! 任务标识与文件名推导

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid regex"));
static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

const MAX_FILENAME_CHARS: usize = 64;

/// 以序号生成的标识，例如 1 -> "001"
pub fn sequence_id(index: usize) -> String {
    format!("{:03}", index)
}

/// 由记录中的字段推导输出文件名（不含扩展名）
///
/// 字段缺失、不是字符串或为空白时退回到序号命名
pub fn derive_filename(index: usize, record: &Value, field: &str) -> String {
    match record.get(field).and_then(Value::as_str).map(str::trim) {
        Some(value) if !value.is_empty() => sanitize_filename(value),
        _ => sequence_id(index),
    }
}

/// 清理文件名中的非法字符
pub fn sanitize_filename(name: &str) -> String {
    let normalized: String = name.nfkd().collect();
    let replaced = FORBIDDEN_CHARS.replace_all(&normalized, "_");
    let replaced = WHITESPACE_RUNS.replace_all(&replaced, "_");
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '_');
    let shortened: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();
    if shortened.is_empty() {
        "unnamed".to_string()
    } else {
        shortened
    }
}

/// 拼接音频地址；未配置前缀时直接使用文件名
pub fn derive_audio_url(filename: &str, base_url: Option<&str>) -> String {
    match base_url.filter(|b| !b.is_empty()) {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), filename),
        None => filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequence_ids_are_zero_padded() {
        assert_eq!(sequence_id(1), "001");
        assert_eq!(sequence_id(42), "042");
        assert_eq!(sequence_id(1234), "1234");
    }

    #[test]
    fn filename_falls_back_to_index() {
        let record = json!({"name": "  ", "id": 7});
        assert_eq!(derive_filename(3, &record, "name"), "003");
        assert_eq!(derive_filename(3, &record, "id"), "003");
        assert_eq!(derive_filename(3, &record, "missing"), "003");
    }

    #[test]
    fn filename_is_sanitized() {
        let record = json!({"name": " Zhang San: case/01?  "});
        assert_eq!(derive_filename(1, &record, "name"), "Zhang_San__case_01");
        assert_eq!(sanitize_filename("***"), "unnamed");
        assert_eq!(sanitize_filename(&"a".repeat(100)).chars().count(), 64);
    }

    #[test]
    fn audio_url_joins_base() {
        assert_eq!(derive_audio_url("001.wav", None), "001.wav");
        assert_eq!(derive_audio_url("001.wav", Some("http://h/audio/")), "http://h/audio/001.wav");
        assert_eq!(derive_audio_url("001.wav", Some("")), "001.wav");
    }
}
