//! 患者病例数据

use serde::Serialize;

/// 病例字段的逻辑名与候选列名（英文表头优先，中文表头兜底）
pub const COLUMN_OPTIONS: [(&str, &[&str]); 7] = [
    ("inspection", &["Imaging findings", "检查所见"]),
    ("diagnosis", &["Impression", "诊断结论"]),
    ("case_history", &["Medical history", "病历"]),
    ("examination", &["Laboratory Tests", "检验"]),
    ("vol1", &["label_1_volume_mL"]),
    ("vol2", &["label_2_volume_mL"]),
    ("vol3", &["label_3_volume_mL"]),
];

/// 一行病例数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientCase {
    /// 数据行号（从 1 开始，不含表头）
    pub row: usize,
    /// 检查所见
    pub inspection: String,
    /// 诊断结论
    pub diagnosis: String,
    /// 病历
    pub case_history: String,
    /// 检验
    pub examination: String,
    /// 脑实质出血体积 (mL)
    pub vol1: f64,
    /// 脑室积血体积 (mL)
    pub vol2: f64,
    /// 血肿周围水肿体积 (mL)
    pub vol3: f64,
}

/// 体积显示：0 显示为 N/A，其余保留两位小数
pub fn format_volume(value: f64) -> String {
    if value == 0.0 {
        return "N/A".to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1} mL", rounded)
    } else {
        format!("{} mL", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_formatting() {
        assert_eq!(format_volume(0.0), "N/A");
        assert_eq!(format_volume(12.0), "12.0 mL");
        assert_eq!(format_volume(12.345678), "12.35 mL");
        assert_eq!(format_volume(3.1), "3.1 mL");
    }
}
