//! 条目处理上下文
//!
//! 封装"我正在处理第几条记录"这一信息

use std::fmt::Display;

use crate::models::record::ResultRecord;

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct RecordCtx {
    /// 条目序号（从 1 开始）
    pub index: usize,

    /// 条目总数（仅用于日志显示）
    pub total: usize,

    /// 条目标识（任务编码或输出文件名）
    pub identifier: String,
}

impl RecordCtx {
    /// 创建新的条目上下文
    pub fn new(index: usize, total: usize, identifier: impl Into<String>) -> Self {
        Self {
            index,
            total,
            identifier: identifier.into(),
        }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[条目 {}/{} #{}]", self.index, self.total, self.identifier)
    }
}

/// 单条记录的处理结果，附带遥测需要的内容长度
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub record: ResultRecord,
    pub content_length: usize,
}

impl ItemOutcome {
    pub fn new(record: ResultRecord, content_length: usize) -> Self {
        Self {
            record,
            content_length,
        }
    }
}

impl From<ResultRecord> for ItemOutcome {
    fn from(record: ResultRecord) -> Self {
        Self::new(record, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_position_and_identifier() {
        assert_eq!(RecordCtx::new(2, 10, "002").to_string(), "[条目 2/10 #002]");
    }
}
