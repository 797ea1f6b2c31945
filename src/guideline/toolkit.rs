//! 指南文本检索与导出

use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::guideline::repository::GuidelineRepository;

/// 在仓库之上提供按段落检索的能力
#[derive(Debug, Clone, Copy)]
pub struct GuidelineToolkit<'a> {
    repo: &'a GuidelineRepository,
}

/// 按空行切分的非空段落
fn text_blocks(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").map(str::trim).filter(|block| !block.is_empty())
}

impl<'a> GuidelineToolkit<'a> {
    pub fn new(repo: &'a GuidelineRepository) -> Self {
        Self { repo }
    }

    /// 列出某份文本的全部段落
    pub fn list_sections(&self, source: &str) -> AppResult<Vec<String>> {
        let doc = self.repo.document(source)?;
        Ok(text_blocks(&doc.body).map(str::to_string).collect())
    }

    /// 大小写不敏感的子串检索，空查询返回空结果
    pub fn search(&self, query: &str, source: &str) -> AppResult<Vec<String>> {
        let doc = self.repo.document(source)?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text_blocks(&doc.body)
            .filter(|block| block.to_lowercase().contains(&needle))
            .map(str::to_string)
            .collect())
    }

    /// 依次检索指南与临床试验
    pub fn search_all(&self, query: &str) -> AppResult<Vec<String>> {
        let mut results = self.search(query, "guideline")?;
        results.extend(self.search(query, "clinical_trials")?);
        Ok(results)
    }

    /// 导出两份文本（2 空格缩进 JSON）
    pub fn export_json(&self) -> AppResult<String> {
        let payload = json!({
            "guideline": self.repo.guideline(),
            "clinical_trials": self.repo.clinical_trials(),
        });
        serde_json::to_string_pretty(&payload).map_err(|e| AppError::json_failed("<guidelines>", e))
    }
}

/// 取前 `limit` 个段落
pub fn summarize_blocks(blocks: &[String], limit: usize) -> Vec<String> {
    blocks.iter().take(limit).cloned().collect()
}
