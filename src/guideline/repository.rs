//! 指南与临床试验文本仓库

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ConfigError, FileError};

/// 内置文本资源
const EMBEDDED_GUIDELINES: &str = include_str!("../../resources/guidelines.toml");

/// 一份带标题的文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineDocument {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct GuidelineFile {
    guideline: GuidelineDocument,
    clinical_trials: GuidelineDocument,
}

/// 提示词引用的指南与临床试验文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidelineRepository {
    guideline: GuidelineDocument,
    clinical_trials: GuidelineDocument,
}

impl GuidelineRepository {
    pub fn new(guideline: GuidelineDocument, clinical_trials: GuidelineDocument) -> Self {
        Self {
            guideline,
            clinical_trials,
        }
    }

    /// 使用随程序打包的文本
    pub fn embedded() -> AppResult<Self> {
        Self::parse(EMBEDDED_GUIDELINES, "<embedded>")
    }

    /// 从 TOML 文件加载
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let display_path = path.display().to_string();
        if !path.exists() {
            return Err(FileError::NotFound { path: display_path }.into());
        }
        let content = fs::read_to_string(path).map_err(|e| AppError::file_read_failed(&display_path, e))?;
        let repo = Self::parse(&content, &display_path)?;
        info!("✓ 已加载指南文本: {}", display_path);
        Ok(repo)
    }

    /// 指定了路径就从文件加载，否则使用内置文本
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                debug!("使用内置指南文本");
                Self::embedded()
            }
        }
    }

    fn parse(content: &str, origin: &str) -> AppResult<Self> {
        let file: GuidelineFile = toml::from_str(content).map_err(|source| FileError::TomlParseFailed {
            path: origin.to_string(),
            source,
        })?;
        Ok(Self::new(file.guideline, file.clinical_trials))
    }

    pub fn guideline(&self) -> &GuidelineDocument {
        &self.guideline
    }

    pub fn clinical_trials(&self) -> &GuidelineDocument {
        &self.clinical_trials
    }

    /// 按名称选择文本，不区分大小写
    pub fn document(&self, source: &str) -> Result<&GuidelineDocument, ConfigError> {
        match source.trim().to_lowercase().as_str() {
            "guideline" | "guidelines" => Ok(&self.guideline),
            "trial" | "trials" | "clinical_trials" => Ok(&self.clinical_trials),
            _ => Err(ConfigError::UnknownSource {
                source_name: source.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_resource_parses() {
        let repo = GuidelineRepository::embedded().unwrap();
        assert!(repo.guideline().title.contains("Spontaneous Intracerebral Hemorrhage"));
        assert!(repo.guideline().body.contains("DIAGNOSIS AND ASSESSMENT"));
        assert_eq!(repo.clinical_trials().title, "Clinical Trials");
        assert!(repo.clinical_trials().body.contains("ENRICH"));
    }

    #[test]
    fn document_aliases() {
        let repo = GuidelineRepository::embedded().unwrap();
        assert_eq!(repo.document("Guidelines").unwrap(), repo.guideline());
        assert_eq!(repo.document("trials").unwrap(), repo.clinical_trials());
        assert!(matches!(
            repo.document("appendix"),
            Err(ConfigError::UnknownSource { .. })
        ));
    }

    #[test]
    fn loads_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[guideline]\ntitle = \"G\"\nbody = \"first\\n\\nsecond\"\n\n[clinical_trials]\ntitle = \"T\"\nbody = \"trial\"\n",
        )
        .unwrap();

        let repo = GuidelineRepository::load(Some(&path)).unwrap();
        assert_eq!(repo.guideline().body, "first\n\nsecond");
        assert_eq!(repo.clinical_trials().title, "T");

        fs::write(&path, "[guideline]\ntitle = \"G\"\n").unwrap();
        assert!(matches!(
            GuidelineRepository::from_path(&path),
            Err(AppError::File(FileError::TomlParseFailed { .. }))
        ));
        assert!(GuidelineRepository::from_path(&dir.path().join("missing.toml")).is_err());
    }
}
