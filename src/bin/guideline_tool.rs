use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ich_agent_pipeline::guideline::{summarize_blocks, GuidelineRepository, GuidelineToolkit};
use ich_agent_pipeline::utils::logging;
use ich_agent_pipeline::GuidelineToolConfig;

fn main() -> Result<()> {
    logging::init();
    let config = GuidelineToolConfig::parse();

    let repo = GuidelineRepository::load(config.guidelines.as_deref())?;
    let toolkit = GuidelineToolkit::new(&repo);

    if let Some(path) = &config.export {
        let body = toolkit.export_json()?;
        fs::write(path, body).with_context(|| format!("无法写入 {}", path.display()))?;
        info!("💾 已导出指南文本到 {}", path.display());
    }

    let blocks = match (&config.search, &config.source) {
        (Some(query), Some(source)) => toolkit.search(query, source)?,
        (Some(query), None) => toolkit.search_all(query)?,
        (None, source) if config.list => {
            toolkit.list_sections(source.as_deref().unwrap_or("guideline"))?
        }
        _ => return Ok(()),
    };

    info!("找到 {} 个段落，显示前 {} 个", blocks.len(), config.limit.min(blocks.len()));
    for (i, block) in summarize_blocks(&blocks, config.limit).iter().enumerate() {
        println!("[{}] {}\n", i + 1, block);
    }
    Ok(())
}
