use anyhow::Result;
use clap::Parser;
use tokio::time::Instant;

use ich_agent_pipeline::utils::logging;
use ich_agent_pipeline::{VideoConfig, VideoRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = VideoConfig::parse().normalized();

    let started = Instant::now();
    VideoRunner::new(config)?.run().await?;
    logging::log_elapsed(started.elapsed());

    Ok(())
}
