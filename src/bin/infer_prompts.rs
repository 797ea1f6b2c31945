use anyhow::Result;
use clap::Parser;
use tokio::time::Instant;

use ich_agent_pipeline::utils::logging;
use ich_agent_pipeline::{InferenceConfig, InferenceRunner};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = InferenceConfig::parse().normalized();

    let started = Instant::now();
    InferenceRunner::new(config).run().await?;
    logging::log_elapsed(started.elapsed());

    Ok(())
}
