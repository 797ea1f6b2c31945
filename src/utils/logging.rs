/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志输出
///
/// 优先读取 `RUST_LOG`，未设置时默认 `info`。重复调用无副作用。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `job`: 任务名称
/// - `total`: 待处理条目数
pub fn log_startup(job: &str, total: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 {} 启动", job);
    info!(
        "开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📋 待处理条目: {}", total);
    info!("{}", "=".repeat(60));
}

/// 记录单个条目开始处理
///
/// # 参数
/// - `index`: 条目序号（从 1 开始）
/// - `total`: 条目总数
/// - `identifier`: 条目标识
pub fn log_item_start(index: usize, total: usize, identifier: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📄 [{}/{}] 处理 {}", index, total, identifier);
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `skipped`: 跳过数量
/// - `total`: 总数
pub fn print_final_stats(success: usize, failed: usize, skipped: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("⏭️ 跳过: {}", skipped);
    info!("{}", "=".repeat(60));
}

/// 输出总耗时
pub fn log_elapsed(elapsed: Duration) {
    info!("⏱️ 总耗时 {:.6} 秒", elapsed.as_secs_f64());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_text("脑出血患者", 3), "脑出血...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
