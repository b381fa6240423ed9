/// 日志工具模块
///
/// 提供日志初始化以及导入过程中的格式化输出
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::orchestrator::ImportSummary;

/// 初始化全局日志订阅器
///
/// `RUST_LOG` 优先；否则默认 `info`，`verbose` 时为 `debug`。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // 重复初始化（例如测试中）直接忽略
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 记录导入启动信息
pub fn log_startup(directory: &str, title: &str, file_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始导入试卷目录: {}", directory);
    info!("📄 试卷标题: {}", title);
    info!("📋 待处理文件: {} 个", file_count);
    info!("{}", "=".repeat(60));
}

/// 记录单个文本文件开始处理
pub fn log_textfile_start(group_order: u32, filename: &str) {
    info!("\n{}", "─".repeat(30));
    info!("📦 导入第 {} 组: {}", group_order, filename);
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &ImportSummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 导入完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 题组: {}", summary.groups);
    info!("✅ 题目: {} / 引言: {}", summary.questions, summary.introductions);
    info!("🖼️ 已绑定图片: {}", summary.figures_bound);
    if summary.dangling_figures > 0 || summary.unfulfilled_expectations > 0 {
        info!(
            "⚠️ 悬空图片: {} / 未满足的图片期望: {}",
            summary.dangling_figures, summary.unfulfilled_expectations
        );
    }
    if summary.content_warnings > 0 {
        info!("⚠️ 内容警告: {}", summary.content_warnings);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_text;

    #[test]
    fn truncate_text_counts_characters_not_bytes() {
        assert_eq!(truncate_text("Vraag één", 5), "Vraag...");
        assert_eq!(truncate_text("kort", 10), "kort");
    }
}
