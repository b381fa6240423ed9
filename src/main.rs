use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use question_archive_import::config::split_command;
use question_archive_import::utils::logging;
use question_archive_import::{
    import_directory, CommandParser, Config, FileOrder, ImportRequest, SqliteStore,
};

/// 把试题档案目录导入数据库
#[derive(Parser, Debug)]
#[command(name = "question-archive-import")]
#[command(about = "Import a directory of legacy exam archive files")]
#[command(version)]
struct Cli {
    /// 档案目录
    directory: PathBuf,

    /// 试卷标题（缺省等于年份）
    #[arg(long)]
    title: Option<String>,

    /// 试卷年份（缺省取目录名）
    #[arg(long)]
    year: Option<String>,

    /// 从标准输入读取文件顺序，每行一个文件名
    #[arg(long)]
    order_by_stdin: bool,

    /// SQLite 数据库路径
    #[arg(long)]
    database: Option<PathBuf>,

    /// TOML 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 外部语法解析命令
    #[arg(long)]
    parser: Option<String>,

    /// 显示详细日志
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)
                .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
            None => Config::from_env(),
        };
        if let Some(database) = &self.database {
            config.database_path = database.display().to_string();
        }
        if let Some(parser) = &self.parser {
            config.parser_command = split_command(parser);
        }
        config.verbose_logging |= self.verbose;
        Ok(config)
    }
}

/// 从标准输入读取文件顺序，忽略空行
fn read_order_from_stdin() -> Result<Vec<String>> {
    let mut files = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("读取标准输入失败")?;
        let name = line.trim();
        if !name.is_empty() {
            files.push(name.to_string());
        }
    }
    Ok(files)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let file_order = if cli.order_by_stdin {
        FileOrder::Explicit(read_order_from_stdin()?)
    } else {
        FileOrder::Filenames
    };
    let request = ImportRequest {
        directory: cli.directory.clone(),
        title: cli.title.clone(),
        year: cli.year.clone(),
        file_order,
    };

    let mut store = SqliteStore::open(Path::new(&config.database_path))
        .with_context(|| format!("无法打开数据库: {}", config.database_path))?;
    let parser = CommandParser::from_command(&config.parser_command)?;

    let summary = import_directory(&mut store, &parser, &config, request)
        .await
        .with_context(|| format!("导入失败: {}", cli.directory.display()))?;

    logging::print_final_stats(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse_after_directory() {
        let cli = Cli::try_parse_from([
            "question-archive-import",
            "archive/2016",
            "--title",
            "Voorronde",
            "--order-by-stdin",
            "--parser",
            "python3 -m archive_grammar",
        ])
        .unwrap();
        assert_eq!(cli.directory, PathBuf::from("archive/2016"));
        assert_eq!(cli.title.as_deref(), Some("Voorronde"));
        assert!(cli.order_by_stdin);
        assert!(!cli.verbose);

        let config = cli.load_config().unwrap();
        assert_eq!(config.parser_command, vec!["python3", "-m", "archive_grammar"]);
    }
}
