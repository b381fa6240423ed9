//! 外部语法解析器 - 基础设施层
//!
//! 档案语法本身不在本 crate 内实现，这里只暴露"把文本交给语法层，拿回解析树"的能力

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{AppError, AppResult, ConfigError};
use crate::models::RawParseTree;

/// 档案语法层
#[allow(async_fn_in_trait)]
pub trait ArchiveParser {
    /// 解析整个文本档案
    async fn parse_document(&self, text: &str) -> AppResult<RawParseTree>;

    /// 把 markup 档案切分为每块的原始源码片段，与解析树中的块一一对应
    async fn parse_sources(&self, text: &str) -> AppResult<Vec<String>>;
}

/// 调用外部程序的解析器
///
/// 以 `<program> <args..> <mode>` 启动，档案文本写入标准输入，
/// 从标准输出读取 JSON。`mode` 为 `document` 或 `sources`。
pub struct CommandParser {
    program: String,
    args: Vec<String>,
}

impl CommandParser {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// 从配置中的命令行构造
    pub fn from_command(command: &[String]) -> AppResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or(ConfigError::EmptyParserCommand)?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    fn failed(&self, message: impl Into<String>) -> AppError {
        AppError::parser_failed(&self.program, message)
    }

    /// 运行外部程序并返回 JSON 结果
    ///
    /// 写标准输入与读标准输出同时进行，语法层边读边写时管道不会被塞满。
    async fn run(&self, mode: &str, text: &str) -> AppResult<JsonValue> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(mode)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failed(e.to_string()))?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(text.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| self.failed(e.to_string()))?;

        if !output.status.success() {
            return Err(self.failed(format!(
                "{} 模式退出码 {:?}: {}",
                mode,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        // 语法层不读完输入就正常退出时，只会得到 BrokenPipe
        match fed {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(self.failed(e.to_string())),
            _ => {}
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// 运行外部程序并反序列化为指定类型
    async fn run_as<T: DeserializeOwned>(&self, mode: &str, text: &str) -> AppResult<T> {
        let json_value = self.run(mode, text).await?;
        Ok(serde_json::from_value(json_value)?)
    }
}

impl ArchiveParser for CommandParser {
    async fn parse_document(&self, text: &str) -> AppResult<RawParseTree> {
        self.run_as("document", text).await
    }

    async fn parse_sources(&self, text: &str) -> AppResult<Vec<String>> {
        self.run_as("sources", text).await
    }
}
