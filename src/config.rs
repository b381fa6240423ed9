use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite 数据库路径
    pub database_path: String,
    /// 外部语法解析程序（程序名 + 参数）
    pub parser_command: Vec<String>,
    /// 文本档案文件的扩展名，其余文件都视为图片
    pub text_extension: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "archive.db".to_string(),
            parser_command: vec!["archive-parser".to_string()],
            text_extension: "txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，缺失的键取默认值，再叠加环境变量
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileUnreadable {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            database_path: std::env::var("ARCHIVE_DATABASE_PATH").unwrap_or(self.database_path),
            parser_command: std::env::var("ARCHIVE_PARSER_CMD")
                .ok()
                .map(|v| split_command(&v))
                .filter(|parts| !parts.is_empty())
                .unwrap_or(self.parser_command),
            text_extension: std::env::var("ARCHIVE_TEXT_EXTENSION").unwrap_or(self.text_extension),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    /// 判断文件名是否为文本档案
    pub fn is_text_file(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.text_extension))
    }
}

/// 按空白切分命令行
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn text_files_are_recognised_by_extension() {
        let config = Config::default();
        assert!(config.is_text_file("3.txt"));
        assert!(config.is_text_file("3.TXT"));
        assert!(!config.is_text_file("3a.png"));
        assert!(!config.is_text_file("txt"));
    }

    #[test]
    fn toml_file_fills_missing_keys_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "text_extension = \"arc\"").unwrap();

        let config: Config = toml::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();

        assert_eq!(config.text_extension, "arc");
        assert_eq!(config.database_path, "archive.db");
        assert_eq!(config.parser_command, vec!["archive-parser".to_string()]);
    }

    #[test]
    fn parser_command_is_split_on_whitespace() {
        assert_eq!(
            split_command("  python -m parsers  "),
            vec!["python".to_string(), "-m".to_string(), "parsers".to_string()]
        );
    }
}
