use thiserror::Error;

/// 导入程序错误类型
///
/// 所有致命错误都会中止整个导入并回滚，软错误只记录日志，不走这里。
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 解析树结构错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 题组谱系解析错误
    #[error("谱系错误: {0}")]
    Lineage(#[from] LineageError),
    /// 存储层错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录无法读取
    #[error("无法读取目录 {path}: {source}")]
    DirectoryUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 图片出现在任何文本文件之前
    #[error("图片 {filename} 之前没有任何文本文件")]
    FigureWithoutGroup { filename: String },
}

/// 解析树结构错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// 两种内容标记都不存在
    #[error("解析树中没有已知的内容类型")]
    MissingContent,
    /// 两种内容标记同时存在
    #[error("解析树同时包含 plain 与 markup 内容")]
    AmbiguousContent,
    /// plain 内容为空
    #[error("plain 内容中没有任何文本块")]
    EmptyPlainContent,
    /// markup 子树数量与源码片段数量不一致
    #[error("markup 子树数量 {blocks} 与源码片段数量 {sources} 不一致")]
    SourceCountMismatch { blocks: usize, sources: usize },
    /// 第 1 块之外出现无法分类的块
    #[error("第 {index} 块既不是题目也不是引言")]
    UnclassifiedBlock { index: usize },
    /// 外部语法程序执行失败
    #[error("外部解析程序 {program} 失败: {message}")]
    ParserFailed { program: String, message: String },
    /// 解析树 JSON 无法反序列化
    #[error("解析树 JSON 无效: {0}")]
    InvalidTree(#[from] serde_json::Error),
}

/// 题组谱系解析错误
#[derive(Debug, Error)]
pub enum LineageError {
    /// 复用声明找不到祖先题组
    #[error("找不到祖先题组: 试卷 \"{title}\" 第 {order} 组")]
    AncestorNotFound { title: String, order: u32 },
    /// 复用声明匹配到多个祖先题组
    #[error("祖先题组不唯一: 试卷 \"{title}\" 第 {order} 组匹配到 {count} 个")]
    AmbiguousAncestor {
        title: String,
        order: u32,
        count: usize,
    },
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite 操作失败
    #[error("SQLite 操作失败: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// 暂存图中引用了不存在的实体
    #[error("暂存图引用了未知的 {entity} #{index}")]
    DanglingReference { entity: &'static str, index: usize },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 年份无法解析
    #[error("年份 '{value}' 不是有效的整数年份")]
    InvalidYear { value: String },
    /// 目录路径没有可用的最后一段
    #[error("无法从目录 {path} 推导年份")]
    NoDirectoryName { path: String },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败: {0}")]
    TomlParseFailed(#[from] toml::de::Error),
    /// 外部解析命令为空
    #[error("外部解析命令为空")]
    EmptyParserCommand,
}

// ========== 从常见错误类型转换 ==========

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Store(StoreError::Sqlite(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(ParseError::InvalidTree(err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建目录读取错误
    pub fn directory_unreadable(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::DirectoryUnreadable {
            path: path.into(),
            source,
        })
    }

    /// 创建外部解析程序错误
    pub fn parser_failed(program: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Parse(ParseError::ParserFailed {
            program: program.into(),
            message: message.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
