//! # Question Archive Import
//!
//! 把旧版试题档案目录（plain / markup 两种文本方言，加上散落的图片文件）
//! 导入为带版本、保持顺序的实体图，并一次性写入关系存储
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源，只暴露能力
//! - `ArchiveParser` - 外部语法层，把文本变成解析树
//! - `Store` - 只读查询（类别、人员、谱系）+ 单事务写入
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `CategoryCache` / `PersonCache` - 运行级的按名缓存
//! - `lineage` - 作者修订与题组谱系
//! - `figure_binder` - 图片与块的按位置绑定
//! - `filename_order` - 由文件名推导处理顺序
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个题组"的构造流程
//! - `ImportCtx` - 运行上下文（暂存图 + 缓存 + 存储查询）
//! - `import_plain` / `import_markup` - 两种方言的导入器
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/directory_processor` - 整个目录，持有事务边界
//! - `orchestrator/textfile_processor` - 单个文本文件
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ArchiveParser, CommandParser, SqliteStore, Store};
pub use models::{ArchiveContent, ArchiveDocument, ImportGraph, RawParseTree};
pub use orchestrator::{import_directory, FileOrder, ImportRequest, ImportSummary};
pub use workflow::ImportCtx;
