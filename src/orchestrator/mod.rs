//! 编排层
//!
//! - `directory_processor` - 整个档案目录的导入，持有事务边界
//! - `textfile_processor` - 单个文本文件到暂存题组

pub mod directory_processor;
pub mod textfile_processor;

// 重新导出主要类型
pub use directory_processor::{
    import_directory, resolve_test_identity, FileOrder, ImportRequest, ImportSummary,
};
pub use textfile_processor::import_textfile;
