//! 存储接口 - 基础设施层
//!
//! 导入过程只通过只读查询访问数据库；所有新实体在内存中暂存，
//! 最后由 `Store::persist` 在一个事务中整体写入。

use crate::error::AppResult;
use crate::models::{CategoryTable, ImportGraph};

/// 已入库的人员
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPerson {
    pub id: i64,
    pub full_name: String,
}

/// 已入库、可被复用声明引用的题组
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AncestorGroup {
    pub id: i64,
    pub network_id: i64,
}

/// 按唯一名称查找分类与人员
pub trait CategoryLookup {
    fn find_category(&self, table: CategoryTable, name: &str) -> AppResult<Option<i64>>;

    fn find_person(&self, short_name: &str) -> AppResult<Option<StoredPerson>>;
}

/// 题组谱系查询
pub trait LineageLookup {
    /// 按（试卷标题, 题组在试卷中的序号）查找题组，可能返回零个或多个
    fn find_ancestors(&self, test_title: &str, order: u32) -> AppResult<Vec<AncestorGroup>>;
}

/// 写入结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub rows_inserted: usize,
}

/// 完整的存储能力
pub trait Store: CategoryLookup + LineageLookup {
    /// 在一个事务中写入整张暂存图，任一步失败则全部回滚
    fn persist(&mut self, graph: &ImportGraph) -> AppResult<PersistSummary>;
}
