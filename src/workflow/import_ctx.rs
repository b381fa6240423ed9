//! 导入运行上下文
//!
//! 一次导入调用从头到尾只有一个 `ImportCtx`：它持有暂存图、各个名称缓存
//! 以及只读的存储查询接口。所有构造函数都显式接收它，不存在跨运行的全局状态。

use std::fmt::Display;

use crate::error::AppResult;
use crate::infrastructure::{CategoryLookup, LineageLookup};
use crate::models::graph::{CategoryId, PersonId, Test, TestId};
use crate::models::{CategoryTable, ImportGraph};
use crate::services::category_cache::{CategoryCache, PersonCache};

/// 导入题目的固定状态
pub const IMPORTED_STATUS_NAME: &str = "imported";

/// 本次运行的全部名称缓存
pub struct RunCaches {
    pub persons: PersonCache,
    pub formats: CategoryCache,
    pub question_kinds: CategoryCache,
    pub figure_kinds: CategoryCache,
    pub statuses: CategoryCache,
}

impl RunCaches {
    pub fn new() -> Self {
        Self {
            persons: PersonCache::new(),
            formats: CategoryCache::new(CategoryTable::Format),
            question_kinds: CategoryCache::new(CategoryTable::QuestionKind),
            figure_kinds: CategoryCache::new(CategoryTable::FigureKind),
            statuses: CategoryCache::new(CategoryTable::QuestionStatus),
        }
    }
}

impl Default for RunCaches {
    fn default() -> Self {
        Self::new()
    }
}

/// 导入运行上下文
pub struct ImportCtx<'a> {
    pub graph: ImportGraph,
    caches: RunCaches,
    categories: &'a dyn CategoryLookup,
    lineage: &'a dyn LineageLookup,
    test: TestId,
}

impl<'a> ImportCtx<'a> {
    /// 创建新的运行上下文，并暂存本次导入的试卷
    pub fn new(
        categories: &'a dyn CategoryLookup,
        lineage: &'a dyn LineageLookup,
        test: Test,
    ) -> Self {
        let mut graph = ImportGraph::new();
        let test = graph.add_test(test);
        Self {
            graph,
            caches: RunCaches::new(),
            categories,
            lineage,
            test,
        }
    }

    pub fn test(&self) -> TestId {
        self.test
    }

    pub fn test_title(&self) -> &str {
        &self.graph.test(self.test).title
    }

    pub fn lineage(&self) -> &dyn LineageLookup {
        self.lineage
    }

    pub fn person(&mut self, short_name: &str, full_name: Option<&str>) -> AppResult<PersonId> {
        self.caches
            .persons
            .get(short_name, full_name, &mut self.graph, self.categories)
    }

    pub fn format(&mut self, name: &str) -> AppResult<CategoryId> {
        self.caches.formats.get(name, &mut self.graph, self.categories)
    }

    pub fn question_kind(&mut self, name: &str) -> AppResult<CategoryId> {
        self.caches
            .question_kinds
            .get(name, &mut self.graph, self.categories)
    }

    pub fn figure_kind(&mut self, name: &str) -> AppResult<CategoryId> {
        self.caches
            .figure_kinds
            .get(name, &mut self.graph, self.categories)
    }

    /// 导入题目统一使用的状态
    pub fn import_status(&mut self) -> AppResult<CategoryId> {
        self.caches
            .statuses
            .get(IMPORTED_STATUS_NAME, &mut self.graph, self.categories)
    }

    /// 结束运行，交出暂存图
    pub fn into_graph(self) -> ImportGraph {
        self.graph
    }
}

impl Display for ImportCtx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[试卷 {}]", self.test_title())
    }
}
