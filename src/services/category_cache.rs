//! 名称缓存 - 业务能力层
//!
//! 按名称唯一的查找实体（人员、格式、题型、图片类型、状态）的"取或建"：
//! 先查本次运行的缓存，再查数据库，最后新建。三种情况下实体都登记到缓存并进入暂存图。

use std::collections::HashMap;
use tracing::debug;

use crate::error::AppResult;
use crate::infrastructure::CategoryLookup;
use crate::models::graph::{Category, CategoryId, Person, PersonId};
use crate::models::{CategoryTable, ImportGraph};

/// 通用的名称 → 实体缓存
#[derive(Debug)]
pub struct NameCache<Id> {
    entries: HashMap<String, Id>,
}

impl<Id: Copy> NameCache<Id> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 命中则直接返回，否则调用 `create` 并登记结果
    pub fn get_or_create(
        &mut self,
        name: &str,
        create: impl FnOnce(&str) -> AppResult<Id>,
    ) -> AppResult<Id> {
        if let Some(id) = self.entries.get(name) {
            return Ok(*id);
        }
        let id = create(name)?;
        self.entries.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<Id: Copy> Default for NameCache<Id> {
    fn default() -> Self {
        Self::new()
    }
}

/// 单张分类表的缓存
#[derive(Debug)]
pub struct CategoryCache {
    table: CategoryTable,
    names: NameCache<CategoryId>,
}

impl CategoryCache {
    pub fn new(table: CategoryTable) -> Self {
        Self {
            table,
            names: NameCache::new(),
        }
    }

    pub fn get(
        &mut self,
        name: &str,
        graph: &mut ImportGraph,
        lookup: &dyn CategoryLookup,
    ) -> AppResult<CategoryId> {
        let table = self.table;
        self.names.get_or_create(name, |name| {
            let stored_id = lookup.find_category(table, name)?;
            debug!(
                "分类 {}:{} ({})",
                table.table_name(),
                name,
                if stored_id.is_some() { "已存在" } else { "新建" }
            );
            Ok(graph.add_category(Category {
                table,
                name: name.to_string(),
                stored_id,
            }))
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// 人员缓存，查找前去掉名字两端的空白
#[derive(Debug, Default)]
pub struct PersonCache {
    names: NameCache<PersonId>,
}

impl PersonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `full_name` 只在新建人员时使用，缺省为简称
    pub fn get(
        &mut self,
        short_name: &str,
        full_name: Option<&str>,
        graph: &mut ImportGraph,
        lookup: &dyn CategoryLookup,
    ) -> AppResult<PersonId> {
        self.names.get_or_create(short_name.trim(), |short_name| {
            let person = match lookup.find_person(short_name)? {
                Some(stored) => Person {
                    short_name: short_name.to_string(),
                    full_name: stored.full_name,
                    stored_id: Some(stored.id),
                },
                None => Person {
                    short_name: short_name.to_string(),
                    full_name: full_name.unwrap_or(short_name).to_string(),
                    stored_id: None,
                },
            };
            Ok(graph.add_person(person))
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
