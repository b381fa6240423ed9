//! SQLite 存储实现

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use tracing::{debug, info};

use super::store::{AncestorGroup, CategoryLookup, LineageLookup, PersistSummary, Store, StoredPerson};
use crate::error::{AppResult, StoreError};
use crate::models::graph::{BlockId, GroupRef, NetworkRef};
use crate::models::{CategoryTable, ImportGraph};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS person (
    id INTEGER PRIMARY KEY,
    short_name TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS format (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
CREATE TABLE IF NOT EXISTS question_kind (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
CREATE TABLE IF NOT EXISTS figure_kind (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
CREATE TABLE IF NOT EXISTS question_status (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
CREATE TABLE IF NOT EXISTS revision (
    id INTEGER PRIMARY KEY,
    author_id INTEGER NOT NULL REFERENCES person(id),
    timestamp TEXT NOT NULL,
    commit_message TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS test (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    date TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS group_network (id INTEGER PRIMARY KEY);
CREATE TABLE IF NOT EXISTS question_group (
    id INTEGER PRIMARY KEY,
    revision_id INTEGER NOT NULL REFERENCES revision(id),
    format_id INTEGER NOT NULL REFERENCES format(id),
    network_id INTEGER NOT NULL REFERENCES group_network(id),
    title TEXT
);
CREATE TABLE IF NOT EXISTS group_history (
    parent_id INTEGER NOT NULL REFERENCES question_group(id),
    child_id INTEGER NOT NULL REFERENCES question_group(id),
    PRIMARY KEY (parent_id, child_id)
);
CREATE TABLE IF NOT EXISTS question_network (id INTEGER PRIMARY KEY);
CREATE TABLE IF NOT EXISTS question (
    id INTEGER PRIMARY KEY,
    revision_id INTEGER NOT NULL REFERENCES revision(id),
    status_id INTEGER NOT NULL REFERENCES question_status(id),
    kind_id INTEGER NOT NULL REFERENCES question_kind(id),
    network_id INTEGER NOT NULL REFERENCES question_network(id),
    text TEXT NOT NULL,
    answer TEXT,
    notes TEXT,
    source_code TEXT
);
CREATE TABLE IF NOT EXISTS introduction (
    id INTEGER PRIMARY KEY,
    revision_id INTEGER NOT NULL REFERENCES revision(id),
    text TEXT,
    source_code TEXT
);
CREATE TABLE IF NOT EXISTS figure_tree (id INTEGER PRIMARY KEY);
CREATE TABLE IF NOT EXISTS figure (
    id INTEGER PRIMARY KEY,
    revision_id INTEGER NOT NULL REFERENCES revision(id),
    kind_id INTEGER NOT NULL REFERENCES figure_kind(id),
    tree_id INTEGER NOT NULL REFERENCES figure_tree(id),
    filename TEXT NOT NULL,
    mimetype TEXT,
    contents BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS test_group_binding (
    test_id INTEGER NOT NULL REFERENCES test(id),
    group_id INTEGER NOT NULL REFERENCES question_group(id),
    ordering INTEGER NOT NULL,
    PRIMARY KEY (test_id, ordering)
);
CREATE TABLE IF NOT EXISTS group_question_binding (
    group_id INTEGER NOT NULL REFERENCES question_group(id),
    question_id INTEGER NOT NULL REFERENCES question(id),
    ordering INTEGER NOT NULL,
    weight INTEGER,
    PRIMARY KEY (group_id, ordering)
);
CREATE TABLE IF NOT EXISTS group_introduction_binding (
    group_id INTEGER NOT NULL REFERENCES question_group(id),
    introduction_id INTEGER NOT NULL REFERENCES introduction(id),
    ordering INTEGER NOT NULL,
    PRIMARY KEY (group_id, ordering)
);
CREATE TABLE IF NOT EXISTS question_figure_binding (
    question_id INTEGER NOT NULL REFERENCES question(id),
    figure_id INTEGER NOT NULL UNIQUE REFERENCES figure(id)
);
CREATE TABLE IF NOT EXISTS introduction_figure_binding (
    introduction_id INTEGER NOT NULL REFERENCES introduction(id),
    figure_id INTEGER NOT NULL UNIQUE REFERENCES figure(id)
);
"#;

/// 基于 SQLite 的存储
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        info!("打开数据库: {}", path.display());
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// 只读访问底层连接
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// 统计某张表的行数
    pub fn count_rows(&self, table: &str) -> AppResult<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count)
    }
}

impl CategoryLookup for SqliteStore {
    fn find_category(&self, table: CategoryTable, name: &str) -> AppResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                &format!("SELECT id FROM {} WHERE name = ?1", table.table_name()),
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn find_person(&self, short_name: &str) -> AppResult<Option<StoredPerson>> {
        let person = self
            .conn
            .query_row(
                "SELECT id, full_name FROM person WHERE short_name = ?1",
                params![short_name],
                |row| {
                    Ok(StoredPerson {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(person)
    }
}

impl LineageLookup for SqliteStore {
    fn find_ancestors(&self, test_title: &str, order: u32) -> AppResult<Vec<AncestorGroup>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.network_id
             FROM question_group g
             JOIN test_group_binding b ON b.group_id = g.id
             JOIN test t ON t.id = b.test_id
             WHERE b.ordering = ?1 AND t.title = ?2",
        )?;
        let ancestors = stmt
            .query_map(params![order, test_title], |row| {
                Ok(AncestorGroup {
                    id: row.get(0)?,
                    network_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ancestors)
    }
}

impl Store for SqliteStore {
    fn persist(&mut self, graph: &ImportGraph) -> AppResult<PersistSummary> {
        let tx = self.conn.transaction()?;
        let summary = write_graph(&tx, graph)?;
        tx.commit()?;
        info!("💾 已提交 {} 行", summary.rows_inserted);
        Ok(summary)
    }
}

/// 按引用关系的顺序写入暂存图；未提交的事务在出错时随 drop 回滚
fn write_graph(tx: &Transaction<'_>, graph: &ImportGraph) -> AppResult<PersistSummary> {
    let mut inserted = 0usize;
    let mut insert = |sql: &str, values: &[&dyn rusqlite::ToSql]| -> AppResult<i64> {
        tx.execute(sql, values)?;
        inserted += 1;
        Ok(tx.last_insert_rowid())
    };

    let mut person_ids = Vec::with_capacity(graph.persons().len());
    for person in graph.persons() {
        let id = match person.stored_id {
            Some(id) => id,
            None => insert(
                "INSERT INTO person (short_name, full_name) VALUES (?1, ?2)",
                params![person.short_name, person.full_name],
            )?,
        };
        person_ids.push(id);
    }

    let mut category_ids = Vec::with_capacity(graph.categories().len());
    for category in graph.categories() {
        let id = match category.stored_id {
            Some(id) => id,
            None => insert(
                &format!("INSERT INTO {} (name) VALUES (?1)", category.table.table_name()),
                params![category.name],
            )?,
        };
        category_ids.push(id);
    }

    let mut revision_ids = Vec::with_capacity(graph.revisions().len());
    for revision in graph.revisions() {
        let author = resolve(&person_ids, revision.author.index(), "person")?;
        revision_ids.push(insert(
            "INSERT INTO revision (author_id, timestamp, commit_message) VALUES (?1, ?2, ?3)",
            params![author, revision.timestamp.to_rfc3339(), revision.commit_message],
        )?);
    }

    let mut test_ids = Vec::with_capacity(graph.tests().len());
    for test in graph.tests() {
        test_ids.push(insert(
            "INSERT INTO test (title, date) VALUES (?1, ?2)",
            params![test.title, test.date.format("%Y-%m-%d").to_string()],
        )?);
    }

    let mut network_ids = Vec::with_capacity(graph.group_network_count());
    for _ in 0..graph.group_network_count() {
        network_ids.push(insert("INSERT INTO group_network DEFAULT VALUES", params![])?);
    }

    let mut group_ids = Vec::with_capacity(graph.groups().len());
    for group in graph.groups() {
        let network = match group.network {
            NetworkRef::Stored(id) => id,
            NetworkRef::Staged(id) => resolve(&network_ids, id.index(), "group_network")?,
        };
        group_ids.push(insert(
            "INSERT INTO question_group (revision_id, format_id, network_id, title)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                resolve(&revision_ids, group.revision.index(), "revision")?,
                resolve(&category_ids, group.format.index(), "format")?,
                network,
                group.title,
            ],
        )?);
    }

    for history in graph.group_histories() {
        let parent = match history.parent {
            GroupRef::Stored(id) => id,
            GroupRef::Staged(id) => resolve(&group_ids, id.index(), "group")?,
        };
        insert(
            "INSERT INTO group_history (parent_id, child_id) VALUES (?1, ?2)",
            params![parent, resolve(&group_ids, history.child.index(), "group")?],
        )?;
    }

    let mut question_network_ids = Vec::with_capacity(graph.question_network_count());
    for _ in 0..graph.question_network_count() {
        question_network_ids.push(insert("INSERT INTO question_network DEFAULT VALUES", params![])?);
    }

    let mut question_ids = Vec::with_capacity(graph.questions().len());
    for question in graph.questions() {
        question_ids.push(insert(
            "INSERT INTO question
                (revision_id, status_id, kind_id, network_id, text, answer, notes, source_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                resolve(&revision_ids, question.revision.index(), "revision")?,
                resolve(&category_ids, question.status.index(), "question_status")?,
                resolve(&category_ids, question.kind.index(), "question_kind")?,
                resolve(&question_network_ids, question.network.index(), "question_network")?,
                question.text,
                question.answer,
                question.notes,
                question.source_code,
            ],
        )?);
    }

    let mut introduction_ids = Vec::with_capacity(graph.introductions().len());
    for introduction in graph.introductions() {
        introduction_ids.push(insert(
            "INSERT INTO introduction (revision_id, text, source_code) VALUES (?1, ?2, ?3)",
            params![
                resolve(&revision_ids, introduction.revision.index(), "revision")?,
                introduction.text,
                introduction.source_code,
            ],
        )?);
    }

    let mut figure_tree_ids = Vec::with_capacity(graph.figure_tree_count());
    for _ in 0..graph.figure_tree_count() {
        figure_tree_ids.push(insert("INSERT INTO figure_tree DEFAULT VALUES", params![])?);
    }

    let mut figure_ids = Vec::with_capacity(graph.figures().len());
    for figure in graph.figures() {
        figure_ids.push(insert(
            "INSERT INTO figure (revision_id, kind_id, tree_id, filename, mimetype, contents)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                resolve(&revision_ids, figure.revision.index(), "revision")?,
                resolve(&category_ids, figure.kind.index(), "figure_kind")?,
                resolve(&figure_tree_ids, figure.tree.index(), "figure_tree")?,
                figure.filename,
                figure.mimetype,
                figure.contents,
            ],
        )?);
    }

    for binding in graph.test_group_bindings() {
        insert(
            "INSERT INTO test_group_binding (test_id, group_id, ordering) VALUES (?1, ?2, ?3)",
            params![
                resolve(&test_ids, binding.test.index(), "test")?,
                resolve(&group_ids, binding.group.index(), "group")?,
                binding.order,
            ],
        )?;
    }

    for binding in graph.group_question_bindings() {
        insert(
            "INSERT INTO group_question_binding (group_id, question_id, ordering, weight)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                resolve(&group_ids, binding.group.index(), "group")?,
                resolve(&question_ids, binding.question.index(), "question")?,
                binding.order,
                binding.weight,
            ],
        )?;
    }

    for binding in graph.group_introduction_bindings() {
        insert(
            "INSERT INTO group_introduction_binding (group_id, introduction_id, ordering)
             VALUES (?1, ?2, ?3)",
            params![
                resolve(&group_ids, binding.group.index(), "group")?,
                resolve(&introduction_ids, binding.introduction.index(), "introduction")?,
                binding.order,
            ],
        )?;
    }

    for binding in graph.figure_bindings() {
        let figure = resolve(&figure_ids, binding.figure.index(), "figure")?;
        match binding.block {
            BlockId::Question(id) => insert(
                "INSERT INTO question_figure_binding (question_id, figure_id) VALUES (?1, ?2)",
                params![resolve(&question_ids, id.index(), "question")?, figure],
            )?,
            BlockId::Introduction(id) => insert(
                "INSERT INTO introduction_figure_binding (introduction_id, figure_id)
                 VALUES (?1, ?2)",
                params![resolve(&introduction_ids, id.index(), "introduction")?, figure],
            )?,
        };
    }

    debug!("写入 {} 行，共 {} 份试卷", inserted, test_ids.len());
    Ok(PersistSummary {
        rows_inserted: inserted,
    })
}

fn resolve(ids: &[i64], index: usize, entity: &'static str) -> Result<i64, StoreError> {
    ids.get(index)
        .copied()
        .ok_or(StoreError::DanglingReference { entity, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::{Category, Person};
    use pretty_assertions::assert_eq;

    #[test]
    fn categories_are_found_by_name_after_persist() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut graph = ImportGraph::new();
        graph.add_category(Category {
            table: CategoryTable::Format,
            name: "text/plain".to_string(),
            stored_id: None,
        });
        graph.add_person(Person {
            short_name: "jg".to_string(),
            full_name: "Julian".to_string(),
            stored_id: None,
        });

        let summary = store.persist(&graph).unwrap();

        assert_eq!(summary.rows_inserted, 2);
        assert!(store.find_category(CategoryTable::Format, "text/plain").unwrap().is_some());
        assert!(store.find_category(CategoryTable::QuestionKind, "text/plain").unwrap().is_none());
        assert_eq!(store.find_person("jg").unwrap().unwrap().full_name, "Julian");
    }

    #[test]
    fn failed_persist_leaves_no_rows_behind() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut graph = ImportGraph::new();
        graph.add_person(Person {
            short_name: "jg".to_string(),
            full_name: "Julian".to_string(),
            stored_id: None,
        });
        // 同名人员违反唯一约束
        graph.add_person(Person {
            short_name: "jg".to_string(),
            full_name: "Julian again".to_string(),
            stored_id: None,
        });

        assert!(store.persist(&graph).is_err());
        assert_eq!(store.count_rows("person").unwrap(), 0);
    }
}
