//! 导入暂存图
//!
//! 一次导入运行中创建的所有实体都先放在这里，按类型存放在各自的向量中，
//! 以带类型的下标互相引用。只有在 `Store::persist` 时才整体写入数据库。
//! 从数据库查到的已有实体（人员、分类）同样登记在图中，但带有 `stored_id`，
//! 写入时不会重复插入。

use chrono::{DateTime, Local, NaiveDate};

macro_rules! entity_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(usize);

            impl $name {
                /// 在暂存图对应向量中的下标
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

entity_id!(
    PersonId,
    CategoryId,
    RevisionId,
    TestId,
    GroupNetworkId,
    GroupId,
    QuestionNetworkId,
    QuestionId,
    IntroductionId,
    FigureTreeId,
    FigureId,
);

/// 按名称唯一的分类表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryTable {
    Format,
    QuestionKind,
    FigureKind,
    QuestionStatus,
}

impl CategoryTable {
    pub fn table_name(self) -> &'static str {
        match self {
            CategoryTable::Format => "format",
            CategoryTable::QuestionKind => "question_kind",
            CategoryTable::FigureKind => "figure_kind",
            CategoryTable::QuestionStatus => "question_status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub short_name: String,
    pub full_name: String,
    pub stored_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub table: CategoryTable,
    pub name: String,
    pub stored_id: Option<i64>,
}

/// 一次作者快照
#[derive(Debug, Clone)]
pub struct Revision {
    pub author: PersonId,
    pub timestamp: DateTime<Local>,
    pub commit_message: String,
}

#[derive(Debug, Clone)]
pub struct Test {
    pub title: String,
    pub date: NaiveDate,
}

/// 题组谱系：已入库的或本次新建的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRef {
    Stored(i64),
    Staged(GroupNetworkId),
}

/// 题组引用：已入库的或本次新建的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRef {
    Stored(i64),
    Staged(GroupId),
}

#[derive(Debug, Clone)]
pub struct Group {
    pub revision: RevisionId,
    pub format: CategoryId,
    pub network: NetworkRef,
    pub title: Option<String>,
}

/// 父题组 → 子题组 的历史边
#[derive(Debug, Clone, Copy)]
pub struct GroupHistory {
    pub parent: GroupRef,
    pub child: GroupId,
}

#[derive(Debug, Clone)]
pub struct Question {
    pub revision: RevisionId,
    pub status: CategoryId,
    pub kind: CategoryId,
    pub network: QuestionNetworkId,
    pub text: String,
    pub answer: Option<String>,
    pub notes: Option<String>,
    pub source_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Introduction {
    pub revision: RevisionId,
    pub text: Option<String>,
    pub source_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Figure {
    pub revision: RevisionId,
    pub kind: CategoryId,
    /// 图片自己的谱系，导入时总是新建
    pub tree: FigureTreeId,
    pub filename: String,
    pub mimetype: Option<String>,
    pub contents: Vec<u8>,
}

/// 题目或引言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    Question(QuestionId),
    Introduction(IntroductionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestGroupBinding {
    pub test: TestId,
    pub group: GroupId,
    pub order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupQuestionBinding {
    pub group: GroupId,
    pub question: QuestionId,
    pub order: u32,
    /// 满分
    pub weight: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupIntroductionBinding {
    pub group: GroupId,
    pub introduction: IntroductionId,
    pub order: u32,
}

/// 图片与所属块的绑定，持久化时按块类型分入两张表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureBinding {
    pub block: BlockId,
    pub figure: FigureId,
}

/// 一次导入运行的暂存实体图
#[derive(Debug, Default)]
pub struct ImportGraph {
    persons: Vec<Person>,
    categories: Vec<Category>,
    revisions: Vec<Revision>,
    tests: Vec<Test>,
    group_networks: usize,
    groups: Vec<Group>,
    group_histories: Vec<GroupHistory>,
    question_networks: usize,
    questions: Vec<Question>,
    introductions: Vec<Introduction>,
    figure_trees: usize,
    figures: Vec<Figure>,
    test_group_bindings: Vec<TestGroupBinding>,
    group_question_bindings: Vec<GroupQuestionBinding>,
    group_introduction_bindings: Vec<GroupIntroductionBinding>,
    figure_bindings: Vec<FigureBinding>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 暂存 ==========

    pub fn add_person(&mut self, person: Person) -> PersonId {
        self.persons.push(person);
        PersonId(self.persons.len() - 1)
    }

    pub fn add_category(&mut self, category: Category) -> CategoryId {
        self.categories.push(category);
        CategoryId(self.categories.len() - 1)
    }

    pub fn add_revision(&mut self, revision: Revision) -> RevisionId {
        self.revisions.push(revision);
        RevisionId(self.revisions.len() - 1)
    }

    pub fn add_test(&mut self, test: Test) -> TestId {
        self.tests.push(test);
        TestId(self.tests.len() - 1)
    }

    pub fn new_group_network(&mut self) -> GroupNetworkId {
        self.group_networks += 1;
        GroupNetworkId(self.group_networks - 1)
    }

    pub fn add_group(&mut self, group: Group) -> GroupId {
        self.groups.push(group);
        GroupId(self.groups.len() - 1)
    }

    pub fn add_group_history(&mut self, history: GroupHistory) {
        self.group_histories.push(history);
    }

    pub fn new_question_network(&mut self) -> QuestionNetworkId {
        self.question_networks += 1;
        QuestionNetworkId(self.question_networks - 1)
    }

    pub fn add_question(&mut self, question: Question) -> QuestionId {
        self.questions.push(question);
        QuestionId(self.questions.len() - 1)
    }

    pub fn add_introduction(&mut self, introduction: Introduction) -> IntroductionId {
        self.introductions.push(introduction);
        IntroductionId(self.introductions.len() - 1)
    }

    pub fn new_figure_tree(&mut self) -> FigureTreeId {
        self.figure_trees += 1;
        FigureTreeId(self.figure_trees - 1)
    }

    pub fn add_figure(&mut self, figure: Figure) -> FigureId {
        self.figures.push(figure);
        FigureId(self.figures.len() - 1)
    }

    pub fn bind_test_group(&mut self, binding: TestGroupBinding) {
        self.test_group_bindings.push(binding);
    }

    pub fn bind_group_question(&mut self, binding: GroupQuestionBinding) {
        self.group_question_bindings.push(binding);
    }

    pub fn bind_group_introduction(&mut self, binding: GroupIntroductionBinding) {
        self.group_introduction_bindings.push(binding);
    }

    pub fn bind_figure(&mut self, binding: FigureBinding) {
        self.figure_bindings.push(binding);
    }

    // ========== 读取 ==========

    pub fn person(&self, id: PersonId) -> &Person {
        &self.persons[id.0]
    }

    pub fn category(&self, id: CategoryId) -> &Category {
        &self.categories[id.0]
    }

    pub fn revision(&self, id: RevisionId) -> &Revision {
        &self.revisions[id.0]
    }

    pub fn test(&self, id: TestId) -> &Test {
        &self.tests[id.0]
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.groups[id.0]
    }

    pub fn question(&self, id: QuestionId) -> &Question {
        &self.questions[id.0]
    }

    pub fn question_mut(&mut self, id: QuestionId) -> &mut Question {
        &mut self.questions[id.0]
    }

    pub fn introduction_mut(&mut self, id: IntroductionId) -> &mut Introduction {
        &mut self.introductions[id.0]
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn group_network_count(&self) -> usize {
        self.group_networks
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group_histories(&self) -> &[GroupHistory] {
        &self.group_histories
    }

    pub fn question_network_count(&self) -> usize {
        self.question_networks
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn introductions(&self) -> &[Introduction] {
        &self.introductions
    }

    pub fn figure_tree_count(&self) -> usize {
        self.figure_trees
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn test_group_bindings(&self) -> &[TestGroupBinding] {
        &self.test_group_bindings
    }

    pub fn group_question_bindings(&self) -> &[GroupQuestionBinding] {
        &self.group_question_bindings
    }

    pub fn group_introduction_bindings(&self) -> &[GroupIntroductionBinding] {
        &self.group_introduction_bindings
    }

    pub fn figure_bindings(&self) -> &[FigureBinding] {
        &self.figure_bindings
    }

    // ========== 查询 ==========

    /// 在本次暂存中按（试卷标题, 题组序号）查找题组
    pub fn find_staged_groups(&self, test_title: &str, order: u32) -> Vec<GroupId> {
        self.test_group_bindings
            .iter()
            .filter(|b| b.order == order && self.tests[b.test.0].title == test_title)
            .map(|b| b.group)
            .collect()
    }

    /// 题组在试卷中的序号
    pub fn group_order(&self, group: GroupId) -> Option<u32> {
        self.test_group_bindings
            .iter()
            .find(|b| b.group == group)
            .map(|b| b.order)
    }

    /// 块在题组中的序号
    pub fn block_order(&self, block: BlockId) -> Option<u32> {
        match block {
            BlockId::Question(id) => self
                .group_question_bindings
                .iter()
                .find(|b| b.question == id)
                .map(|b| b.order),
            BlockId::Introduction(id) => self
                .group_introduction_bindings
                .iter()
                .find(|b| b.introduction == id)
                .map(|b| b.order),
        }
    }

    /// 题目的题型名称
    pub fn question_kind_name(&self, id: QuestionId) -> &str {
        &self.category(self.question(id).kind).name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn staged_groups_are_found_by_test_title_and_order() {
        let mut graph = ImportGraph::new();
        let author = graph.add_person(Person {
            short_name: "jg".to_string(),
            full_name: "jg".to_string(),
            stored_id: None,
        });
        let revision = graph.add_revision(Revision {
            author,
            timestamp: Local::now(),
            commit_message: String::new(),
        });
        let format = graph.add_category(Category {
            table: CategoryTable::Format,
            name: "text/plain".to_string(),
            stored_id: None,
        });
        let test = graph.add_test(Test {
            title: "2016".to_string(),
            date: NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
        });
        let network = graph.new_group_network();
        let group = graph.add_group(Group {
            revision,
            format,
            network: NetworkRef::Staged(network),
            title: None,
        });
        graph.bind_test_group(TestGroupBinding { test, group, order: 2 });

        assert_eq!(graph.find_staged_groups("2016", 2), vec![group]);
        assert!(graph.find_staged_groups("2016", 1).is_empty());
        assert!(graph.find_staged_groups("2017", 2).is_empty());
        assert_eq!(graph.group_order(group), Some(2));
    }
}
