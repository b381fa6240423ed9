//! plain 方言导入 - 流程层
//!
//! 文本块序列按声明的题目数切分：前面多出的块是引言，其余是题目。

use tracing::{debug, error, warn};

use crate::error::{AppResult, ParseError};
use crate::models::graph::{
    BlockId, GroupIntroductionBinding, GroupQuestionBinding, Introduction, Question, RevisionId,
};
use crate::models::parse_tree::{PlainContent, PointsDeclaration, ReuseDeclaration};
use crate::services::figure_binder::{FigureTargets, ImportedGroup};
use crate::services::lineage::make_group;
use crate::workflow::{ContentDiagnostics, ImportCtx};

pub const PLAIN_FORMAT: &str = "text/plain";
/// plain 方言没有题型标记，统一归为此类
pub const PLAIN_QUESTION_KIND: &str = "plain";

/// 计算引言数量
///
/// 声明的题目数大于块数时记错误并把全部块当作题目。
pub fn intro_count(
    block_count: usize,
    question_count: usize,
    diagnostics: &mut ContentDiagnostics,
) -> usize {
    if block_count < question_count {
        error!(
            "{} questions claimed but only {} blocks found",
            question_count, block_count
        );
        diagnostics.overclaimed_questions = Some((question_count, block_count));
        0
    } else {
        block_count - question_count
    }
}

/// 把顶层分值声明分配到题目绑定上
///
/// 总分与分项之和不符、分项数与题目数不符都只记日志，照常按位置分配。
pub fn attach_global_points(
    points: &PointsDeclaration,
    bindings: &mut [GroupQuestionBinding],
    diagnostics: &mut ContentDiagnostics,
) {
    match points {
        PointsDeclaration::Single(weight) => {
            if let Some(first) = bindings.first_mut() {
                first.weight = Some(*weight);
            }
        }
        PointsDeclaration::Distribution(total, per_question) => {
            // u64 累加，分项再大也不会溢出
            let sum: u64 = per_question.iter().map(|&p| u64::from(p)).sum();
            if sum != u64::from(*total) {
                warn!(
                    "{} != {} points",
                    per_question
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(" + "),
                    total
                );
                diagnostics.points_sum_mismatch = Some((sum, *total));
            }
            if per_question.len() != bindings.len() {
                error!(
                    "Mismatch: {} points, {} question bindings",
                    per_question.len(),
                    bindings.len()
                );
                diagnostics.points_count_mismatch = Some((per_question.len(), bindings.len()));
            }
            for (binding, weight) in bindings.iter_mut().zip(per_question) {
                binding.weight = Some(*weight);
            }
        }
    }
}

/// 导入一个 plain 方言题组
pub fn import_plain(
    ctx: &mut ImportCtx<'_>,
    content: &PlainContent,
    reuse: Option<&ReuseDeclaration>,
    revision: RevisionId,
) -> AppResult<ImportedGroup> {
    if content.blocks.is_empty() {
        return Err(ParseError::EmptyPlainContent.into());
    }

    let group = make_group(ctx, revision, reuse, PLAIN_FORMAT)?;
    let block_count = content.blocks.len();
    let question_count = content
        .question_count
        .filter(|&count| count > 0)
        .unwrap_or(block_count);
    let mut diagnostics = ContentDiagnostics::default();
    let intro_count = intro_count(block_count, question_count, &mut diagnostics);

    let title = content.title.clone().filter(|t| !t.is_empty()).or_else(|| {
        (intro_count > 0)
            .then(|| content.blocks[0].lines().next().unwrap_or_default().to_string())
    });
    debug!("{} plain 题组: {} 引言, {} 题目, 标题 {:?}", ctx, intro_count, block_count - intro_count, title);
    ctx.graph.group_mut(group).title = title;

    let mut blocks = Vec::with_capacity(block_count);
    for (order, text) in (1u32..).zip(&content.blocks[..intro_count]) {
        let introduction = ctx.graph.add_introduction(Introduction {
            revision,
            text: Some(text.clone()),
            source_code: None,
        });
        ctx.graph.bind_group_introduction(GroupIntroductionBinding {
            group,
            introduction,
            order,
        });
        blocks.push(BlockId::Introduction(introduction));
    }

    let status = ctx.import_status()?;
    let kind = ctx.question_kind(PLAIN_QUESTION_KIND)?;
    let mut question_bindings = Vec::with_capacity(block_count - intro_count);
    for (order, text) in (intro_count as u32 + 1..).zip(&content.blocks[intro_count..]) {
        let network = ctx.graph.new_question_network();
        let question = ctx.graph.add_question(Question {
            revision,
            status,
            kind,
            network,
            text: text.clone(),
            answer: None,
            notes: None,
            source_code: None,
        });
        question_bindings.push(GroupQuestionBinding {
            group,
            question,
            order,
            weight: None,
        });
        blocks.push(BlockId::Question(question));
    }

    if let Some(first) = question_bindings.first() {
        ctx.graph.question_mut(first.question).answer = content.answer.clone();
    }
    if let Some(points) = &content.points {
        attach_global_points(points, &mut question_bindings, &mut diagnostics);
    }
    for binding in question_bindings {
        ctx.graph.bind_group_question(binding);
    }

    // 所有尚未导入的图片都先挂到第一个块上
    let mut targets = FigureTargets::default();
    if !content.images.is_empty() {
        targets.push_repeated(blocks[0], content.images.len());
    }

    Ok(ImportedGroup {
        group,
        targets,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteStore;
    use crate::models::graph::{GroupId, Test};
    use crate::models::ImportGraph;
    use crate::services::lineage::make_revision;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn content(blocks: &[&str]) -> PlainContent {
        PlainContent {
            blocks: blocks.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    fn run(content: &PlainContent) -> (ImportGraph, ImportedGroup) {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut ctx = ImportCtx::new(
            &store,
            &store,
            Test {
                title: "2016".to_string(),
                date: NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
            },
        );
        let revision = make_revision(&mut ctx, &[], 1).unwrap();
        let imported = import_plain(&mut ctx, content, None, revision).unwrap();
        (ctx.into_graph(), imported)
    }

    /// 题组下全部块的序号，题目与引言合并后排序
    fn block_orders(graph: &ImportGraph, group: GroupId) -> Vec<u32> {
        let mut orders: Vec<u32> = graph
            .group_question_bindings()
            .iter()
            .filter(|b| b.group == group)
            .map(|b| b.order)
            .chain(
                graph
                    .group_introduction_bindings()
                    .iter()
                    .filter(|b| b.group == group)
                    .map(|b| b.order),
            )
            .collect();
        orders.sort_unstable();
        orders
    }

    fn bindings(count: usize) -> Vec<GroupQuestionBinding> {
        // 只用于分值分配，题组与题目下标无关紧要
        let blocks: Vec<&str> = vec!["q"; count];
        let (graph, _) = run(&content(&blocks));
        graph.group_question_bindings().to_vec()
    }

    fn weights(bindings: &[GroupQuestionBinding]) -> Vec<Option<u32>> {
        bindings.iter().map(|b| b.weight).collect()
    }

    #[test]
    fn without_question_count_all_blocks_are_questions() {
        let (graph, imported) = run(&content(&["a", "b", "c"]));

        assert_eq!(graph.questions().len(), 3);
        assert!(graph.introductions().is_empty());
        assert_eq!(block_orders(&graph, imported.group), vec![1, 2, 3]);
        assert_eq!(graph.group(imported.group).title, None);
        assert!(imported.diagnostics.is_empty());
    }

    #[test]
    fn leading_excess_blocks_become_introductions() {
        let mut plain = content(&["Casus\nMeer tekst", "b", "c"]);
        plain.question_count = Some(1);

        let (graph, imported) = run(&plain);

        assert_eq!(graph.introductions().len(), 2);
        assert_eq!(graph.questions().len(), 1);
        assert_eq!(graph.questions()[0].text, "c");
        assert_eq!(block_orders(&graph, imported.group), vec![1, 2, 3]);
        assert_eq!(graph.group(imported.group).title.as_deref(), Some("Casus"));
    }

    #[test]
    fn overclaimed_question_count_means_no_introductions() {
        let mut diagnostics = ContentDiagnostics::default();
        assert_eq!(intro_count(3, 1, &mut diagnostics), 2);
        assert!(diagnostics.is_empty());

        assert_eq!(intro_count(2, 5, &mut diagnostics), 0);
        assert_eq!(diagnostics.overclaimed_questions, Some((5, 2)));
    }

    #[test]
    fn overclaimed_question_count_is_reported_by_the_importer() {
        let mut plain = content(&["a", "b"]);
        plain.question_count = Some(4);

        let (graph, imported) = run(&plain);

        assert_eq!(graph.questions().len(), 2);
        assert!(graph.introductions().is_empty());
        assert_eq!(imported.diagnostics.overclaimed_questions, Some((4, 2)));
        assert_eq!(imported.diagnostics.count(), 1);
    }

    #[test]
    fn declared_answer_goes_to_first_question_and_kind_is_plain() {
        let mut plain = content(&["intro", "q1", "q2"]);
        plain.question_count = Some(2);
        plain.answer = Some("B".to_string());

        let (graph, _) = run(&plain);

        assert_eq!(graph.questions()[0].answer.as_deref(), Some("B"));
        assert_eq!(graph.questions()[1].answer, None);
        assert_eq!(graph.category(graph.questions()[0].kind).name, PLAIN_QUESTION_KIND);
    }

    #[test]
    fn images_all_target_the_first_block() {
        let mut plain = content(&["intro", "q1"]);
        plain.question_count = Some(1);
        plain.images = vec!["1a.png".to_string(), "1b.png".to_string()];

        let (graph, imported) = run(&plain);

        let first = BlockId::Introduction(graph.group_introduction_bindings()[0].introduction);
        assert_eq!(imported.targets.blocks(), &[first, first]);
    }

    #[test]
    fn distributed_points_are_assigned_positionally() {
        let mut bindings = bindings(2);
        let mut diagnostics = ContentDiagnostics::default();

        attach_global_points(
            &PointsDeclaration::Distribution(10, vec![4, 6]),
            &mut bindings,
            &mut diagnostics,
        );

        assert_eq!(weights(&bindings), vec![Some(4), Some(6)]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn mismatched_points_sum_is_reported_and_weights_still_assigned() {
        let mut bindings = bindings(2);
        let mut diagnostics = ContentDiagnostics::default();

        attach_global_points(
            &PointsDeclaration::Distribution(10, vec![4, 5]),
            &mut bindings,
            &mut diagnostics,
        );

        assert_eq!(weights(&bindings), vec![Some(4), Some(5)]);
        assert_eq!(diagnostics.points_sum_mismatch, Some((9, 10)));
        assert_eq!(diagnostics.points_count_mismatch, None);
    }

    #[test]
    fn surplus_point_values_are_reported_and_extra_values_ignored() {
        let mut bindings = bindings(2);
        let mut diagnostics = ContentDiagnostics::default();

        attach_global_points(
            &PointsDeclaration::Distribution(10, vec![4, 3, 3]),
            &mut bindings,
            &mut diagnostics,
        );

        assert_eq!(weights(&bindings), vec![Some(4), Some(3)]);
        assert_eq!(diagnostics.points_count_mismatch, Some((3, 2)));
        assert_eq!(diagnostics.points_sum_mismatch, None);
    }

    #[test]
    fn missing_point_values_leave_later_questions_unweighted() {
        let mut bindings = bindings(3);
        let mut diagnostics = ContentDiagnostics::default();

        attach_global_points(
            &PointsDeclaration::Distribution(7, vec![4, 3]),
            &mut bindings,
            &mut diagnostics,
        );

        assert_eq!(weights(&bindings), vec![Some(4), Some(3), None]);
        assert_eq!(diagnostics.points_count_mismatch, Some((2, 3)));
    }

    #[test]
    fn huge_point_values_do_not_overflow_the_sum() {
        let mut bindings = bindings(2);
        let mut diagnostics = ContentDiagnostics::default();

        attach_global_points(
            &PointsDeclaration::Distribution(5, vec![u32::MAX, 1]),
            &mut bindings,
            &mut diagnostics,
        );

        assert_eq!(weights(&bindings), vec![Some(u32::MAX), Some(1)]);
        assert_eq!(
            diagnostics.points_sum_mismatch,
            Some((u64::from(u32::MAX) + 1, 5))
        );
    }

    #[test]
    fn scalar_points_apply_to_first_question_only() {
        let mut bindings = bindings(2);
        let mut diagnostics = ContentDiagnostics::default();

        attach_global_points(&PointsDeclaration::Single(3), &mut bindings, &mut diagnostics);

        assert_eq!(weights(&bindings), vec![Some(3), None]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn empty_plain_content_is_fatal() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut ctx = ImportCtx::new(
            &store,
            &store,
            Test {
                title: "2016".to_string(),
                date: NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
            },
        );
        let revision = make_revision(&mut ctx, &[], 1).unwrap();
        let err = import_plain(&mut ctx, &content(&[]), None, revision).unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Parse(ParseError::EmptyPlainContent)
        ));
    }
}
