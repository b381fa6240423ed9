//! markup 方言导入 - 流程层
//!
//! 每个块由（子树, 原始源码）组成。题目块按标记确定题型，引言或图片块成为引言，
//! 只有第一块可以是仅含标题的前言。

use tracing::{debug, warn};

use crate::error::{AppResult, ParseError};
use crate::models::graph::{
    BlockId, GroupIntroductionBinding, GroupQuestionBinding, Introduction, IntroductionId, Question,
    QuestionId, RevisionId,
};
use crate::models::parse_tree::{MarkupBlock, MarkupContent, ReuseDeclaration};
use crate::services::figure_binder::{FigureTargets, ImportedGroup};
use crate::services::lineage::make_group;
use crate::workflow::{ContentDiagnostics, ImportCtx};

pub const MARKUP_FORMAT: &str = "text/x-latex-writer";

pub const COMPLETE_TEXT_KIND: &str = "complete_text";
pub const ANSWER_FIGURE_KIND: &str = "answerfigure";
pub const DRAW_BOX_KIND: &str = "drawbox";
pub const MULTIPLE_CHOICE_KIND: &str = "mc";

/// 题型判定，先匹配者优先
pub fn classify_question(block: &MarkupBlock) -> &str {
    if block.complete_text {
        COMPLETE_TEXT_KIND
    } else if block.answer_figure.is_some() {
        ANSWER_FIGURE_KIND
    } else if block.draw_box {
        DRAW_BOX_KIND
    } else if let Some(kind) = &block.kind {
        kind.as_str()
    } else {
        MULTIPLE_CHOICE_KIND
    }
}

/// 组装题干：完形填空式分段会被拼回一行，表格追加在空行之后
pub fn question_text(block: &MarkupBlock) -> String {
    let mut text = block
        .question
        .as_ref()
        .map(|question| question.reassemble())
        .unwrap_or_default();
    if let Some(table) = &block.table {
        let rows: Vec<String> = table.iter().map(|row| row.join("; ")).collect();
        text.push_str("\n\n");
        text.push_str(&rows.join("\n"));
    }
    text
}

/// 批注合并为备注，每条一行
pub fn question_notes(block: &MarkupBlock) -> Option<String> {
    block.comments.as_ref().map(|comments| {
        comments
            .iter()
            .map(|comment| comment.join(": "))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn import_markup_question(
    ctx: &mut ImportCtx<'_>,
    block: &MarkupBlock,
    revision: RevisionId,
) -> AppResult<QuestionId> {
    let status = ctx.import_status()?;
    let kind = ctx.question_kind(classify_question(block))?;
    let network = ctx.graph.new_question_network();
    Ok(ctx.graph.add_question(Question {
        revision,
        status,
        kind,
        network,
        text: question_text(block),
        answer: block.answer.first().cloned(),
        notes: question_notes(block),
        source_code: None,
    }))
}

fn import_markup_introduction(
    ctx: &mut ImportCtx<'_>,
    block: &MarkupBlock,
    revision: RevisionId,
) -> IntroductionId {
    ctx.graph.add_introduction(Introduction {
        revision,
        text: block.introduction.clone(),
        source_code: None,
    })
}

/// 导入一个 markup 方言题组
///
/// `sources` 是与子树一一对应的原始源码片段。块序号只分配给实际产出的块，
/// 因此被跳过的标题前言不会占用序号。
pub fn import_markup(
    ctx: &mut ImportCtx<'_>,
    content: &MarkupContent,
    sources: &[String],
    reuse: Option<&ReuseDeclaration>,
    revision: RevisionId,
) -> AppResult<ImportedGroup> {
    if content.blocks.len() != sources.len() {
        return Err(ParseError::SourceCountMismatch {
            blocks: content.blocks.len(),
            sources: sources.len(),
        }
        .into());
    }

    let reuse = reuse.or_else(|| content.block_reuse());
    let group = make_group(ctx, revision, reuse, MARKUP_FORMAT)?;
    ctx.graph.group_mut(group).title = content.blocks.first().and_then(|b| b.title.clone());

    let mut targets = FigureTargets::default();
    let mut diagnostics = ContentDiagnostics::default();
    let mut order = 0u32;
    for (index, (block, source)) in content.blocks.iter().zip(sources).enumerate() {
        let index = index + 1;
        let block_id = if block.is_question() {
            let question = import_markup_question(ctx, block, revision)?;
            order += 1;
            ctx.graph.bind_group_question(GroupQuestionBinding {
                group,
                question,
                order,
                weight: block.points,
            });
            ctx.graph.question_mut(question).source_code = Some(source.clone());
            BlockId::Question(question)
        } else if block.is_introduction() {
            let introduction = import_markup_introduction(ctx, block, revision);
            order += 1;
            ctx.graph.bind_group_introduction(GroupIntroductionBinding {
                group,
                introduction,
                order,
            });
            ctx.graph.introduction_mut(introduction).source_code = Some(source.clone());
            BlockId::Introduction(introduction)
        } else if index == 1 {
            let lines = source.lines().count();
            if lines > 1 {
                warn!("{} 标题前言不止一行 ({} 行)，正文被跳过", ctx, lines);
                diagnostics.multiline_preamble = Some(lines);
            } else {
                debug!("{} 跳过仅含标题的前言", ctx);
            }
            continue;
        } else {
            return Err(ParseError::UnclassifiedBlock { index }.into());
        };

        targets.push_declared(block_id, block.figure_filenames());
    }

    debug!("{} markup 题组: {} 个块, {} 个图片期望", ctx, order, targets.len());
    Ok(ImportedGroup {
        group,
        targets,
        diagnostics,
    })
}
