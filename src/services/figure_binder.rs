//! 图片绑定 - 业务能力层
//!
//! 每个题组结束时（下一个文本文件开始，或目录结束）把累积的散图片按位置
//! 配给声明或暗示需要图片的块。

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::graph::{BlockId, Figure, FigureBinding, FigureId, GroupId};
use crate::models::PendingFigure;
use crate::workflow::markup_import::ANSWER_FIGURE_KIND;
use crate::workflow::{ContentDiagnostics, ImportCtx};

/// 图片类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureKind {
    Figure,
    AnswerFigure,
}

impl FigureKind {
    pub fn name(self) -> &'static str {
        match self {
            FigureKind::Figure => "figure",
            FigureKind::AnswerFigure => "answerfigure",
        }
    }
}

/// 判断图片类型
///
/// 答题图题目的最后一张声明图片视为答题图。数据里没有明确标出哪张是答题图，
/// 这只是启发式规则。
pub fn classify(block_is_answer_figure: bool, figure_index: usize, total_figures: usize) -> FigureKind {
    if block_is_answer_figure && figure_index + 1 == total_figures {
        FigureKind::AnswerFigure
    } else {
        FigureKind::Figure
    }
}

/// 一个题组里等待图片的块，按期望顺序排列
#[derive(Debug, Clone, Default)]
pub struct FigureTargets {
    blocks: Vec<BlockId>,
    declared_filenames: HashMap<BlockId, Vec<String>>,
}

impl FigureTargets {
    /// 块声明了具体文件名，每个文件名对应一个目标位置
    pub fn push_declared(&mut self, block: BlockId, filenames: Vec<String>) {
        if filenames.is_empty() {
            return;
        }
        self.blocks.extend(std::iter::repeat(block).take(filenames.len()));
        self.declared_filenames.insert(block, filenames);
    }

    /// 块期望 `count` 张图片，但没有文件名
    pub fn push_repeated(&mut self, block: BlockId, count: usize) {
        self.blocks.extend(std::iter::repeat(block).take(count));
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn declared_filenames(&self, block: BlockId) -> Option<&[String]> {
        self.declared_filenames.get(&block).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// 方言导入器的产出：一个题组、它的图片期望以及内容上的软性问题
#[derive(Debug, Clone)]
pub struct ImportedGroup {
    pub group: GroupId,
    pub targets: FigureTargets,
    pub diagnostics: ContentDiagnostics,
}

/// 单个题组的绑定结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingReport {
    pub bound: Vec<(BlockId, FigureId)>,
    /// 没有等到图片的块
    pub unfulfilled: Vec<BlockId>,
    /// 没有目标块的图片文件名，这些图片不会写入
    pub dangling: Vec<String>,
}

/// 把题组累积的图片按位置绑定到目标块
pub fn bind_figures(
    ctx: &mut ImportCtx<'_>,
    imported: &ImportedGroup,
    figures: Vec<PendingFigure>,
) -> AppResult<BindingReport> {
    let mut report = BindingReport::default();
    let targets = &imported.targets;
    let revision = ctx.graph.group(imported.group).revision;
    let group_order = ctx.graph.group_order(imported.group).unwrap_or_default();
    let mut per_block: HashMap<BlockId, usize> = HashMap::new();

    let mut figures = figures.into_iter();
    for &block in targets.blocks() {
        let block_order = ctx.graph.block_order(block).unwrap_or_default();
        let Some(pending) = figures.next() else {
            warn!("块的图片期望未满足: {}/{}", group_order, block_order);
            report.unfulfilled.push(block);
            continue;
        };

        let index = per_block.entry(block).or_insert(0);
        let figure_index = *index;
        *index += 1;

        let declared = targets.declared_filenames(block);
        // 档案源码里引用的原文件名通常比磁盘上改过的名字更有信息量
        let filename = declared
            .and_then(|names| names.get(figure_index))
            .cloned()
            .unwrap_or(pending.filename);
        let total = declared.map_or(1, <[String]>::len);
        let answer_figure_block = match block {
            BlockId::Question(id) => ctx.graph.question_kind_name(id) == ANSWER_FIGURE_KIND,
            BlockId::Introduction(_) => false,
        };
        let kind = classify(answer_figure_block, figure_index, total);

        debug!("绑定块 {}/{} 与图片 {} ({})", group_order, block_order, filename, kind.name());
        let kind = ctx.figure_kind(kind.name())?;
        let tree = ctx.graph.new_figure_tree();
        let figure = ctx.graph.add_figure(Figure {
            revision,
            kind,
            tree,
            filename,
            mimetype: pending.mimetype,
            contents: pending.contents,
        });
        ctx.graph.bind_figure(FigureBinding { block, figure });
        report.bound.push((block, figure));
    }

    for pending in figures {
        warn!("悬空图片: {}", pending.filename);
        report.dangling.push(pending.filename);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteStore;
    use crate::models::graph::{Introduction, Test};
    use crate::services::lineage::make_revision;
    use chrono::NaiveDate;

    fn sample_test() -> Test {
        Test {
            title: "2016".to_string(),
            date: NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
        }
    }

    #[test]
    fn only_last_declared_figure_of_answer_figure_block_is_reclassified() {
        assert_eq!(classify(true, 0, 2), FigureKind::Figure);
        assert_eq!(classify(true, 1, 2), FigureKind::AnswerFigure);
        assert_eq!(classify(true, 0, 1), FigureKind::AnswerFigure);
        assert_eq!(classify(false, 0, 1), FigureKind::Figure);
    }

    #[test]
    fn declared_targets_repeat_block_once_per_filename() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut ctx = ImportCtx::new(&store, &store, sample_test());
        let revision = make_revision(&mut ctx, &[], 1).unwrap();
        let block = BlockId::Introduction(ctx.graph.add_introduction(Introduction {
            revision,
            text: None,
            source_code: None,
        }));

        let mut targets = FigureTargets::default();
        targets.push_declared(block, vec!["a.png".to_string(), "b.png".to_string()]);
        targets.push_declared(block, vec![]);

        assert_eq!(targets.blocks(), &[block, block]);
        assert_eq!(targets.declared_filenames(block).unwrap().len(), 2);
    }
}
