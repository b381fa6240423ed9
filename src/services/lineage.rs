//! 作者修订与题组谱系 - 业务能力层
//!
//! 每个导入的题组恰好有一个 `Revision`。复用声明把新题组挂到先前题组的谱系上，
//! 并记录一条历史边；没有复用声明时分配新的谱系。

use chrono::Local;
use tracing::debug;

use crate::error::{AppResult, LineageError};
use crate::models::graph::{Group, GroupHistory, GroupId, GroupRef, NetworkRef, Revision, RevisionId};
use crate::models::parse_tree::ReuseDeclaration;
use crate::workflow::ImportCtx;

pub const UNKNOWN_AUTHOR_NAME: &str = "unattributed";
pub const UNKNOWN_AUTHOR_FULL_NAME: &str = "Unidentified Author";

/// 提交信息首行
pub fn revision_message(group_order: u32, test_title: &str) -> String {
    format!("Auto import of group {} within test \"{}\".", group_order, test_title)
}

/// 提交信息末尾的合著者说明
pub fn attribution_note(co_authors: &[&str]) -> String {
    format!("\nOther authors mentioned in archive: {}.", co_authors.join(", "))
}

/// 为正在导入的题组创建修订
///
/// 没有声明作者时使用固定的 "unattributed" 人员；第一位作者为主作者，
/// 其余作者只写进提交信息。
pub fn make_revision(
    ctx: &mut ImportCtx<'_>,
    authors: &[String],
    group_order: u32,
) -> AppResult<RevisionId> {
    let authors: Vec<&str> = authors
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    debug!("make_revision({:?}, {}, {})", authors, group_order, ctx.test_title());

    let mut commit_message = revision_message(group_order, ctx.test_title());
    let author = match authors.split_first() {
        None => {
            debug!("make_revision: 使用缺省作者 {}", UNKNOWN_AUTHOR_NAME);
            ctx.person(UNKNOWN_AUTHOR_NAME, Some(UNKNOWN_AUTHOR_FULL_NAME))?
        }
        Some((primary, co_authors)) => {
            if !co_authors.is_empty() {
                commit_message.push_str(&attribution_note(co_authors));
            }
            ctx.person(primary, None)?
        }
    };

    Ok(ctx.graph.add_revision(Revision {
        author,
        timestamp: Local::now(),
        commit_message,
    }))
}

/// 解析复用声明指向的唯一祖先题组
///
/// 同时查找本次运行已暂存的题组和数据库中的题组，必须恰好命中一个。
pub fn resolve_ancestor(
    ctx: &ImportCtx<'_>,
    reuse: &ReuseDeclaration,
) -> AppResult<(GroupRef, NetworkRef)> {
    let title = reuse.test_title();
    let order = reuse.group_order();

    let mut candidates: Vec<(GroupRef, NetworkRef)> = ctx
        .graph
        .find_staged_groups(title, order)
        .into_iter()
        .map(|id| (GroupRef::Staged(id), ctx.graph.group(id).network))
        .collect();
    candidates.extend(
        ctx.lineage()
            .find_ancestors(title, order)?
            .into_iter()
            .map(|a| (GroupRef::Stored(a.id), NetworkRef::Stored(a.network_id))),
    );

    match candidates.len() {
        0 => Err(LineageError::AncestorNotFound {
            title: title.to_string(),
            order,
        }
        .into()),
        1 => Ok(candidates[0]),
        count => Err(LineageError::AmbiguousAncestor {
            title: title.to_string(),
            order,
            count,
        }
        .into()),
    }
}

/// 创建题组，处理复用与格式
pub fn make_group(
    ctx: &mut ImportCtx<'_>,
    revision: RevisionId,
    reuse: Option<&ReuseDeclaration>,
    format_name: &str,
) -> AppResult<GroupId> {
    let (parent, network) = match reuse {
        Some(reuse) => {
            let (parent, network) = resolve_ancestor(ctx, reuse)?;
            debug!(
                "{} 复用试卷 \"{}\" 第 {} 组",
                ctx,
                reuse.test_title(),
                reuse.group_order()
            );
            (Some(parent), network)
        }
        None => (None, NetworkRef::Staged(ctx.graph.new_group_network())),
    };

    let format = ctx.format(format_name)?;
    let group = ctx.graph.add_group(Group {
        revision,
        format,
        network,
        title: None,
    });

    if let Some(parent) = parent {
        ctx.graph.add_group_history(GroupHistory {
            parent,
            child: group,
        });
    }

    Ok(group)
}
