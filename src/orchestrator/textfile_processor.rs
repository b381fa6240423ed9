//! 单个文本文件处理器 - 编排层
//!
//! ## 职责
//!
//! 把一个档案文本文件变成一个暂存的题组：
//!
//! 1. **读取**：按默认编码读取，失败时回退到 Windows-1252
//! 2. **解析**：交给外部语法层，得到带方言标记的文档
//! 3. **修订**：为题组创建作者修订
//! 4. **分派**：按方言委托给 plain / markup 导入器
//!
//! 图片绑定不在这里做：题组边界要等到下一个文本文件或目录结束才能确定。

use std::path::Path;
use tracing::debug;

use crate::error::AppResult;
use crate::infrastructure::ArchiveParser;
use crate::models::parse_tree::{ArchiveContent, ArchiveDocument};
use crate::models::read_archive_text;
use crate::services::figure_binder::ImportedGroup;
use crate::services::lineage::make_revision;
use crate::utils::logging::truncate_text;
use crate::workflow::{import_markup, import_plain, ImportCtx};

/// 导入一个文本文件
///
/// # 参数
/// - `ctx`: 本次运行的上下文
/// - `parser`: 外部语法层
/// - `directory`: 档案目录
/// - `filename`: 文本文件名（不含目录）
/// - `group_order`: 该题组在试卷中的序号，写入修订的提交信息
pub async fn import_textfile<P: ArchiveParser + ?Sized>(
    ctx: &mut ImportCtx<'_>,
    parser: &P,
    directory: &Path,
    filename: &str,
    group_order: u32,
) -> AppResult<ImportedGroup> {
    let text = read_archive_text(&directory.join(filename)).await?;
    debug!("{} {}: {}", ctx, filename, truncate_text(text.trim(), 40));

    let document = ArchiveDocument::try_from(parser.parse_document(&text).await?)?;
    let revision = make_revision(ctx, &document.authors, group_order)?;

    match &document.content {
        ArchiveContent::Plain(content) => {
            import_plain(ctx, content, document.reuse.as_ref(), revision)
        }
        ArchiveContent::Markup(content) => {
            let sources = parser.parse_sources(&text).await?;
            import_markup(ctx, content, &sources, document.reuse.as_ref(), revision)
        }
    }
}
