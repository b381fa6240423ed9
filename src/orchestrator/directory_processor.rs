//! 档案目录导入器 - 编排层
//!
//! ## 职责
//!
//! 本模块是一次导入的入口，负责整个目录的处理和事务边界。
//!
//! ## 核心功能
//!
//! 1. **试卷身份**：从目录名推导缺省的标题与年份，日期固定为当年 6 月 1 日
//! 2. **文件顺序**：使用调用方给出的顺序，或按文件名推导
//! 3. **逐个处理**：文本文件开启新题组，其余文件作为图片累积到当前题组
//! 4. **图片绑定**：在题组边界（下一个文本文件或目录结束）绑定累积的图片
//! 5. **事务提交**：全部暂存完成后一次性写入存储，任何错误都不会留下部分数据
//!
//! ## 设计特点
//!
//! - **严格顺序**：文件一个接一个处理，没有并发
//! - **运行级状态**：缓存和暂存图都属于本次调用的 `ImportCtx`
//! - **向下委托**：委托 textfile_processor 处理单个文本文件

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, ConfigError, FileError};
use crate::infrastructure::{ArchiveParser, Store};
use crate::models::graph::{Test, TestGroupBinding};
use crate::models::{list_directory, load_figure, PendingFigure};
use crate::orchestrator::textfile_processor::import_textfile;
use crate::services::figure_binder::{bind_figures, BindingReport, ImportedGroup};
use crate::services::filename_order::order_files;
use crate::utils::logging::{log_startup, log_textfile_start};
use crate::workflow::ImportCtx;

/// 文件处理顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOrder {
    /// 按文件名推导
    Filenames,
    /// 调用方给出的文件名列表，图片紧跟在引用它们的文本文件之后
    Explicit(Vec<String>),
}

/// 一次导入请求
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub directory: PathBuf,
    pub title: Option<String>,
    pub year: Option<String>,
    pub file_order: FileOrder,
}

impl ImportRequest {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            title: None,
            year: None,
            file_order: FileOrder::Filenames,
        }
    }
}

/// 导入统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub test_title: String,
    pub groups: usize,
    pub questions: usize,
    pub introductions: usize,
    pub figures_bound: usize,
    pub dangling_figures: usize,
    pub unfulfilled_expectations: usize,
    /// 内容上的软性问题（题目数、分值、前言）
    pub content_warnings: usize,
    pub rows_inserted: usize,
}

impl ImportSummary {
    fn record(&mut self, report: &BindingReport) {
        self.figures_bound += report.bound.len();
        self.dangling_figures += report.dangling.len();
        self.unfulfilled_expectations += report.unfulfilled.len();
    }
}

/// 推导试卷标题与日期
///
/// 年份缺省取目录路径的最后一段，标题缺省等于年份。
pub fn resolve_test_identity(
    directory: &Path,
    title: Option<&str>,
    year: Option<&str>,
) -> AppResult<Test> {
    let year = match year {
        Some(year) => year.to_string(),
        None => directory
            .components()
            .next_back()
            .map(|last| last.as_os_str().to_string_lossy().to_string())
            .filter(|name| !name.is_empty() && name != "." && name != "..")
            .ok_or_else(|| ConfigError::NoDirectoryName {
                path: directory.display().to_string(),
            })?,
    };

    let date = year
        .trim()
        .parse::<i32>()
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, 6, 1))
        .ok_or_else(|| ConfigError::InvalidYear {
            value: year.clone(),
        })?;

    Ok(Test {
        title: title.map(str::to_string).unwrap_or(year),
        date,
    })
}

/// 当前尚未绑定图片的题组
struct OpenGroup {
    imported: ImportedGroup,
    figures: Vec<PendingFigure>,
}

fn close_group(
    ctx: &mut ImportCtx<'_>,
    open: Option<OpenGroup>,
    summary: &mut ImportSummary,
) -> AppResult<()> {
    if let Some(open) = open {
        let report = bind_figures(ctx, &open.imported, open.figures)?;
        summary.record(&report);
    }
    Ok(())
}

/// 导入一个档案目录
///
/// 运行期间只向存储发起查询；全部实体暂存在内存中，成功后由 `Store::persist`
/// 在一个事务里写入。任何错误都会让本次导入不留下任何数据。
pub async fn import_directory<S, P>(
    store: &mut S,
    parser: &P,
    config: &Config,
    request: ImportRequest,
) -> AppResult<ImportSummary>
where
    S: Store,
    P: ArchiveParser + ?Sized,
{
    let directory = request.directory.as_path();
    let test = resolve_test_identity(
        directory,
        request.title.as_deref(),
        request.year.as_deref(),
    )?;

    let files = match request.file_order {
        FileOrder::Explicit(files) => files,
        FileOrder::Filenames => order_files(list_directory(directory).await?, config),
    };
    log_startup(&directory.display().to_string(), &test.title, files.len());

    let mut summary = ImportSummary {
        test_title: test.title.clone(),
        ..Default::default()
    };

    let graph = {
        let lookup: &S = store;
        let mut ctx = ImportCtx::new(lookup, lookup, test);
        let mut open: Option<OpenGroup> = None;
        let mut group_order = 0u32;

        for filename in &files {
            if config.is_text_file(filename) {
                close_group(&mut ctx, open.take(), &mut summary)?;

                group_order += 1;
                log_textfile_start(group_order, filename);
                let imported = import_textfile(&mut ctx, parser, directory, filename, group_order)
                    .await
                    .inspect_err(|e| error!("{} {} 导入失败: {}", ctx, filename, e))?;

                summary.content_warnings += imported.diagnostics.count();

                let test = ctx.test();
                ctx.graph.bind_test_group(TestGroupBinding {
                    test,
                    group: imported.group,
                    order: group_order,
                });
                open = Some(OpenGroup {
                    imported,
                    figures: Vec::new(),
                });
            } else {
                let Some(current) = open.as_mut() else {
                    return Err(FileError::FigureWithoutGroup {
                        filename: filename.clone(),
                    }
                    .into());
                };
                current.figures.push(load_figure(directory, filename).await?);
            }
        }
        close_group(&mut ctx, open.take(), &mut summary)?;

        if group_order == 0 {
            warn!("{} 目录中没有文本文件", ctx);
        }
        ctx.into_graph()
    };

    summary.groups = graph.test_group_bindings().len();
    summary.questions = graph.questions().len();
    summary.introductions = graph.introductions().len();

    let persisted = store.persist(&graph)?;
    summary.rows_inserted = persisted.rows_inserted;
    info!(
        "💾 试卷 \"{}\" 已提交: {} 行",
        summary.test_title, summary.rows_inserted
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use pretty_assertions::assert_eq;

    #[test]
    fn year_and_title_default_to_directory_name() {
        let test = resolve_test_identity(Path::new("/archive/biologie/2016/"), None, None).unwrap();
        assert_eq!(test.title, "2016");
        assert_eq!(test.date, NaiveDate::from_ymd_opt(2016, 6, 1).unwrap());
    }

    #[test]
    fn explicit_title_keeps_year_from_directory() {
        let test =
            resolve_test_identity(Path::new("archive/2019"), Some("Voorronde 2019"), None).unwrap();
        assert_eq!(test.title, "Voorronde 2019");
        assert_eq!(test.date, NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
    }

    #[test]
    fn explicit_year_becomes_default_title() {
        let test = resolve_test_identity(Path::new("archive/finale"), None, Some("2021")).unwrap();
        assert_eq!(test.title, "2021");
    }

    #[test]
    fn non_numeric_directory_name_is_rejected() {
        let err = resolve_test_identity(Path::new("archive/finale"), None, None).unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::InvalidYear { ref value }) if value == "finale"
        ));
    }
}
