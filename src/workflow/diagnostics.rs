//! 方言导入中的软性问题
//!
//! 这些问题只记日志，不中断导入；同时记录在这里，供统计和测试读取。

/// 一个题组在内容上的软性问题
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDiagnostics {
    /// 声明的题目数超过块数：(声明的题目数, 块数)
    pub overclaimed_questions: Option<(usize, usize)>,
    /// 分项之和与总分不符：(分项之和, 总分)
    pub points_sum_mismatch: Option<(u64, u32)>,
    /// 分项数与题目绑定数不符：(分项数, 题目绑定数)
    pub points_count_mismatch: Option<(usize, usize)>,
    /// 被跳过的标题前言不止一行：源码行数
    pub multiline_preamble: Option<usize>,
}

impl ContentDiagnostics {
    /// 记录到的问题个数
    pub fn count(&self) -> usize {
        [
            self.overclaimed_questions.is_some(),
            self.points_sum_mismatch.is_some(),
            self.points_count_mismatch.is_some(),
            self.multiline_preamble.is_some(),
        ]
        .into_iter()
        .filter(|&found| found)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
