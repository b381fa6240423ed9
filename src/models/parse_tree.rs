//! 外部语法层输出的解析树
//!
//! 外部解析程序以 JSON 输出一个由可选键组成的映射（`RawParseTree`）。
//! 导入前先把它转换成带标签的 `ArchiveDocument`，两种方言各自得到精确类型的内容。

use serde::Deserialize;

use crate::error::ParseError;

/// 外部语法层原样输出的解析树
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawParseTree {
    #[serde(default)]
    pub authors: Vec<String>,
    pub title: Option<String>,
    pub content_plain: Option<Vec<String>>,
    pub content_markup: Option<Vec<MarkupBlock>>,
    pub question_count: Option<usize>,
    pub answer: Option<String>,
    pub points: Option<PointsDeclaration>,
    #[serde(default)]
    pub images: Vec<String>,
    pub reuse: Option<ReuseDeclaration>,
}

/// 复用声明：（先前试卷标题, 题组序号）
///
/// 档案里的标题通常就是年份，可能写成整数。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReuseDeclaration(
    #[serde(deserialize_with = "deserialize_title")] pub String,
    pub u32,
);

impl ReuseDeclaration {
    pub fn test_title(&self) -> &str {
        &self.0
    }

    pub fn group_order(&self) -> u32 {
        self.1
    }
}

// 标题既可能是字符串也可能是整数年份
fn deserialize_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct TitleVisitor;

    impl<'de> Visitor<'de> for TitleVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer test title")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(TitleVisitor)
}

/// 顶层分值声明
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PointsDeclaration {
    /// 单个数值，作用于第一道题
    Single(u32),
    /// （总分, [每题分值...]）
    Distribution(u32, Vec<u32>),
}

/// markup 方言中的一个块
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MarkupBlock {
    pub title: Option<String>,
    pub question: Option<QuestionText>,
    #[serde(default)]
    pub complete_text: bool,
    /// 答题图文件名；存在即表示题型为答题图
    pub answer_figure: Option<String>,
    #[serde(default)]
    pub draw_box: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub table: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub answer: Vec<String>,
    pub comments: Option<Vec<Vec<String>>>,
    pub figure: Option<String>,
    pub introduction: Option<String>,
    pub points: Option<u32>,
    pub reuse: Option<ReuseDeclaration>,
}

impl MarkupBlock {
    pub fn is_question(&self) -> bool {
        self.question.is_some()
    }

    pub fn is_introduction(&self) -> bool {
        self.introduction.is_some() || self.figure.is_some()
    }

    /// 块引用的图片文件名：先 figure，再 answer-figure
    pub fn figure_filenames(&self) -> Vec<String> {
        self.figure
            .iter()
            .chain(self.answer_figure.iter())
            .cloned()
            .collect()
    }
}

/// 题干：普通文本，或完形填空式的分段文本
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuestionText {
    Plain(String),
    Segments(Vec<QuestionSegment>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuestionSegment {
    Line(String),
    Choices(Vec<String>),
}

impl QuestionText {
    /// 重新拼接题干，选项组写成 `(a/b/c)`
    pub fn reassemble(&self) -> String {
        match self {
            QuestionText::Plain(text) => text.clone(),
            QuestionText::Segments(segments) => segments
                .iter()
                .map(|segment| match segment {
                    QuestionSegment::Line(line) => line.clone(),
                    QuestionSegment::Choices(choices) => format!("({})", choices.join("/")),
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// plain 方言内容
#[derive(Debug, Clone, Default)]
pub struct PlainContent {
    pub title: Option<String>,
    pub blocks: Vec<String>,
    pub question_count: Option<usize>,
    pub answer: Option<String>,
    pub points: Option<PointsDeclaration>,
    pub images: Vec<String>,
}

/// markup 方言内容
#[derive(Debug, Clone, Default)]
pub struct MarkupContent {
    pub blocks: Vec<MarkupBlock>,
}

impl MarkupContent {
    /// 第一个块声明的复用
    pub fn block_reuse(&self) -> Option<&ReuseDeclaration> {
        self.blocks.iter().find_map(|block| block.reuse.as_ref())
    }
}

#[derive(Debug, Clone)]
pub enum ArchiveContent {
    Plain(PlainContent),
    Markup(MarkupContent),
}

/// 一个文本档案的解析结果
#[derive(Debug, Clone)]
pub struct ArchiveDocument {
    pub authors: Vec<String>,
    pub reuse: Option<ReuseDeclaration>,
    pub content: ArchiveContent,
}

impl TryFrom<RawParseTree> for ArchiveDocument {
    type Error = ParseError;

    fn try_from(tree: RawParseTree) -> Result<Self, Self::Error> {
        let content = match (tree.content_plain, tree.content_markup) {
            (Some(blocks), None) => ArchiveContent::Plain(PlainContent {
                title: tree.title,
                blocks,
                question_count: tree.question_count,
                answer: tree.answer,
                points: tree.points,
                images: tree.images,
            }),
            (None, Some(blocks)) => ArchiveContent::Markup(MarkupContent { blocks }),
            (None, None) => return Err(ParseError::MissingContent),
            (Some(_), Some(_)) => return Err(ParseError::AmbiguousContent),
        };
        Ok(Self {
            authors: tree.authors,
            reuse: tree.reuse,
            content,
        })
    }
}
