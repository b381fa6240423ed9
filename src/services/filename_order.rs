//! 文件名排序 - 业务能力层
//!
//! 没有显式顺序时，从文件名推导处理顺序：同一个档案编号下文本文件在前、图片在后，
//! 编号之间按数字-字母顺序（`2` 在 `10` 之前）递增。

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::config::Config;

/// 排序键的一个分量
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Number(u64),
    Text(String),
}

const CONTENT_TAG: &str = "c";
const FIGURE_TAG: &str = "f";

fn part_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+|[^\W\d_]+").expect("valid filename part pattern"))
}

/// 把文件名主干拆成数字段与字母段，其余字符视为分隔符
pub fn filename_parts(root: &str) -> Vec<KeyPart> {
    part_pattern()
        .find_iter(root)
        .map(|m| {
            let run = m.as_str();
            run.parse::<u64>()
                .map(KeyPart::Number)
                .unwrap_or_else(|_| KeyPart::Text(run.to_lowercase()))
        })
        .collect()
}

/// 文件名的排序键：在第二个位置插入 'c'（文本）或 'f'（图片）
pub fn filename_order_key(name: &str, is_text: bool) -> Vec<KeyPart> {
    let root = Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut parts = filename_parts(&root);
    let tag = if is_text { CONTENT_TAG } else { FIGURE_TAG };
    parts.insert(parts.len().min(1), KeyPart::Text(tag.to_string()));
    parts
}

/// 按数字-字母顺序排列目录中的文件
pub fn order_files(mut names: Vec<String>, config: &Config) -> Vec<String> {
    names.sort_by_cached_key(|name| (filename_order_key(name, config.is_text_file(name)), name.clone()));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn indices_sort_numerically_with_text_before_figures() {
        let files = names(&["10.txt", "2a.png", "2.txt", "1b.png", "1.txt", "1a.png"]);
        assert_eq!(
            order_files(files, &Config::default()),
            names(&["1.txt", "1a.png", "1b.png", "2.txt", "2a.png", "10.txt"])
        );
    }

    #[test]
    fn figure_sharing_the_text_root_follows_the_text() {
        let files = names(&["3.png", "3.txt"]);
        assert_eq!(order_files(files, &Config::default()), names(&["3.txt", "3.png"]));
    }

    #[test]
    fn tag_is_inserted_as_second_component() {
        assert_eq!(
            filename_order_key("12b-3.png", false),
            vec![
                KeyPart::Number(12),
                KeyPart::Text("f".to_string()),
                KeyPart::Text("b".to_string()),
                KeyPart::Number(3),
            ]
        );
    }
}
