//! 占位符替换
//!
//! 把文本叶子中的 `[Country]` / `{Country}` 之类的占位符替换为主体名称

use regex::Regex;

use crate::models::BlockNode;

/// 占位符替换器
#[derive(Debug, Clone)]
pub struct PlaceholderFiller {
    name: String,
    pattern: Regex,
}

impl PlaceholderFiller {
    /// `name` 为占位符名称，例如 `Country`
    pub fn new(name: &str) -> Result<Self, regex::Error> {
        let name = name.trim().to_string();
        let escaped = regex::escape(&name);
        let pattern = Regex::new(&format!(r"\[{0}\]|\{{{0}\}}", escaped))?;
        Ok(Self { name, pattern })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 就地替换，返回替换次数
    pub fn fill(&self, nodes: &mut [BlockNode], subject: &str) -> usize {
        let mut replaced = 0;
        for node in nodes.iter_mut() {
            node.walk_mut(&mut |n| {
                if let BlockNode::Text { text, .. } = n {
                    let count = self.pattern.find_iter(text).count();
                    if count > 0 {
                        *text = self
                            .pattern
                            .replace_all(text, regex::NoExpand(subject))
                            .into_owned();
                        replaced += count;
                    }
                }
            });
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_both_bracket_styles() {
        let filler = PlaceholderFiller::new("Country").unwrap();
        let mut nodes = vec![
            BlockNode::heading(2, "Climate Transparency in [Country]"),
            BlockNode::paragraph("{Country} reports to the UNFCCC. [Country]!"),
        ];
        let count = filler.fill(&mut nodes, "Kenya");
        assert_eq!(count, 3);
        assert_eq!(nodes[0].text_content(), "Climate Transparency in Kenya");
        assert_eq!(nodes[1].text_content(), "Kenya reports to the UNFCCC. Kenya!");
    }

    #[test]
    fn test_subject_is_inserted_literally() {
        let filler = PlaceholderFiller::new("Country").unwrap();
        let mut nodes = vec![BlockNode::paragraph("[Country]")];
        filler.fill(&mut nodes, "$1 Land");
        assert_eq!(nodes[0].text_content(), "$1 Land");
    }

    #[test]
    fn test_other_brackets_untouched() {
        let filler = PlaceholderFiller::new("Country").unwrap();
        let mut nodes = vec![BlockNode::paragraph("[XXX words] (Country) [country]")];
        assert_eq!(filler.fill(&mut nodes, "Kenya"), 0);
        assert_eq!(nodes[0].text_content(), "[XXX words] (Country) [country]");
    }
}
