//! 章节定位 - 业务能力层
//!
//! 只负责"在文档顶层中找到某个章节的范围"，不关心生成和拼接。
//!
//! 规则：
//! - 遍历顶层节点一次，对每个标题拼接其后代文本，trim + 小写后与模式比较
//! - 完全相等的匹配优先于子串包含；否则取文档顺序中第一个包含匹配
//! - 重复的同名标题不做区分，后出现的被忽略
//! - 章节结束于下一个级别 ≤ 当前标题级别的标题，找不到则到文档末尾

use tracing::debug;

use crate::error::SectionError;
use crate::models::{BlockNode, HeadingMatch, SectionPattern, SectionRange, SectionRegistry};

/// 标题的规范化文本
pub fn heading_text(node: &BlockNode) -> Option<String> {
    node.heading_level()
        .map(|_| node.text_content().trim().to_lowercase())
}

/// 在顶层节点中按模式定位章节
pub fn locate_pattern(content: &[BlockNode], pattern: &SectionPattern) -> Option<SectionRange> {
    let mut first_substring: Option<(usize, u8)> = None;
    let mut exact: Option<(usize, u8)> = None;

    for (index, node) in content.iter().enumerate() {
        let (Some(level), Some(text)) = (node.heading_level(), heading_text(node)) else {
            continue;
        };
        match pattern.match_heading(&text, level) {
            Some(HeadingMatch::Exact) => {
                exact = Some((index, level));
                break;
            }
            Some(HeadingMatch::Substring) if first_substring.is_none() => {
                first_substring = Some((index, level));
            }
            _ => {}
        }
    }

    let (start, level) = exact.or(first_substring)?;
    let end = section_end(content, start, level);
    SectionRange::new(start, end)
}

/// 从 `start` 之后找到第一个级别 ≤ `level` 的标题
pub fn section_end(content: &[BlockNode], start: usize, level: u8) -> usize {
    content
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, node)| node.heading_level().is_some_and(|l| l <= level))
        .map(|(index, _)| index)
        .unwrap_or(content.len())
}

/// 按章节名定位
///
/// 章节名必须已在注册表中（预检阶段保证）；
/// 文档里找不到对应标题时返回 `SectionError::NotFound`
pub fn locate(
    content: &[BlockNode],
    section_name: &str,
    registry: &SectionRegistry,
) -> Result<SectionRange, SectionError> {
    let pattern = registry
        .get(section_name)
        .ok_or_else(|| SectionError::InvalidSectionNames(vec![section_name.to_string()]))?;

    let range = locate_pattern(content, pattern).ok_or_else(|| SectionError::NotFound {
        section: section_name.to_string(),
    })?;

    debug!(
        "[章节 {}] 定位到范围 [{}, {})",
        section_name, range.start, range.end
    );
    Ok(range)
}

/// 判断 `content[index]` 是否是该章节的标题
pub fn is_section_heading(content: &[BlockNode], index: usize, pattern: &SectionPattern) -> bool {
    content
        .get(index)
        .and_then(|node| Some((node.heading_level()?, heading_text(node)?)))
        .is_some_and(|(level, text)| pattern.match_heading(&text, level).is_some())
}
