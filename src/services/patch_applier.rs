//! 补丁拼接 - 业务能力层
//!
//! 按起始位置降序把替换序列拼回文档，
//! 这样先处理的替换不会使后处理的索引失效。
//! 范围互相重叠时不做检测（低索引的替换最后执行）。

use tracing::{debug, warn};

use crate::models::{BlockNode, Document, SectionRange};

/// 单个章节的替换
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub nodes: Vec<BlockNode>,
}

impl Replacement {
    pub fn new(range: SectionRange, nodes: Vec<BlockNode>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            nodes,
        }
    }
}

/// 把所有替换应用到文档副本上，原文档不变
pub fn apply(base: &Document, mut replacements: Vec<Replacement>) -> Document {
    let mut document = base.clone();
    // 稳定排序：起点相同的替换保持提交顺序
    replacements.sort_by(|a, b| b.start.cmp(&a.start));

    for replacement in replacements {
        let Replacement { start, end, nodes } = replacement;
        if start > end || end > document.content.len() {
            warn!(
                "⚠️ 跳过越界替换 [{}, {}) (文档长度 {})",
                start,
                end,
                document.content.len()
            );
            continue;
        }
        debug!("[拼接] [{}, {}) -> {} 个节点", start, end, nodes.len());
        document.content.splice(start..end, nodes);
    }
    document
}
