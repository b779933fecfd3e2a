//! Block Node 模型
//!
//! 文档内容树中的节点。序列化格式与 ProseMirror JSON 保持一致：
//! 以 `"type"` 字段区分节点种类，子节点放在 `"content"` 数组中。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ShapeViolation;

/// 未建模的属性（`textAlign`、`colwidth` 等），按原样保留，包括显式的 `null`
pub type ExtraAttrs = Map<String, Value>;

/// 缺少 `level` 的标题按一级标题处理，章节因此延伸到下一个一级标题
pub const DEFAULT_HEADING_LEVEL: u8 = 1;

/// 标题属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(flatten)]
    pub extra: ExtraAttrs,
}

impl HeadingAttrs {
    pub fn with_level(level: u8) -> Self {
        Self {
            level: Some(level),
            extra: ExtraAttrs::new(),
        }
    }
}

/// 单元格属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowspan: Option<u32>,
    #[serde(flatten)]
    pub extra: ExtraAttrs,
}

impl CellAttrs {
    pub fn colspan(&self) -> u32 {
        self.colspan.unwrap_or(1)
    }

    pub fn rowspan(&self) -> u32 {
        self.rowspan.unwrap_or(1)
    }
}

/// 有序列表属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(flatten)]
    pub extra: ExtraAttrs,
}

/// 行内样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
}

/// 文档节点
///
/// `attrs` 缺省时序列化同样省略，未改写的节点可以原样写回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockNode {
    Heading {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<HeadingAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    Paragraph {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    Table {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    TableRow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    TableCell {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<CellAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    TableHeader {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<CellAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    BulletList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    OrderedList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<OrderedListAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    ListItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attrs: Option<ExtraAttrs>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<BlockNode>,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
}

/// 节点种类（不带数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Heading,
    Paragraph,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    BulletList,
    OrderedList,
    ListItem,
    Text,
}

impl NodeKind {
    /// 序列化时使用的名称
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Heading => "heading",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableCell => "tableCell",
            NodeKind::TableHeader => "tableHeader",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList => "orderedList",
            NodeKind::ListItem => "listItem",
            NodeKind::Text => "text",
        }
    }

    /// 是否可以出现在文档顶层 / 单元格 / 列表项中
    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeKind::Heading
                | NodeKind::Paragraph
                | NodeKind::Table
                | NodeKind::BulletList
                | NodeKind::OrderedList
        )
    }
}

impl BlockNode {
    /// 便捷构造：纯文本叶子
    pub fn text(text: impl Into<String>) -> Self {
        BlockNode::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// 便捷构造：带单个文本叶子的标题
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        BlockNode::Heading {
            attrs: Some(HeadingAttrs::with_level(level)),
            content: vec![BlockNode::text(text)],
        }
    }

    /// 便捷构造：带单个文本叶子的段落
    pub fn paragraph(text: impl Into<String>) -> Self {
        BlockNode::Paragraph {
            attrs: None,
            content: vec![BlockNode::text(text)],
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            BlockNode::Heading { .. } => NodeKind::Heading,
            BlockNode::Paragraph { .. } => NodeKind::Paragraph,
            BlockNode::Table { .. } => NodeKind::Table,
            BlockNode::TableRow { .. } => NodeKind::TableRow,
            BlockNode::TableCell { .. } => NodeKind::TableCell,
            BlockNode::TableHeader { .. } => NodeKind::TableHeader,
            BlockNode::BulletList { .. } => NodeKind::BulletList,
            BlockNode::OrderedList { .. } => NodeKind::OrderedList,
            BlockNode::ListItem { .. } => NodeKind::ListItem,
            BlockNode::Text { .. } => NodeKind::Text,
        }
    }

    /// 子节点（文本叶子没有子节点）
    pub fn children(&self) -> &[BlockNode] {
        match self {
            BlockNode::Heading { content, .. }
            | BlockNode::Paragraph { content, .. }
            | BlockNode::Table { content, .. }
            | BlockNode::TableRow { content, .. }
            | BlockNode::TableCell { content, .. }
            | BlockNode::TableHeader { content, .. }
            | BlockNode::BulletList { content, .. }
            | BlockNode::OrderedList { content, .. }
            | BlockNode::ListItem { content, .. } => content,
            BlockNode::Text { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<BlockNode>> {
        match self {
            BlockNode::Heading { content, .. }
            | BlockNode::Paragraph { content, .. }
            | BlockNode::Table { content, .. }
            | BlockNode::TableRow { content, .. }
            | BlockNode::TableCell { content, .. }
            | BlockNode::TableHeader { content, .. }
            | BlockNode::BulletList { content, .. }
            | BlockNode::OrderedList { content, .. }
            | BlockNode::ListItem { content, .. } => Some(content),
            BlockNode::Text { .. } => None,
        }
    }

    /// 如果是标题，返回其级别
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockNode::Heading { attrs, .. } => Some(
                attrs
                    .as_ref()
                    .and_then(|a| a.level)
                    .unwrap_or(DEFAULT_HEADING_LEVEL),
            ),
            _ => None,
        }
    }

    /// 先序遍历自身及所有后代节点
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a BlockNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// 先序遍历（可变），用于就地改写文本
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut BlockNode)) {
        visit(self);
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut() {
                child.walk_mut(visit);
            }
        }
    }

    /// 拼接所有后代文本叶子
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node| {
            if let BlockNode::Text { text, .. } = node {
                out.push_str(text);
            }
        });
        out
    }

    /// 校验单个节点（递归）是否满足结构约定
    ///
    /// `path` 用于错误定位，例如 `[3].content[0]`
    pub fn validate(&self, path: &str) -> Result<(), ShapeViolation> {
        match self {
            BlockNode::Heading { attrs, content } => {
                if let Some(level) = attrs.as_ref().and_then(|a| a.level) {
                    if !(1..=6).contains(&level) {
                        return Err(ShapeViolation::new(
                            path,
                            format!("标题级别 {} 不在 1..=6 范围内", level),
                        ));
                    }
                }
                validate_children(path, content, |k| k == NodeKind::Text, "text")
            }
            BlockNode::Paragraph { content, .. } => {
                validate_children(path, content, |k| k == NodeKind::Text, "text")
            }
            BlockNode::Table { content, .. } => {
                require_non_empty(path, content, "tableRow")?;
                validate_children(path, content, |k| k == NodeKind::TableRow, "tableRow")
            }
            BlockNode::TableRow { content, .. } => {
                require_non_empty(path, content, "tableCell/tableHeader")?;
                validate_children(
                    path,
                    content,
                    |k| matches!(k, NodeKind::TableCell | NodeKind::TableHeader),
                    "tableCell/tableHeader",
                )
            }
            BlockNode::TableCell { attrs, content } | BlockNode::TableHeader { attrs, content } => {
                let spans = attrs.as_ref().map_or((1, 1), |a| (a.colspan(), a.rowspan()));
                if spans.0 == 0 || spans.1 == 0 {
                    return Err(ShapeViolation::new(path, "colspan/rowspan 必须至少为 1"));
                }
                validate_children(path, content, NodeKind::is_block, "block")
            }
            BlockNode::BulletList { content, .. } | BlockNode::OrderedList { content, .. } => {
                validate_children(path, content, |k| k == NodeKind::ListItem, "listItem")
            }
            BlockNode::ListItem { content, .. } => {
                validate_children(path, content, NodeKind::is_block, "block")
            }
            BlockNode::Text { text, marks } => {
                if text.is_empty() {
                    return Err(ShapeViolation::new(path, "文本叶子不能为空"));
                }
                for (i, mark) in marks.iter().enumerate() {
                    if marks[..i].contains(mark) {
                        return Err(ShapeViolation::new(path, format!("重复的样式 {:?}", mark)));
                    }
                }
                Ok(())
            }
        }
    }
}

fn require_non_empty(
    path: &str,
    content: &[BlockNode],
    expected: &str,
) -> Result<(), ShapeViolation> {
    if content.is_empty() {
        return Err(ShapeViolation::new(
            path,
            format!("至少需要一个 {} 子节点", expected),
        ));
    }
    Ok(())
}

fn validate_children(
    path: &str,
    content: &[BlockNode],
    allowed: impl Fn(NodeKind) -> bool,
    expected: &str,
) -> Result<(), ShapeViolation> {
    for (i, child) in content.iter().enumerate() {
        let child_path = format!("{}.content[{}]", path, i);
        if !allowed(child.kind()) {
            return Err(ShapeViolation::new(
                child_path,
                format!("期望 {}，实际为 {}", expected, child.kind().name()),
            ));
        }
        child.validate(&child_path)?;
    }
    Ok(())
}

/// 校验一段可被拼接进文档顶层的节点序列
pub fn validate_sequence(nodes: &[BlockNode]) -> Result<(), ShapeViolation> {
    for (i, node) in nodes.iter().enumerate() {
        let path = format!("[{}]", i);
        if !node.kind().is_block() {
            return Err(ShapeViolation::new(
                path,
                format!("顶层不允许出现 {} 节点", node.kind().name()),
            ));
        }
        node.validate(&path)?;
    }
    Ok(())
}

/// 节点统计，用于比较生成前后的结构
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCensus {
    pub headings: usize,
    pub paragraphs: usize,
    pub tables: usize,
    pub lists: usize,
}

impl NodeCensus {
    pub fn of(nodes: &[BlockNode]) -> Self {
        let mut census = Self::default();
        for node in nodes {
            node.walk(&mut |n| match n.kind() {
                NodeKind::Heading => census.headings += 1,
                NodeKind::Paragraph => census.paragraphs += 1,
                NodeKind::Table => census.tables += 1,
                NodeKind::BulletList | NodeKind::OrderedList => census.lists += 1,
                _ => {}
            });
        }
        census
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cell(text: &str) -> BlockNode {
        BlockNode::TableCell {
            attrs: None,
            content: vec![BlockNode::paragraph(text)],
        }
    }

    #[test]
    fn test_deserialize_prosemirror_heading() {
        let value = json!({
            "type": "heading",
            "attrs": { "level": 2, "textAlign": "left" },
            "content": [
                { "type": "text", "text": "GHG Inventory " },
                { "type": "text", "text": "Module", "marks": [{ "type": "bold" }] }
            ]
        });
        let node: BlockNode = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(node.heading_level(), Some(2));
        assert_eq!(node.text_content(), "GHG Inventory Module");
        assert_eq!(serde_json::to_value(&node).unwrap(), value);
    }

    #[test]
    fn test_tiptap_attrs_survive_round_trip() {
        let value = json!([
            { "type": "paragraph", "attrs": { "textAlign": "justify" }, "content": [{ "type": "text", "text": "Intro" }] },
            { "type": "table", "content": [
                { "type": "tableRow", "content": [
                    { "type": "tableHeader", "attrs": { "colspan": 1, "rowspan": 1, "colwidth": null }, "content": [
                        { "type": "paragraph", "attrs": { "textAlign": null }, "content": [{ "type": "text", "text": "Year" }] }
                    ] },
                    { "type": "tableCell", "attrs": { "colspan": 2, "rowspan": 1, "colwidth": [120, 80] }, "content": [
                        { "type": "paragraph" }
                    ] }
                ] }
            ] },
            { "type": "orderedList", "attrs": { "start": 3, "type": null }, "content": [
                { "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "item" }] }] }
            ] },
            { "type": "heading", "content": [{ "type": "text", "text": "No attrs" }] }
        ]);
        let nodes: Vec<BlockNode> = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(serde_json::to_value(&nodes).unwrap(), value);
        assert!(validate_sequence(&nodes).is_ok());
    }

    #[test]
    fn test_missing_heading_level_defaults_to_one() {
        let node: BlockNode = serde_json::from_value(json!({
            "type": "heading",
            "attrs": { "textAlign": "left" },
            "content": [{ "type": "text", "text": "X" }]
        }))
        .unwrap();
        assert_eq!(node.heading_level(), Some(DEFAULT_HEADING_LEVEL));
        assert_eq!(DEFAULT_HEADING_LEVEL, 1);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = serde_json::from_value::<BlockNode>(json!({ "type": "blink", "content": [] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_cell_spans_default_to_one() {
        let node: BlockNode = serde_json::from_value(json!({
            "type": "tableHeader",
            "content": [{ "type": "paragraph" }]
        }))
        .unwrap();
        match node {
            BlockNode::TableHeader { attrs, .. } => {
                assert_eq!(attrs, None);
                let attrs = CellAttrs::default();
                assert_eq!((attrs.colspan(), attrs.rowspan()), (1, 1));
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_table() {
        let table = BlockNode::Table {
            attrs: None,
            content: vec![BlockNode::TableRow {
                attrs: None,
                content: vec![cell("a"), cell("b")],
            }],
        };
        assert!(validate_sequence(&[table]).is_ok());
    }

    #[test]
    fn test_validate_rejects_text_directly_in_row() {
        let table = BlockNode::Table {
            attrs: None,
            content: vec![BlockNode::TableRow {
                attrs: None,
                content: vec![BlockNode::text("loose")],
            }],
        };
        let err = validate_sequence(&[table]).unwrap_err();
        assert_eq!(err.path, "[0].content[0].content[0]");
    }

    #[test]
    fn test_validate_rejects_zero_span() {
        let table = BlockNode::Table {
            attrs: None,
            content: vec![BlockNode::TableRow {
                attrs: None,
                content: vec![BlockNode::TableCell {
                    attrs: Some(CellAttrs {
                        colspan: Some(0),
                        ..CellAttrs::default()
                    }),
                    content: vec![BlockNode::paragraph("c")],
                }],
            }],
        };
        assert!(validate_sequence(&[table]).is_err());
    }

    #[test]
    fn test_validate_rejects_top_level_text_and_bad_level() {
        assert!(validate_sequence(&[BlockNode::text("x")]).is_err());
        assert!(validate_sequence(&[BlockNode::heading(7, "x")]).is_err());
        assert!(validate_sequence(&[BlockNode::paragraph("")]).is_err());
    }

    #[test]
    fn test_census_counts_nested_tables() {
        let nodes = vec![
            BlockNode::heading(2, "h"),
            BlockNode::BulletList {
                attrs: None,
                content: vec![BlockNode::ListItem {
                    attrs: None,
                    content: vec![BlockNode::paragraph("p")],
                }],
            },
            BlockNode::Table {
                attrs: None,
                content: vec![BlockNode::TableRow {
                    attrs: None,
                    content: vec![cell("c")],
                }],
            },
        ];
        let census = NodeCensus::of(&nodes);
        assert_eq!(census.headings, 1);
        assert_eq!(census.tables, 1);
        assert_eq!(census.lists, 1);
        assert_eq!(census.paragraphs, 2);
    }
}
