//! 文档模型
//!
//! 文档只是顶层节点的有序序列；标题不单独存储，由第一个一级标题推导

use serde::{Deserialize, Serialize};

use super::block::BlockNode;

/// 默认文档标题
pub const DEFAULT_TITLE: &str = "Project Information Form";

/// 序列化时固定输出 `"type": "doc"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    #[default]
    #[serde(rename = "doc")]
    Doc,
}

/// 文档
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type", default)]
    doc_type: DocType,
    #[serde(default)]
    pub content: Vec<BlockNode>,
}

impl Document {
    pub fn new(content: Vec<BlockNode>) -> Self {
        Self {
            doc_type: DocType::Doc,
            content,
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// 第一个一级标题的文本
    pub fn title(&self) -> Option<String> {
        self.content
            .iter()
            .find(|node| node.heading_level() == Some(1))
            .map(BlockNode::text_content)
    }

    /// 标题，缺失时使用默认值
    pub fn title_or_default(&self) -> String {
        self.title()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    /// 模板指纹：节点数 + 内容哈希
    pub fn fingerprint(&self) -> TemplateFingerprint {
        let bytes = serde_json::to_vec(&self.content).unwrap_or_default();
        TemplateFingerprint {
            node_count: self.content.len(),
            hash: blake3::hash(&bytes).to_hex().to_string(),
        }
    }
}

/// 模板实例指纹
///
/// 只有指纹一致时，预先计算的章节边界才可信
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFingerprint {
    pub node_count: usize,
    pub hash: String,
}
