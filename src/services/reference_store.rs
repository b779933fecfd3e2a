//! 参考资料存储（只读）
//!
//! 按主体（例如国家）保存之前抽取好的原文资料，
//! 填充模式下作为 prompt 的主要依据。

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// 参考资料来源
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// 读取某个主体的资料；不存在时返回 `None`
    async fn fetch(&self, subject: &str) -> Option<Value>;
}

fn normalize_subject(subject: &str) -> String {
    subject.trim().to_lowercase()
}

/// 内存中的参考资料
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceStore {
    payloads: HashMap<String, Value>,
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: &str, payload: Value) {
        self.payloads.insert(normalize_subject(subject), payload);
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// 从 JSON 文件加载，顶层为 `{ "<主体>": <payload>, ... }`
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取参考资料文件: {}", path.display()))?;
        let map: HashMap<String, Value> = serde_json::from_str(&text)
            .with_context(|| format!("参考资料文件格式错误: {}", path.display()))?;

        let mut store = Self::new();
        for (subject, payload) in map {
            store.insert(&subject, payload);
        }
        Ok(store)
    }
}

#[async_trait]
impl ReferenceStore for InMemoryReferenceStore {
    async fn fetch(&self, subject: &str) -> Option<Value> {
        self.payloads.get(&normalize_subject(subject)).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    sections: Vec<PayloadSection>,
}

#[derive(Debug, Deserialize)]
struct PayloadSection {
    name: String,
    #[serde(default)]
    documents: Vec<PayloadDocument>,
}

#[derive(Debug, Deserialize)]
struct PayloadDocument {
    #[serde(default)]
    doc_type: Option<String>,
    #[serde(default)]
    extracted_text: Option<String>,
}

/// 从资料中取出某个章节的原文
///
/// 只识别 `{"sections":[{"name","documents":[{"doc_type","extracted_text"}]}]}`，
/// 其他结构视为没有资料
pub fn section_material(payload: &Value, section_name: &str) -> Option<String> {
    let payload = Payload::deserialize(payload).ok()?;
    let section = payload
        .sections
        .into_iter()
        .find(|s| s.name.trim().eq_ignore_ascii_case(section_name.trim()))?;

    let blocks: Vec<String> = section
        .documents
        .into_iter()
        .filter_map(|doc| {
            let text = doc.extracted_text?;
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let doc_type = doc.doc_type.unwrap_or_else(|| "document".to_string());
            Some(format!("[{}]\n{}", doc_type, text))
        })
        .collect();

    if blocks.is_empty() {
        debug!("[参考资料] 章节 {} 没有可用原文", section_name);
        return None;
    }
    Some(blocks.join("\n\n"))
}
