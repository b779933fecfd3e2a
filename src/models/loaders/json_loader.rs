use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

use crate::models::document::Document;

/// 从 JSON 文件加载任意可反序列化的数据
pub async fn load_json<T: DeserializeOwned>(json_file_path: &Path) -> Result<T> {
    let content = fs::read_to_string(json_file_path)
        .await
        .with_context(|| format!("无法读取JSON文件: {}", json_file_path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("无法解析JSON文件: {}", json_file_path.display()))
}

/// 从 JSON 文件加载文档
pub async fn load_document(json_file_path: &Path) -> Result<Document> {
    let document: Document = load_json(json_file_path).await?;
    tracing::info!(
        "成功加载文档: {} 个顶层节点 ({})",
        document.len(),
        json_file_path.display()
    );
    Ok(document)
}

/// 以格式化 JSON 写入文件
pub async fn save_json<T: Serialize>(json_file_path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("JSON序列化失败")?;
    fs::write(json_file_path, content)
        .await
        .with_context(|| format!("无法写入文件: {}", json_file_path.display()))?;
    Ok(())
}
